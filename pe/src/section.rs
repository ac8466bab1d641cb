//! PE section table parsing
//!
//! Sections contain code, data and, in a UKI, the embedded payloads
//! (`.linux`, `.initrd`, `.cmdline`, `.osrel`, ...).

use alloc::vec::Vec;

use crate::header::utils::{read_array, read_u32};
use crate::{PeError, PeResult};

/// Section header (40 bytes on disk)
#[derive(Debug, Clone, Copy)]
pub struct SectionHeader {
    pub name: [u8; 8],            // Section name (null-padded ASCII)
    pub virtual_size: u32,        // Size in memory
    pub virtual_address: u32,     // RVA in memory
    pub size_of_raw_data: u32,    // Size on disk
    pub pointer_to_raw_data: u32, // Offset on disk
    pub characteristics: u32,
}

impl SectionHeader {
    pub const SIZE: usize = 40;

    fn parse(data: &[u8], offset: usize) -> PeResult<Self> {
        Ok(SectionHeader {
            name: read_array(data, offset)?,
            virtual_size: read_u32(data, offset + 8)?,
            virtual_address: read_u32(data, offset + 12)?,
            size_of_raw_data: read_u32(data, offset + 16)?,
            pointer_to_raw_data: read_u32(data, offset + 20)?,
            characteristics: read_u32(data, offset + 36)?,
        })
    }

    /// Get section name as string (may contain non-UTF8)
    pub fn name_str(&self) -> &str {
        let len = self.name.iter().position(|&c| c == 0).unwrap_or(8);
        core::str::from_utf8(&self.name[..len]).unwrap_or("<invalid>")
    }
}

/// Section table - array of section headers
pub struct SectionTable {
    sections: Vec<SectionHeader>,
}

impl SectionTable {
    /// Parse `count` section headers starting at `offset`
    pub fn parse(data: &[u8], offset: usize, count: usize) -> PeResult<Self> {
        if count == 0 {
            return Err(PeError::CorruptedData);
        }

        let end = offset + count * SectionHeader::SIZE;
        if end > data.len() {
            return Err(PeError::Truncated { needed: end });
        }

        let sections = (0..count)
            .map(|i| SectionHeader::parse(data, offset + i * SectionHeader::SIZE))
            .collect::<PeResult<Vec<_>>>()?;

        Ok(SectionTable { sections })
    }

    /// First section with the given name
    pub fn find(&self, name: &str) -> Option<&SectionHeader> {
        self.sections.iter().find(|s| s.name_str() == name)
    }

    /// Iterator over all sections
    pub fn iter(&self) -> impl Iterator<Item = &SectionHeader> {
        self.sections.iter()
    }
}
