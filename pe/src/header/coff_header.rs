//! COFF File Header structure and parsing

use super::utils::{read_u16, read_u32};
use crate::{PeError, PeResult};

/// COFF File Header
#[derive(Debug, Clone, Copy)]
pub struct CoffHeader {
    pub machine: u16,            // Target machine type
    pub number_of_sections: u16, // Number of sections
    pub time_date_stamp: u32,    // Timestamp
    pub size_of_optional_header: u16,
    pub characteristics: u16,
}

impl CoffHeader {
    pub const PE_SIGNATURE: u32 = 0x00004550; // "PE\0\0"

    /// Signature (4) + COFF header (20)
    pub const SIZE: usize = 24;

    /// Parse PE signature and COFF header at `pe_offset`
    pub fn parse(data: &[u8], pe_offset: u32) -> PeResult<Self> {
        let offset = pe_offset as usize;

        // Verify PE signature first
        let pe_sig = read_u32(data, offset)?;
        if pe_sig != Self::PE_SIGNATURE {
            return Err(PeError::InvalidSignature);
        }

        // COFF header starts at offset + 4
        let coff_offset = offset + 4;

        let machine = read_u16(data, coff_offset)?;
        let number_of_sections = read_u16(data, coff_offset + 2)?;
        let time_date_stamp = read_u32(data, coff_offset + 4)?;
        let size_of_optional_header = read_u16(data, coff_offset + 16)?;
        let characteristics = read_u16(data, coff_offset + 18)?;

        Ok(CoffHeader {
            machine,
            number_of_sections,
            time_date_stamp,
            size_of_optional_header,
            characteristics,
        })
    }
}
