//! PE header parsing (DOS, COFF, Optional Header) and the section table

mod coff_header;
mod dos_header;
mod optional_header;
pub(crate) mod utils;

pub use coff_header::CoffHeader;
pub use dos_header::DosHeader;
pub use optional_header::OptionalHeader;

use crate::section::SectionTable;
use crate::{PeError, PeResult};

/// Complete PE headers structure
pub struct PeHeaders {
    pub dos: DosHeader,
    pub coff: CoffHeader,
    pub optional: OptionalHeader,
    pub sections: SectionTable,
}

impl PeHeaders {
    /// Parse all PE headers and the section table from a prefix of the image.
    ///
    /// Returns [`PeError::Truncated`] with the required prefix length when
    /// `data` stops short of the section table.
    pub fn parse(data: &[u8]) -> PeResult<Self> {
        let dos = DosHeader::parse(data)?;
        let coff = CoffHeader::parse(data, dos.e_lfanew)?;

        let optional_offset = dos.e_lfanew as usize + CoffHeader::SIZE;
        if coff.size_of_optional_header < 64 {
            return Err(PeError::CorruptedData);
        }
        let optional = OptionalHeader::parse(data, optional_offset)?;

        let section_offset = optional_offset + coff.size_of_optional_header as usize;
        let sections =
            SectionTable::parse(data, section_offset, coff.number_of_sections as usize)?;

        Ok(PeHeaders {
            dos,
            coff,
            optional,
            sections,
        })
    }
}
