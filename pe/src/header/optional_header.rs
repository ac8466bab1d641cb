//! PE Optional Header (PE32 and PE32+), only the fields shared by both

use super::utils::{read_u16, read_u32};
use crate::{PeError, PeResult};

#[derive(Debug, Clone, Copy)]
pub struct OptionalHeader {
    pub magic: u16,
    pub file_alignment: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
}

impl OptionalHeader {
    pub const MAGIC_PE32: u16 = 0x10B;
    pub const MAGIC_PE32PLUS: u16 = 0x20B;

    /// Parse optional header located at `offset`
    pub fn parse(data: &[u8], offset: usize) -> PeResult<Self> {
        let magic = read_u16(data, offset)?;
        if magic != Self::MAGIC_PE32 && magic != Self::MAGIC_PE32PLUS {
            return Err(PeError::UnsupportedFormat);
        }

        // Same offsets in PE32 and PE32+
        let file_alignment = read_u32(data, offset + 36)?;
        let size_of_image = read_u32(data, offset + 56)?;
        let size_of_headers = read_u32(data, offset + 60)?;

        Ok(OptionalHeader {
            magic,
            file_alignment,
            size_of_image,
            size_of_headers,
        })
    }
}
