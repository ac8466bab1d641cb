//! DOS Header structure and parsing

use super::utils::{read_u16, read_u32};
use crate::{PeError, PeResult};

/// DOS Header (MZ header)
#[derive(Debug, Clone, Copy)]
pub struct DosHeader {
    pub e_magic: u16,  // "MZ" signature (0x5A4D)
    pub e_lfanew: u32, // Offset to PE header
}

impl DosHeader {
    pub const SIGNATURE: u16 = 0x5A4D; // "MZ"
    pub const SIZE: usize = 0x40;

    /// Parse DOS header from the start of the image
    pub fn parse(data: &[u8]) -> PeResult<Self> {
        if data.len() < Self::SIZE {
            return Err(PeError::Truncated { needed: Self::SIZE });
        }

        let e_magic = read_u16(data, 0)?;
        if e_magic != Self::SIGNATURE {
            return Err(PeError::InvalidSignature);
        }

        let e_lfanew = read_u32(data, 0x3C)?;

        Ok(DosHeader { e_magic, e_lfanew })
    }
}
