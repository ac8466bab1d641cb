//! Linux boot protocol setup header
//!
//! The `.linux` section of a UKI is a bzImage. Its first sector is the
//! legacy boot sector; the setup header follows at 0x1f1. `setup_sects`
//! tells how many 512-byte sectors of real-mode setup code come after the
//! boot sector, which is where the real-mode and protected-mode parts
//! of the kernel are split.

use crate::header::utils::{read_u16, read_u32, read_u8};
use crate::PeResult;

pub const SETUP_SECTS_OFFSET: usize = 0x1f1;
const BOOT_FLAG_OFFSET: usize = 0x1fe;
const HEADER_MAGIC_OFFSET: usize = 0x202;
const VERSION_OFFSET: usize = 0x206;

/// Subset of the setup header read from the start of the kernel payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupHeader {
    pub setup_sects: u8,
    pub boot_flag: u16,
    pub header: u32,
    pub version: u16,
}

impl SetupHeader {
    pub const BOOT_FLAG: u16 = 0xAA55;
    pub const HEADER_MAGIC: u32 = 0x5372_6448; // "HdrS"

    /// Bytes of the payload covering every field read here
    pub const LEN: usize = VERSION_OFFSET + 2;

    /// Parse from the start of the kernel payload.
    ///
    /// Only `setup_sects` is required. Fields past the end of `payload`
    /// read as zero, which leaves the header without a signature.
    pub fn parse(payload: &[u8]) -> PeResult<Self> {
        Ok(SetupHeader {
            setup_sects: read_u8(payload, SETUP_SECTS_OFFSET)?,
            boot_flag: read_u16(payload, BOOT_FLAG_OFFSET).unwrap_or(0),
            header: read_u32(payload, HEADER_MAGIC_OFFSET).unwrap_or(0),
            version: read_u16(payload, VERSION_OFFSET).unwrap_or(0),
        })
    }

    /// Whether the payload carries the `0xAA55` flag and `HdrS` magic
    pub fn has_signature(&self) -> bool {
        self.boot_flag == Self::BOOT_FLAG && self.header == Self::HEADER_MAGIC
    }

    /// Protocol version as (major, minor)
    pub fn protocol_version(&self) -> (u8, u8) {
        ((self.version >> 8) as u8, self.version as u8)
    }
}
