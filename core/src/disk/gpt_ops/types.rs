// Common types for GPT operations

use core::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GptError {
    IoError,
    InvalidHeader,
    /// No GPT header at LBA 1 for any supported block size
    NotGpt,
}

impl fmt::Display for GptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "I/O error reading partition table"),
            Self::InvalidHeader => write!(f, "Invalid GPT header"),
            Self::NotGpt => write!(f, "Not a GPT partition table"),
        }
    }
}

/// Location of the primary partition entry array, straight from the header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GptMetadata {
    /// First LBA of the partition entry array
    pub first_lba: u64,
    /// Number of slots in the array (used or not)
    pub entry_count: u32,
    /// Size of one slot in bytes
    pub entry_size: u32,
}

impl GptMetadata {
    /// First LBA after the entry array, in 512-byte sectors
    pub fn end_lba(&self) -> u64 {
        self.first_lba + (u64::from(self.entry_count) * u64::from(self.entry_size)) / 512
    }
}
