// Error type for FAT32 operations

use core::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fat32Error {
    IoError,
    InvalidBootSector,
    NotFound,
    NotADirectory,
    IsADirectory,
    CorruptChain,
}

impl fmt::Display for Fat32Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "I/O error reading FAT32 volume"),
            Self::InvalidBootSector => write!(f, "Not a FAT32 volume with 512-byte sectors"),
            Self::NotFound => write!(f, "File not found"),
            Self::NotADirectory => write!(f, "Path component is not a directory"),
            Self::IsADirectory => write!(f, "Path is a directory"),
            Self::CorruptChain => write!(f, "Corrupt cluster chain"),
        }
    }
}
