// Error types for boot image preparation

use crate::disk::gpt_ops::GptError;
use crate::fs::Fat32Error;
use bootprep_pe::PeError;
use core::fmt;
use std::io;

/// Fatal errors; any of these aborts the run
#[derive(Debug)]
pub enum Error {
    /// Boot configuration JSON is malformed or has the wrong shape
    ConfigParse(serde_json::Error),
    DiskOpen {
        path: String,
        source: io::Error,
    },
    /// No GPT found on the disk
    PartitionTableType,
    PartitionTable(GptError),
    UnsupportedSectorSize(u32),
    /// GPT structures run into the stage-2 region
    LayoutOverrun {
        end_lba: u64,
        limit: u64,
    },
    ReferencedPartitionMissing {
        entry: usize,
        partition: u8,
        available: usize,
    },
    UkiResolution {
        entry: usize,
        path: String,
        source: UkiError,
    },
    TooManyFragments(usize),
    PathTooLong(usize),
    /// Raw sector read or write failed
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(e) => write!(f, "Invalid boot configuration: {}", e),
            Self::DiskOpen { path, source } => write!(f, "Cannot open {}: {}", path, source),
            Self::PartitionTableType => write!(f, "Partition table is not GPT"),
            Self::PartitionTable(e) => write!(f, "Cannot read partition table: {}", e),
            Self::UnsupportedSectorSize(size) => {
                write!(f, "Unsupported sector size {} (only 512 is supported)", size)
            }
            Self::LayoutOverrun { end_lba, limit } => write!(
                f,
                "GPT partition entries end at LBA {:#x}, overlapping stage-2 at LBA {:#x}",
                end_lba, limit
            ),
            Self::ReferencedPartitionMissing {
                entry,
                partition,
                available,
            } => write!(
                f,
                "Boot entry {} references partition {}, but the disk has {} partition(s)",
                entry, partition, available
            ),
            Self::UkiResolution {
                entry,
                path,
                source,
            } => write!(f, "Boot entry {}: cannot resolve {}: {}", entry, path, source),
            Self::TooManyFragments(count) => write!(
                f,
                "UKI needs {} memory map entries, at most {} fit",
                count,
                crate::boot::mmap::MMAP_SLOTS
            ),
            Self::PathTooLong(len) => write!(
                f,
                "UKI path is {} bytes, at most {} are allowed",
                len,
                crate::boot::entry::MAX_PATH_LEN
            ),
            Self::Io(e) => write!(f, "Disk I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigParse(e) => Some(e),
            Self::DiskOpen { source, .. } => Some(source),
            Self::UkiResolution { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GptError> for Error {
    fn from(e: GptError) -> Self {
        match e {
            GptError::NotGpt => Self::PartitionTableType,
            other => Self::PartitionTable(other),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Why a UKI could not be turned into a memory map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UkiError {
    Fat32(Fat32Error),
    Pe(PeError),
    MissingSection(&'static str),
    /// Raw section name as stored in the section table
    SectionNotAligned {
        name: [u8; 8],
        offset: u32,
    },
    /// File extents end before the section does
    ExtentsExhausted {
        section: &'static str,
        mapped: u64,
        expected: u64,
    },
    /// Physical sector does not fit the 32-bit `start` field
    LbaOutOfRange(u64),
    /// Load address ran past 4 GiB
    AddressOverflow(&'static str),
}

impl fmt::Display for UkiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fat32(e) => write!(f, "{}", e),
            Self::Pe(e) => write!(f, "{}", e),
            Self::MissingSection(name) => write!(f, "Missing {} section", name),
            Self::SectionNotAligned { name, offset } => {
                let len = name.iter().position(|&c| c == 0).unwrap_or(name.len());
                write!(
                    f,
                    "Section {} at file offset {:#x} is not sector-aligned",
                    String::from_utf8_lossy(&name[..len]),
                    offset
                )
            }
            Self::ExtentsExhausted {
                section,
                mapped,
                expected,
            } => write!(
                f,
                "Only {} of {} sectors of {} are backed by file extents",
                mapped, expected, section
            ),
            Self::LbaOutOfRange(lba) => write!(f, "LBA {:#x} does not fit in 32 bits", lba),
            Self::AddressOverflow(region) => {
                write!(f, "Load address of {} overflows 32 bits", region)
            }
        }
    }
}

impl std::error::Error for UkiError {}

impl From<Fat32Error> for UkiError {
    fn from(e: Fat32Error) -> Self {
        Self::Fat32(e)
    }
}

impl From<PeError> for UkiError {
    fn from(e: PeError) -> Self {
        Self::Pe(e)
    }
}

/// Result type for boot image preparation
pub type Result<T> = core::result::Result<T, Error>;
