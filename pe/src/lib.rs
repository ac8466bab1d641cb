//! PE/COFF parsing for Unified Kernel Images
//!
//! A UKI is a PE32+ EFI stub with the kernel, initrd and command line
//! embedded as named sections. This crate parses just enough of the image
//! to locate those sections on disk:
//!
//! - DOS header (`MZ`, `e_lfanew`)
//! - COFF file header (section count, optional header size)
//! - Optional header (PE32 / PE32+ magic, `SizeOfHeaders`)
//! - Section table (name, raw file offset, raw size)
//!
//! Parsing works on a byte prefix of the file. When the prefix is too
//! short the parser reports exactly how many bytes it needs
//! ([`PeError::Truncated`]), so callers can fetch headers from a block
//! device without reading the whole image.
//!
//! [`kernel`] reads the Linux boot protocol setup header embedded at the
//! start of the `.linux` payload.

#![no_std]

extern crate alloc;

pub mod header;
pub mod kernel;
pub mod section;

use core::fmt;

pub use header::PeHeaders;
pub use kernel::SetupHeader;
pub use section::{SectionHeader, SectionTable};

/// Errors during PE parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeError {
    InvalidSignature,  // Not a valid PE file
    UnsupportedFormat, // Unknown optional header magic
    CorruptedData,     // Structurally impossible header values
    /// The supplied bytes end before the structure being parsed.
    Truncated { needed: usize },
}

impl fmt::Display for PeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PeError::InvalidSignature => write!(f, "Invalid PE signature"),
            PeError::UnsupportedFormat => write!(f, "Unsupported PE format"),
            PeError::CorruptedData => write!(f, "Corrupted PE data"),
            PeError::Truncated { needed } => {
                write!(f, "PE data truncated ({} bytes required)", needed)
            }
        }
    }
}

/// Result type for PE operations
pub type PeResult<T> = Result<T, PeError>;
