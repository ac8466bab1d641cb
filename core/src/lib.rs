//! Boot image preparation for a two-stage boot flow
//!
//! The stage-2 loader has no filesystem driver; it only reads fixed
//! sectors right after the GPT. This crate computes, ahead of time, which
//! disk sectors hold each boot entry's kernel, command line and initrd,
//! and writes that as memory-map tables plus a boot configuration block.
//!
//! - [`disk`]: block access, GPT reading, the fixed low-LBA layout
//! - [`fs`]: read-only FAT32 path lookup and file extents
//! - [`boot`]: boot entries, record codecs, UKI to memory map
//! - [`compiler`]: the read, resolve, encode and write pipeline

pub mod boot;
pub mod compiler;
pub mod disk;
pub mod error;
pub mod fs;
pub mod logger;

pub use boot::{BootConfig, BootConfigBlock, BootEntry, MemoryMap, MemoryMapEntry};
pub use compiler::{compile_disk, compile_image, read_installed_records};
pub use error::{Error, Result, UkiError};
