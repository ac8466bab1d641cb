// FAT32 filesystem operations - read-only lookup and extent resolution

mod context;
mod directory;
mod file_ops;
pub mod filename;
mod types;

use super::Fat32Error;
use gpt_disk_io::BlockIo;

pub use context::Fat32Context;
pub use file_ops::{FileExtent, FileExtents};
pub use types::DirEntry;

/// Resolve a file on the FAT32 partition of `partition_sectors` sectors
/// at `partition_lba_start` to the clusters backing it
pub fn file_extents<B: BlockIo>(
    block_io: &mut B,
    partition_lba_start: u64,
    partition_sectors: u64,
    path: &str,
) -> Result<FileExtents, Fat32Error> {
    let ctx = Fat32Context::from_boot_sector(block_io, partition_lba_start, partition_sectors)?;
    file_ops::file_extents(block_io, partition_lba_start, &ctx, path)
}
