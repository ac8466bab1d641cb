// FAT32 path lookup and extent resolution

use super::context::Fat32Context;
use super::directory::{find_entry, DirRecord};
use crate::fs::Fat32Error;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

const SECTOR_SIZE: u64 = 512;

/// A run of the file stored contiguously on disk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileExtent {
    /// Byte offset within the file
    pub file_offset: u64,
    /// Absolute byte offset on the disk
    pub disk_offset: u64,
    /// Length in bytes, a whole number of clusters
    pub length: u64,
}

impl FileExtent {
    pub fn start_sector(&self) -> u64 {
        self.disk_offset / SECTOR_SIZE
    }

    pub fn sector_count(&self) -> u64 {
        self.length / SECTOR_SIZE
    }
}

/// Physical layout of a file: its size and its extents in file order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileExtents {
    pub size: u64,
    pub extents: Vec<FileExtent>,
}

impl FileExtents {
    /// Read `len` bytes at `offset` through the extents, clamped to the
    /// file size.
    pub fn read_vec<B: BlockIo>(
        &self,
        block_io: &mut B,
        offset: u64,
        len: usize,
    ) -> Result<Vec<u8>, Fat32Error> {
        let end = offset.saturating_add(len as u64).min(self.size);
        if offset >= end {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity((end - offset) as usize);
        let mut sector = [0u8; SECTOR_SIZE as usize];
        let mut pos = offset;

        while pos < end {
            let extent = self
                .extents
                .iter()
                .find(|e| pos >= e.file_offset && pos < e.file_offset + e.length)
                .ok_or(Fat32Error::CorruptChain)?;

            let disk_pos = extent.disk_offset + (pos - extent.file_offset);
            block_io
                .read_blocks(Lba(disk_pos / SECTOR_SIZE), &mut sector)
                .map_err(|_| Fat32Error::IoError)?;

            let in_sector = (disk_pos % SECTOR_SIZE) as usize;
            let take = ((SECTOR_SIZE as usize) - in_sector).min((end - pos) as usize);
            out.extend_from_slice(&sector[in_sector..in_sector + take]);
            pos += take as u64;
        }

        Ok(out)
    }
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|c| !c.is_empty())
}

/// Walk `path` from the root; `None` means the path names the root itself
fn lookup<B: BlockIo>(
    block_io: &mut B,
    partition_start: u64,
    ctx: &Fat32Context,
    path: &str,
) -> Result<Option<DirRecord>, Fat32Error> {
    let mut current: Option<DirRecord> = None;

    for component in components(path) {
        let dir_cluster = match &current {
            None => ctx.root_cluster,
            Some(record) if record.is_directory() => match record.entry.first_cluster() {
                0 => ctx.root_cluster, // `..` of a top-level directory
                cluster => cluster,
            },
            Some(_) => return Err(Fat32Error::NotADirectory),
        };
        current = Some(find_entry(block_io, partition_start, ctx, dir_cluster, component)?);
    }

    Ok(current)
}

/// Resolve `path` to the disk extents holding its data.
///
/// Physically adjacent clusters are merged into one extent. The chain is
/// cut to the clusters the file size needs; a shorter chain is corrupt.
pub fn file_extents<B: BlockIo>(
    block_io: &mut B,
    partition_start: u64,
    ctx: &Fat32Context,
    path: &str,
) -> Result<FileExtents, Fat32Error> {
    let record = lookup(block_io, partition_start, ctx, path)?.ok_or(Fat32Error::IsADirectory)?;
    if record.is_directory() {
        return Err(Fat32Error::IsADirectory);
    }

    let size = record.entry.file_size as u64;
    let cluster_bytes = ctx.cluster_bytes();
    let needed = size.div_ceil(cluster_bytes) as usize;

    let chain = ctx.cluster_chain(block_io, partition_start, record.entry.first_cluster())?;
    if chain.len() < needed {
        return Err(Fat32Error::CorruptChain);
    }

    let mut extents: Vec<FileExtent> = Vec::new();
    for (i, &cluster) in chain.iter().take(needed).enumerate() {
        let disk_offset = (partition_start + ctx.cluster_to_sector(cluster)) * SECTOR_SIZE;
        match extents.last_mut() {
            Some(last) if last.disk_offset + last.length == disk_offset => {
                last.length += cluster_bytes;
            }
            _ => extents.push(FileExtent {
                file_offset: i as u64 * cluster_bytes,
                disk_offset,
                length: cluster_bytes,
            }),
        }
    }

    log::debug!(
        "{}: {} bytes in {} extent(s) over {} cluster(s)",
        path,
        size,
        extents.len(),
        needed
    );

    Ok(FileExtents { size, extents })
}
