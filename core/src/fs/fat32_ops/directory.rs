// FAT32 directory reading

use super::context::Fat32Context;
use super::filename::{names_match, short_name_to_string, LongNameAssembler};
use super::types::{DirEntry, LongNameEntry, DIR_ENTRY_SIZE};
use crate::fs::Fat32Error;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

const SECTOR_SIZE: usize = 512;

/// A live directory entry with its long name, when it has one
#[derive(Clone, Debug)]
pub struct DirRecord {
    pub long_name: Option<String>,
    pub short_name: String,
    pub entry: DirEntry,
}

impl DirRecord {
    pub fn matches(&self, wanted: &str) -> bool {
        self.long_name
            .as_deref()
            .is_some_and(|long| names_match(long, wanted))
            || names_match(&self.short_name, wanted)
    }

    pub fn is_directory(&self) -> bool {
        self.entry.is_directory()
    }
}

/// Read every entry of the directory starting at `cluster`, skipping
/// deleted entries, `.`/`..` and the volume label.
pub fn read_directory<B: BlockIo>(
    block_io: &mut B,
    partition_start: u64,
    ctx: &Fat32Context,
    cluster: u32,
) -> Result<Vec<DirRecord>, Fat32Error> {
    let chain = ctx.cluster_chain(block_io, partition_start, cluster)?;
    let mut records = Vec::new();
    let mut assembler = LongNameAssembler::default();
    let mut sector = [0u8; SECTOR_SIZE];

    for cluster in chain {
        let first_sector = partition_start + ctx.cluster_to_sector(cluster);
        for s in 0..ctx.sectors_per_cluster as u64 {
            block_io
                .read_blocks(Lba(first_sector + s), &mut sector)
                .map_err(|_| Fat32Error::IoError)?;

            for raw in sector.chunks_exact(DIR_ENTRY_SIZE) {
                let mut bytes = [0u8; DIR_ENTRY_SIZE];
                bytes.copy_from_slice(raw);
                let entry = DirEntry::parse(&bytes);

                if entry.is_end() {
                    return Ok(records);
                }
                if entry.is_deleted() {
                    assembler.reset();
                    continue;
                }
                if entry.is_long_name() {
                    assembler.push(&LongNameEntry::parse(&bytes));
                    continue;
                }

                let long_name = assembler.finish(&entry.name);
                if entry.is_volume_label() || entry.is_dot_entry() {
                    continue;
                }

                records.push(DirRecord {
                    long_name,
                    short_name: short_name_to_string(&entry.name),
                    entry,
                });
            }
        }
    }

    Ok(records)
}

/// Find `name` in the directory starting at `cluster`
pub fn find_entry<B: BlockIo>(
    block_io: &mut B,
    partition_start: u64,
    ctx: &Fat32Context,
    cluster: u32,
    name: &str,
) -> Result<DirRecord, Fat32Error> {
    read_directory(block_io, partition_start, ctx, cluster)?
        .into_iter()
        .find(|record| record.matches(name))
        .ok_or(Fat32Error::NotFound)
}
