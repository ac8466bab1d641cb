//! Boot image compilation
//!
//! Runs the whole preparation against a disk image:
//!
//! 1. assign memory-map sectors and apply the boot-count policy
//! 2. read and validate the GPT
//! 3. resolve every enabled entry's UKI into a memory map
//! 4. encode all records
//! 5. write the four memory-map tables, then the config block
//!
//! Steps 2-4 only read the disk. Nothing is written until every record has
//! been encoded, but a write failure part way leaves earlier sectors
//! written; running again with the same input rewrites all of them.

use crate::boot::entry::{BootConfig, BootConfigBlock, BOOT_ENTRY_COUNT, CONFIG_BLOCK_SIZE};
use crate::boot::mmap::{encode_memory_map, MemoryMap, MMAP_TABLE_SIZE};
use crate::boot::uki::resolve_uki;
use crate::disk::block_io::{read_sectors, write_sectors};
use crate::disk::gpt_ops::read_partition_table;
use crate::disk::layout::{validate_layout, CONFIG_LBA, MMAP_START_LBA};
use crate::disk::partition::PartitionTable;
use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::path::Path;

/// Assign table sectors and effective boot counts
pub fn prepare_config(config: BootConfig) -> BootConfig {
    config
        .assign_mmap_sectors(MMAP_START_LBA)
        .apply_boot_count_policy()
}

/// Read the partition table and check it against the fixed layout
pub fn read_layout<S: Read + Seek>(storage: &mut S) -> Result<PartitionTable> {
    let table = read_partition_table(storage)?;
    log::info!(
        "GPT: {} partition(s), {} entry slots of {} bytes at LBA {}",
        table.count(),
        table.metadata.entry_count,
        table.metadata.entry_size,
        table.metadata.first_lba
    );

    validate_layout(&table)?;
    Ok(table)
}

/// Fill in the memory map and initrd size of every enabled entry
pub fn resolve_entries<S: Read + Seek>(
    storage: &mut S,
    table: &PartitionTable,
    mut config: BootConfig,
) -> Result<BootConfig> {
    for (i, entry) in config.boot_entries.iter_mut().enumerate() {
        if !entry.is_enabled() {
            log::debug!("Boot entry {}: disabled", i);
            continue;
        }

        let partition =
            table
                .get(entry.partition as usize)
                .ok_or(Error::ReferencedPartitionMissing {
                    entry: i,
                    partition: entry.partition,
                    available: table.count(),
                })?;

        let resolved = resolve_uki(storage, partition, &entry.uki_path).map_err(|source| {
            Error::UkiResolution {
                entry: i,
                path: entry.uki_path.clone(),
                source,
            }
        })?;

        log::info!(
            "Boot entry {}: {} on partition {} ({}) -> {} memory map entries, initrd {} bytes",
            i,
            entry.uki_path,
            entry.partition,
            partition.type_name(),
            resolved.mmap.len(),
            resolved.initrd_size
        );
        for mapping in &resolved.mmap {
            log::debug!("  {}", mapping);
        }

        entry.mmap = resolved.mmap;
        entry.initrd_size = resolved.initrd_size;
    }

    Ok(config)
}

/// Everything the write phase puts on disk
pub struct BootRecords {
    /// (LBA, table) for each of the four entries
    pub mmaps: [(u64, [u8; MMAP_TABLE_SIZE]); BOOT_ENTRY_COUNT],
    pub config_block: [u8; CONFIG_BLOCK_SIZE],
}

pub fn encode_records(config: &BootConfig) -> Result<BootRecords> {
    let mut mmaps = [(0u64, [0u8; MMAP_TABLE_SIZE]); BOOT_ENTRY_COUNT];
    for (slot, entry) in mmaps.iter_mut().zip(&config.boot_entries) {
        *slot = (
            entry.mmap_sector as u64,
            encode_memory_map(&entry.mmap, entry.initrd_size)?,
        );
    }

    Ok(BootRecords {
        mmaps,
        config_block: config.block().encode()?,
    })
}

/// Write the memory-map tables, then the config block
pub fn write_records<W: Write + Seek>(storage: &mut W, records: &BootRecords) -> Result<()> {
    for (lba, table) in &records.mmaps {
        write_sectors(storage, *lba, table)?;
        log::info!("Wrote memory map to LBA {:#x}", lba);
    }

    write_sectors(storage, CONFIG_LBA, &records.config_block)?;
    log::info!("Wrote boot config to LBA {:#x}", CONFIG_LBA);

    storage.flush()?;
    Ok(())
}

/// Read, resolve and encode without touching the disk
pub fn build_records<S: Read + Seek>(storage: &mut S, config: BootConfig) -> Result<BootRecords> {
    let config = prepare_config(config);
    let table = read_layout(storage)?;
    let config = resolve_entries(storage, &table, config)?;
    encode_records(&config)
}

/// Compile into an image opened for both reading and writing
pub fn compile_image<S: Read + Write + Seek>(storage: &mut S, config: BootConfig) -> Result<()> {
    let records = build_records(storage, config)?;
    write_records(storage, &records)
}

/// Compile into the disk image at `path`.
///
/// The image is read through a read-only handle, which is closed before
/// the image is reopened for writing.
pub fn compile_disk(path: &Path, config: BootConfig) -> Result<()> {
    let records = {
        let mut disk = open_disk(path, false)?;
        build_records(&mut disk, config)?
    };

    let mut disk = open_disk(path, true)?;
    write_records(&mut disk, &records)?;
    disk.sync_all()?;
    Ok(())
}

fn open_disk(path: &Path, write: bool) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(write)
        .open(path)
        .map_err(|source| Error::DiskOpen {
            path: path.display().to_string(),
            source,
        })
}

/// Boot records as currently installed on a disk
pub struct InstalledRecords {
    pub config: BootConfigBlock,
    /// Memory map of each entry, read from its `mmap_sector`
    pub mmaps: Vec<MemoryMap>,
}

/// Read back the config block and the memory maps it points at
pub fn read_installed_records<S: Read + Seek>(storage: &mut S) -> Result<InstalledRecords> {
    let mut block = [0u8; CONFIG_BLOCK_SIZE];
    read_sectors(storage, CONFIG_LBA, &mut block)?;
    let config = BootConfigBlock::decode(&block);

    let mut mmaps = Vec::with_capacity(BOOT_ENTRY_COUNT);
    for record in &config.records {
        let mut table = [0u8; MMAP_TABLE_SIZE];
        read_sectors(storage, record.mmap_sector as u64, &mut table)?;
        mmaps.push(MemoryMap::decode(&table));
    }

    Ok(InstalledRecords { config, mmaps })
}
