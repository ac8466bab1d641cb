// GPT operations using gpt-disk-rs

use super::{GptError, GptMetadata};
use crate::disk::block_io::ImageBlockIo;
use crate::disk::partition::{PartitionInfo, PartitionTable, PartitionType};
use gpt_disk_io::Disk;
use gpt_disk_types::BlockSize;
use std::io::{Read, Seek};

/// Read the primary GPT of a disk image.
///
/// The logical sector size is not stored in the GPT itself, so the header
/// is probed at LBA 1 for 512-byte and then 4096-byte blocks; the first
/// size with a valid `EFI PART` signature is reported as the table's
/// sector size.
pub fn read_partition_table<S: Read + Seek>(storage: &mut S) -> Result<PartitionTable, GptError> {
    for block_size in [BlockSize::BS_512, BlockSize::BS_4096] {
        if let Some(table) = scan_partitions(storage, block_size)? {
            return Ok(table);
        }
    }

    Err(GptError::NotGpt)
}

/// Scan disk for GPT and build the partition table, `None` if no header
fn scan_partitions<S: Read + Seek>(
    storage: &mut S,
    block_size: BlockSize,
) -> Result<Option<PartitionTable>, GptError> {
    let block_io = ImageBlockIo::new(storage, block_size);
    let mut disk = Disk::new(block_io).map_err(|_| GptError::IoError)?;

    let mut block_buf = vec![0u8; block_size.to_u32() as usize];

    let header = match disk.read_primary_gpt_header(&mut block_buf) {
        Ok(h) => h,
        Err(err) => {
            // Image too small for this block size
            log::debug!("no GPT header with {}-byte blocks: {:?}", block_size.to_u32(), err);
            return Ok(None);
        }
    };

    if !header.is_signature_valid() {
        return Ok(None);
    }

    let layout = header
        .get_partition_entry_array_layout()
        .map_err(|_| GptError::InvalidHeader)?;

    let metadata = GptMetadata {
        first_lba: layout.start_lba.0,
        entry_count: layout.num_entries,
        entry_size: layout.entry_size.to_u32(),
    };
    let mut table = PartitionTable::new(block_size.to_u32(), metadata);

    let iter = disk
        .gpt_partition_entry_array_iter(layout, &mut block_buf)
        .map_err(|_| GptError::IoError)?;

    for (index, entry_result) in iter.enumerate() {
        let entry = entry_result.map_err(|_| GptError::IoError)?;

        if !entry.is_used() {
            continue;
        }

        // Copy the guid to avoid unaligned reference
        let guid = entry.partition_type_guid;

        table.add_partition(PartitionInfo {
            index: index as u32,
            partition_type: PartitionType::from_gpt_guid(&guid),
            start_lba: entry.starting_lba.to_u64(),
            end_lba: entry.ending_lba.to_u64(),
        });
    }

    Ok(Some(table))
}
