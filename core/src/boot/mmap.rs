//! Memory-map table, one per boot entry
//!
//! ```text
//! 0x000  64 slots x 16 bytes
//!        +0 length u16   sectors to load
//!        +2 start  u32   first disk sector (LBA)
//!        +6 addr   u32   physical load address
//!        +10 6 bytes reserved
//! 0x3fc  initrd_size u32
//! ```
//!
//! All fields little-endian. Unused slots are zero.

use crate::error::{Error, Result};
use core::fmt;

pub const MMAP_SLOTS: usize = 64;
pub const MMAP_SLOT_SIZE: usize = 16;
pub const MMAP_TABLE_SIZE: usize = 1024;
pub const INITRD_SIZE_OFFSET: usize = MMAP_TABLE_SIZE - 4;

/// Load `length` sectors from LBA `start` to physical address `addr`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryMapEntry {
    pub length: u16,
    pub start: u32,
    pub addr: u32,
}

impl MemoryMapEntry {
    pub fn encode(&self) -> [u8; MMAP_SLOT_SIZE] {
        let mut slot = [0u8; MMAP_SLOT_SIZE];
        slot[0..2].copy_from_slice(&self.length.to_le_bytes());
        slot[2..6].copy_from_slice(&self.start.to_le_bytes());
        slot[6..10].copy_from_slice(&self.addr.to_le_bytes());
        slot
    }

    pub fn decode(slot: &[u8; MMAP_SLOT_SIZE]) -> Self {
        Self {
            length: u16::from_le_bytes([slot[0], slot[1]]),
            start: u32::from_le_bytes([slot[2], slot[3], slot[4], slot[5]]),
            addr: u32::from_le_bytes([slot[6], slot[7], slot[8], slot[9]]),
        }
    }
}

impl fmt::Display for MemoryMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:5} (0x{:04x}) sectors @ LBA {:10} (0x{:08x}) -> mem {:10} (0x{:08x})",
            self.length, self.length, self.start, self.start, self.addr, self.addr
        )
    }
}

/// Encode `entries` and the initrd size into one table.
///
/// Fails with [`Error::TooManyFragments`] past 64 entries.
pub fn encode_memory_map(
    entries: &[MemoryMapEntry],
    initrd_size: u32,
) -> Result<[u8; MMAP_TABLE_SIZE]> {
    if entries.len() > MMAP_SLOTS {
        return Err(Error::TooManyFragments(entries.len()));
    }

    let mut table = [0u8; MMAP_TABLE_SIZE];
    for (slot, entry) in table.chunks_exact_mut(MMAP_SLOT_SIZE).zip(entries) {
        slot.copy_from_slice(&entry.encode());
    }
    table[INITRD_SIZE_OFFSET..].copy_from_slice(&initrd_size.to_le_bytes());

    Ok(table)
}

/// A decoded memory-map table
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryMap {
    /// Non-empty slots in table order
    pub entries: Vec<MemoryMapEntry>,
    pub initrd_size: u32,
}

impl MemoryMap {
    pub fn decode(table: &[u8; MMAP_TABLE_SIZE]) -> Self {
        let entries = table[..MMAP_SLOTS * MMAP_SLOT_SIZE]
            .chunks_exact(MMAP_SLOT_SIZE)
            .filter_map(|chunk| {
                let mut slot = [0u8; MMAP_SLOT_SIZE];
                slot.copy_from_slice(chunk);
                let entry = MemoryMapEntry::decode(&slot);
                (entry.length != 0).then_some(entry)
            })
            .collect();

        let mut size = [0u8; 4];
        size.copy_from_slice(&table[INITRD_SIZE_OFFSET..]);

        Self {
            entries,
            initrd_size: u32::from_le_bytes(size),
        }
    }

    pub fn encode(&self) -> Result<[u8; MMAP_TABLE_SIZE]> {
        encode_memory_map(&self.entries, self.initrd_size)
    }

    /// Total sectors the stage-2 loader will read
    pub fn total_sectors(&self) -> u64 {
        self.entries.iter().map(|e| e.length as u64).sum()
    }
}
