//! Boot entries and the 512-byte configuration block
//!
//! The configuration arrives as JSON with exactly four entries:
//!
//! ```json
//! {"boot_entries": [
//!     {"partition": 0, "uki_path": "/EFI/Linux/a.efi",
//!      "boot_count_enabled": true, "boot_count": 3},
//!     {}, {}, {}
//! ]}
//! ```
//!
//! On disk each entry is a 128-byte record:
//!
//! ```text
//! 0x00  boot_count   u8
//! 0x01  mmap_sector  u16 LE
//! 0x03  uki_path     123 bytes, NUL padded
//! 0x7e  reserved
//! ```

use super::mmap::MemoryMapEntry;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::io::Read;

pub const BOOT_ENTRY_COUNT: usize = 4;
pub const RECORD_SIZE: usize = 128;
pub const CONFIG_BLOCK_SIZE: usize = RECORD_SIZE * BOOT_ENTRY_COUNT;

/// Longest accepted path; the last record byte stays reserved
pub const MAX_PATH_LEN: usize = 124;
const PATH_OFFSET: usize = 3;
const PATH_END: usize = 126;

/// Entry is never booted
pub const BOOT_COUNT_DISABLED: u8 = 0;
/// Entry boots every time, without countdown
pub const BOOT_COUNT_ALWAYS: u8 = 255;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BootEntry {
    /// Index into the disk's used GPT partitions
    pub partition: u8,
    pub uki_path: String,
    pub boot_count_enabled: bool,
    pub boot_count: u8,

    #[serde(skip)]
    pub mmap_sector: u16,
    #[serde(skip)]
    pub mmap: Vec<MemoryMapEntry>,
    #[serde(skip)]
    pub initrd_size: u32,
}

impl BootEntry {
    /// Entries with an effective boot count of zero are not resolved
    pub fn is_enabled(&self) -> bool {
        self.boot_count != BOOT_COUNT_DISABLED
    }

    fn effective_boot_count(&self) -> u8 {
        if self.uki_path.is_empty() {
            BOOT_COUNT_DISABLED
        } else if !self.boot_count_enabled {
            BOOT_COUNT_ALWAYS
        } else {
            self.boot_count
        }
    }

    pub fn record(&self) -> BootRecord {
        BootRecord {
            boot_count: self.boot_count,
            mmap_sector: self.mmap_sector,
            uki_path: self.uki_path.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BootConfig {
    pub boot_entries: [BootEntry; BOOT_ENTRY_COUNT],
}

impl BootConfig {
    /// Parse the JSON configuration; anything but four entries is rejected
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(Error::ConfigParse)
    }

    /// Give entry `i` the table at `base + 2 * i`
    pub fn assign_mmap_sectors(mut self, base: u16) -> Self {
        for (i, entry) in self.boot_entries.iter_mut().enumerate() {
            entry.mmap_sector = base + 2 * i as u16;
        }
        self
    }

    /// Empty path disables an entry; without counting it boots always
    pub fn apply_boot_count_policy(mut self) -> Self {
        for entry in self.boot_entries.iter_mut() {
            entry.boot_count = entry.effective_boot_count();
        }
        self
    }

    pub fn block(&self) -> BootConfigBlock {
        BootConfigBlock {
            records: core::array::from_fn(|i| self.boot_entries[i].record()),
        }
    }
}

/// One 128-byte boot entry record as the stage-2 loader sees it
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootRecord {
    pub boot_count: u8,
    pub mmap_sector: u16,
    pub uki_path: String,
}

impl BootRecord {
    /// Paths longer than 124 bytes are rejected; only the first 123 bytes
    /// fit the record.
    pub fn encode(&self) -> Result<[u8; RECORD_SIZE]> {
        let path = self.uki_path.as_bytes();
        if path.len() > MAX_PATH_LEN {
            return Err(Error::PathTooLong(path.len()));
        }

        let mut record = [0u8; RECORD_SIZE];
        record[0] = self.boot_count;
        record[1..3].copy_from_slice(&self.mmap_sector.to_le_bytes());

        let len = path.len().min(PATH_END - PATH_OFFSET);
        record[PATH_OFFSET..PATH_OFFSET + len].copy_from_slice(&path[..len]);

        Ok(record)
    }

    pub fn decode(record: &[u8; RECORD_SIZE]) -> Self {
        let path = &record[PATH_OFFSET..PATH_END];
        let len = path.iter().position(|&b| b == 0).unwrap_or(path.len());

        Self {
            boot_count: record[0],
            mmap_sector: u16::from_le_bytes([record[1], record[2]]),
            uki_path: String::from_utf8_lossy(&path[..len]).into_owned(),
        }
    }
}

/// The four records written at the config LBA
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootConfigBlock {
    pub records: [BootRecord; BOOT_ENTRY_COUNT],
}

impl BootConfigBlock {
    pub fn encode(&self) -> Result<[u8; CONFIG_BLOCK_SIZE]> {
        let mut block = [0u8; CONFIG_BLOCK_SIZE];
        for (chunk, record) in block.chunks_exact_mut(RECORD_SIZE).zip(&self.records) {
            chunk.copy_from_slice(&record.encode()?);
        }
        Ok(block)
    }

    pub fn decode(block: &[u8; CONFIG_BLOCK_SIZE]) -> Self {
        let mut records: [BootRecord; BOOT_ENTRY_COUNT] = Default::default();
        for (record, chunk) in records.iter_mut().zip(block.chunks_exact(RECORD_SIZE)) {
            let mut raw = [0u8; RECORD_SIZE];
            raw.copy_from_slice(chunk);
            *record = BootRecord::decode(&raw);
        }
        Self { records }
    }
}
