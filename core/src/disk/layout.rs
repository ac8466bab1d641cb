//! Fixed on-disk layout shared with the stage-2 loader
//!
//! ```text
//! LBA 0x00        protective MBR
//! LBA 0x01..0x22  GPT header + partition entry array (must end by 0x22)
//! LBA 0x22        stage-2 code
//! LBA 0x24        boot configuration block (512 bytes)
//! LBA 0x25..0x2d  memory-map tables, 2 sectors per boot entry
//! LBA > 0x40      first partition
//! ```

use crate::disk::partition::PartitionTable;
use crate::error::{Error, Result};
use core::fmt;

pub const SECTOR_SIZE: usize = 512;

pub const STAGE2_LBA: u64 = 0x22;
pub const CONFIG_LBA: u64 = 0x24;
pub const MMAP_START_LBA: u16 = 0x25;
pub const FIRST_PARTITION_MIN_LBA: u64 = 0x40;

/// Layout problems that are reported but do not abort the run
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayoutWarning {
    PartitionStartTooEarly { number: usize, start_lba: u64 },
}

impl fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PartitionStartTooEarly { number, start_lba } => write!(
                f,
                "Partition {} @{} starts before minimum sector {}, this is unsupported",
                number, start_lba, FIRST_PARTITION_MIN_LBA
            ),
        }
    }
}

/// Check that the GPT leaves the reserved low-LBA region free.
///
/// An overrun of the stage-2 region is fatal. A partition starting at or
/// below [`FIRST_PARTITION_MIN_LBA`] is only logged and returned as a
/// warning.
pub fn validate_layout(table: &PartitionTable) -> Result<Vec<LayoutWarning>> {
    if table.sector_size as usize != SECTOR_SIZE {
        return Err(Error::UnsupportedSectorSize(table.sector_size));
    }

    let end_lba = table.metadata.end_lba();
    if end_lba > STAGE2_LBA {
        return Err(Error::LayoutOverrun {
            end_lba,
            limit: STAGE2_LBA,
        });
    }

    let warnings: Vec<LayoutWarning> = table
        .iter()
        .enumerate()
        .filter(|(_, p)| p.start_lba <= FIRST_PARTITION_MIN_LBA)
        .map(|(i, p)| LayoutWarning::PartitionStartTooEarly {
            number: i + 1,
            start_lba: p.start_lba,
        })
        .collect();

    for warning in &warnings {
        log::warn!("{}", warning);
    }

    Ok(warnings)
}
