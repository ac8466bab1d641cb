// Partition information as read from the GPT

use super::gpt_ops::GptMetadata;

#[derive(Copy, Clone, Debug)]
pub struct PartitionInfo {
    pub index: u32,
    pub partition_type: PartitionType,
    pub start_lba: u64,
    pub end_lba: u64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PartitionType {
    EfiSystem,
    LinuxFilesystem,
    LinuxSwap,
    BasicData,
    Unknown,
}

impl PartitionInfo {
    pub fn size_lba(&self) -> u64 {
        self.end_lba - self.start_lba + 1
    }

    pub fn type_name(&self) -> &'static str {
        match self.partition_type {
            PartitionType::EfiSystem => "EFI System",
            PartitionType::LinuxFilesystem => "Linux FS",
            PartitionType::LinuxSwap => "Linux Swap",
            PartitionType::BasicData => "Basic Data",
            PartitionType::Unknown => "Unknown",
        }
    }
}

impl PartitionType {
    /// Convert from gpt_disk_types GUID to PartitionType
    pub fn from_gpt_guid(guid: &gpt_disk_types::GptPartitionType) -> Self {
        use gpt_disk_types::{guid, GptPartitionType as GptType};

        if guid == &GptType::EFI_SYSTEM {
            PartitionType::EfiSystem
        } else if guid == &GptType::BASIC_DATA {
            PartitionType::BasicData
        } else {
            // Check Linux types
            let linux_fs = GptType(guid!("0fc63daf-8483-4772-8e79-3d69d8477de4"));
            let linux_swap = GptType(guid!("0657fd6d-a4ab-43c4-84e5-0933c84b4f4f"));

            if guid == &linux_fs {
                PartitionType::LinuxFilesystem
            } else if guid == &linux_swap {
                PartitionType::LinuxSwap
            } else {
                PartitionType::Unknown
            }
        }
    }
}

/// Partition table for a disk image, used entries only, in array order
pub struct PartitionTable {
    partitions: Vec<PartitionInfo>,
    /// Logical sector size the GPT was found with
    pub sector_size: u32,
    pub metadata: GptMetadata,
}

impl PartitionTable {
    pub fn new(sector_size: u32, metadata: GptMetadata) -> Self {
        Self {
            partitions: Vec::new(),
            sector_size,
            metadata,
        }
    }

    pub fn add_partition(&mut self, info: PartitionInfo) {
        self.partitions.push(info);
    }

    pub fn count(&self) -> usize {
        self.partitions.len()
    }

    pub fn get(&self, index: usize) -> Option<&PartitionInfo> {
        self.partitions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionInfo> {
        self.partitions.iter()
    }
}
