// FAT32 filesystem context and FAT operations

use super::super::Fat32Error;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

const SECTOR_SIZE: usize = 512;

/// First FAT value marking end of chain
pub const END_OF_CHAIN: u32 = 0x0FFFFFF8;
const BAD_CLUSTER: u32 = 0x0FFFFFF7;

/// FAT32 filesystem context
#[derive(Debug, Clone)]
pub struct Fat32Context {
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub fat_size: u32,
    pub num_fats: u32,
    pub root_cluster: u32,
    pub data_start_sector: u32,
    pub cluster_count: u32,
}

impl Fat32Context {
    /// Read and validate the BPB of the volume filling `partition_sectors`
    /// sectors at `partition_start`. A volume larger than its partition is
    /// rejected so clusters can never resolve outside the partition.
    pub fn from_boot_sector<B: BlockIo>(
        block_io: &mut B,
        partition_start: u64,
        partition_sectors: u64,
    ) -> Result<Self, Fat32Error> {
        let mut boot_sector = [0u8; SECTOR_SIZE];
        block_io
            .read_blocks(Lba(partition_start), &mut boot_sector)
            .map_err(|_| Fat32Error::IoError)?;

        if boot_sector[510..512] != [0x55, 0xAA] {
            return Err(Fat32Error::InvalidBootSector);
        }

        // Parse boot sector
        let bytes_per_sector = u16::from_le_bytes([boot_sector[0x0B], boot_sector[0x0C]]);
        let sectors_per_cluster = boot_sector[0x0D] as u32;
        let reserved_sectors = u16::from_le_bytes([boot_sector[0x0E], boot_sector[0x0F]]) as u32;
        let num_fats = boot_sector[0x10] as u32;
        let fat_size_16 = u16::from_le_bytes([boot_sector[0x16], boot_sector[0x17]]);
        let total_sectors = u32::from_le_bytes([
            boot_sector[0x20],
            boot_sector[0x21],
            boot_sector[0x22],
            boot_sector[0x23],
        ]);
        let fat_size = u32::from_le_bytes([
            boot_sector[0x24],
            boot_sector[0x25],
            boot_sector[0x26],
            boot_sector[0x27],
        ]);
        let root_cluster = u32::from_le_bytes([
            boot_sector[0x2C],
            boot_sector[0x2D],
            boot_sector[0x2E],
            boot_sector[0x2F],
        ]);

        if bytes_per_sector as usize != SECTOR_SIZE
            || !sectors_per_cluster.is_power_of_two()
            || num_fats == 0
            || fat_size_16 != 0
            || fat_size == 0
        {
            return Err(Fat32Error::InvalidBootSector);
        }

        if total_sectors as u64 > partition_sectors {
            log::debug!(
                "FAT32: volume claims {} sectors, partition has {}",
                total_sectors,
                partition_sectors
            );
            return Err(Fat32Error::InvalidBootSector);
        }

        let data_start_sector = reserved_sectors + (num_fats * fat_size);
        if total_sectors <= data_start_sector {
            return Err(Fat32Error::InvalidBootSector);
        }
        let cluster_count = (total_sectors - data_start_sector) / sectors_per_cluster;

        let ctx = Self {
            sectors_per_cluster,
            reserved_sectors,
            fat_size,
            num_fats,
            root_cluster,
            data_start_sector,
            cluster_count,
        };

        if !ctx.is_data_cluster(root_cluster) {
            return Err(Fat32Error::InvalidBootSector);
        }

        Ok(ctx)
    }

    pub fn cluster_bytes(&self) -> u64 {
        self.sectors_per_cluster as u64 * SECTOR_SIZE as u64
    }

    /// Partition-relative sector of the first sector of `cluster`
    pub fn cluster_to_sector(&self, cluster: u32) -> u64 {
        self.data_start_sector as u64 + (cluster as u64 - 2) * self.sectors_per_cluster as u64
    }

    pub fn is_data_cluster(&self, cluster: u32) -> bool {
        cluster >= 2 && cluster - 2 < self.cluster_count
    }

    /// Follow the chain starting at `first_cluster` to its end.
    ///
    /// Cluster 0 is an empty file and yields an empty chain. Free, bad or
    /// out-of-range links and chains longer than the volume are corrupt.
    pub fn cluster_chain<B: BlockIo>(
        &self,
        block_io: &mut B,
        partition_start: u64,
        first_cluster: u32,
    ) -> Result<Vec<u32>, Fat32Error> {
        let mut chain = Vec::new();
        if first_cluster == 0 {
            return Ok(chain);
        }

        let mut reader = FatReader::new(self, partition_start);
        let mut current = first_cluster;
        loop {
            if !self.is_data_cluster(current) || chain.len() >= self.cluster_count as usize {
                return Err(Fat32Error::CorruptChain);
            }
            chain.push(current);

            let next = reader.entry(block_io, current)?;

            #[cfg(feature = "fat32_debug")]
            log::trace!("FAT32: cluster {} -> {:#x}", current, next);

            if next >= END_OF_CHAIN {
                break;
            }
            if next == 0 || next == BAD_CLUSTER || next == current {
                return Err(Fat32Error::CorruptChain);
            }
            current = next;
        }

        Ok(chain)
    }
}

/// Reads FAT entries from the first FAT, caching the last sector read
struct FatReader<'a> {
    ctx: &'a Fat32Context,
    partition_start: u64,
    cached_sector: Option<u32>,
    sector: [u8; SECTOR_SIZE],
}

impl<'a> FatReader<'a> {
    fn new(ctx: &'a Fat32Context, partition_start: u64) -> Self {
        Self {
            ctx,
            partition_start,
            cached_sector: None,
            sector: [0u8; SECTOR_SIZE],
        }
    }

    fn entry<B: BlockIo>(&mut self, block_io: &mut B, cluster: u32) -> Result<u32, Fat32Error> {
        let fat_offset = cluster * 4;
        let fat_sector = self.ctx.reserved_sectors + (fat_offset / SECTOR_SIZE as u32);
        let entry_offset = (fat_offset % SECTOR_SIZE as u32) as usize;

        if self.cached_sector != Some(fat_sector) {
            block_io
                .read_blocks(
                    Lba(self.partition_start + fat_sector as u64),
                    &mut self.sector,
                )
                .map_err(|_| Fat32Error::IoError)?;
            self.cached_sector = Some(fat_sector);
        }

        let entry = u32::from_le_bytes([
            self.sector[entry_offset],
            self.sector[entry_offset + 1],
            self.sector[entry_offset + 2],
            self.sector[entry_offset + 3],
        ]) & 0x0FFFFFFF; // FAT32 uses only 28 bits

        Ok(entry)
    }
}
