//! Builders for synthetic disk images: GPT, FAT32 volume and UKI

use super::MemoryBlockDevice;
use gpt_disk_io::Disk;
use gpt_disk_types::{
    guid, BlockSize, GptHeader, GptPartitionEntryArray, GptPartitionType, LbaLe, U32Le,
};
use std::collections::HashMap;

const SECTOR: usize = 512;

/// Zeroed image of `blocks` blocks with a protective MBR and a primary GPT
/// holding an EFI system partition for each `(start_lba, blocks)`
pub fn gpt_disk(
    blocks: u64,
    block_size: BlockSize,
    entry_count: u32,
    partitions: &[(u64, u64)],
) -> Vec<u8> {
    let bs = block_size.to_u32() as usize;
    let mut image = vec![0u8; blocks as usize * bs];

    let mut header = GptHeader {
        my_lba: LbaLe::from_u64(1),
        alternate_lba: LbaLe::from_u64(blocks - 1),
        first_usable_lba: LbaLe::from_u64(34),
        last_usable_lba: LbaLe::from_u64(blocks - 34),
        disk_guid: guid!("57a7b2b4-6e2c-4f7d-9d1e-0b0a1e5c3f21"),
        partition_entry_lba: LbaLe::from_u64(2),
        number_of_partition_entries: U32Le::from_u32(entry_count),
        ..Default::default()
    };

    let layout = header.get_partition_entry_array_layout().unwrap();
    let array_bytes = (entry_count as usize * 128).div_ceil(bs) * bs;
    let mut entry_buf = vec![0u8; array_bytes];
    let mut entry_array = GptPartitionEntryArray::new(layout, block_size, &mut entry_buf).unwrap();

    for (i, &(start, len)) in partitions.iter().enumerate() {
        let entry = entry_array.get_partition_entry_mut(i as u32).unwrap();
        entry.partition_type_guid = GptPartitionType::EFI_SYSTEM;
        entry.unique_partition_guid = guid!("0d3c7b1a-2f44-4c55-8a9e-6b1d2c3e4f50");
        entry.starting_lba = LbaLe::from_u64(start);
        entry.ending_lba = LbaLe::from_u64(start + len - 1);
    }

    header.partition_entry_array_crc32 = entry_array.calculate_crc32();
    header.update_header_crc32();

    let mut disk = Disk::new(MemoryBlockDevice::new(&mut image, block_size)).unwrap();
    let mut block_buf = vec![0u8; bs];
    disk.write_protective_mbr(&mut block_buf).unwrap();
    disk.write_primary_gpt_header(&header, &mut block_buf).unwrap();
    disk.write_gpt_partition_entry_array(&entry_array).unwrap();
    disk.flush().unwrap();
    drop(disk);

    image
}

const RESERVED_SECTORS: u32 = 32;
const NUM_FATS: u32 = 2;
const EOC: u32 = 0x0FFF_FFFF;

/// FAT32 volume with one sector per cluster, so file sectors and clusters
/// line up one to one.
///
/// Every directory occupies a single cluster.
pub struct Fat32Builder {
    data: Vec<u8>,
    fat_size: u32,
    next_cluster: u32,
    next_slot: HashMap<u32, usize>,
    short_names: u32,
}

impl Fat32Builder {
    pub const ROOT: u32 = 2;

    pub fn new(total_sectors: u32) -> Self {
        // one FAT entry per sector is more than enough
        let fat_size = (total_sectors * 4).div_ceil(SECTOR as u32);
        let mut data = vec![0u8; total_sectors as usize * SECTOR];

        let bs = &mut data[..SECTOR];
        bs[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        bs[3..11].copy_from_slice(b"MSWIN4.1");
        bs[0x0B..0x0D].copy_from_slice(&(SECTOR as u16).to_le_bytes());
        bs[0x0D] = 1;
        bs[0x0E..0x10].copy_from_slice(&(RESERVED_SECTORS as u16).to_le_bytes());
        bs[0x10] = NUM_FATS as u8;
        bs[0x15] = 0xF8;
        bs[0x20..0x24].copy_from_slice(&total_sectors.to_le_bytes());
        bs[0x24..0x28].copy_from_slice(&fat_size.to_le_bytes());
        bs[0x2C..0x30].copy_from_slice(&Self::ROOT.to_le_bytes());
        bs[0x52..0x5A].copy_from_slice(b"FAT32   ");
        bs[510] = 0x55;
        bs[511] = 0xAA;

        let mut fat = Self {
            data,
            fat_size,
            next_cluster: 3,
            next_slot: HashMap::new(),
            short_names: 0,
        };
        fat.set_fat(0, 0x0FFF_FFF8);
        fat.set_fat(1, EOC);
        fat.set_fat(Self::ROOT, EOC);
        fat
    }

    fn data_start(&self) -> u32 {
        RESERVED_SECTORS + NUM_FATS * self.fat_size
    }

    /// Partition-relative sector of `cluster`
    pub fn cluster_sector(&self, cluster: u32) -> u64 {
        (self.data_start() + cluster - 2) as u64
    }

    pub fn set_fat(&mut self, cluster: u32, value: u32) {
        for fat in 0..NUM_FATS {
            let offset = ((RESERVED_SECTORS + fat * self.fat_size) as usize * SECTOR)
                + cluster as usize * 4;
            self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    fn link(&mut self, clusters: &[u32]) {
        for pair in clusters.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set_fat(last, EOC);
        }
    }

    /// `count` consecutive clusters that no one else has taken yet
    pub fn allocate(&mut self, count: u32) -> Vec<u32> {
        let clusters = (self.next_cluster..self.next_cluster + count).collect();
        self.next_cluster += count;
        clusters
    }

    fn short_name(&mut self, name: &str) -> [u8; 11] {
        let upper = name.to_ascii_uppercase();
        let (base, ext) = upper.rsplit_once('.').unwrap_or((upper.as_str(), ""));

        let mut short = [b' '; 11];
        if name == upper && !base.is_empty() && base.len() <= 8 && ext.len() <= 3 {
            short[..base.len()].copy_from_slice(base.as_bytes());
            short[8..8 + ext.len()].copy_from_slice(ext.as_bytes());
        } else {
            self.short_names += 1;
            let tail = format!("~{}", self.short_names);
            let keep: Vec<u8> = base
                .bytes()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(8 - tail.len())
                .collect();
            short[..keep.len()].copy_from_slice(&keep);
            short[keep.len()..keep.len() + tail.len()].copy_from_slice(tail.as_bytes());
            let ext: Vec<u8> = ext.bytes().take(3).collect();
            short[8..8 + ext.len()].copy_from_slice(&ext);
        }
        short
    }

    fn needs_long_name(name: &str, short: &[u8; 11]) -> bool {
        let base = String::from_utf8_lossy(&short[..8]).trim_end().to_string();
        let ext = String::from_utf8_lossy(&short[8..]).trim_end().to_string();
        let rendered = if ext.is_empty() {
            base
        } else {
            format!("{}.{}", base, ext)
        };
        rendered != name
    }

    fn push_raw(&mut self, dir: u32, raw: [u8; 32]) {
        let base = self.cluster_sector(dir) as usize * SECTOR;
        let slot = self.next_slot.entry(dir).or_insert(0);
        assert!(*slot < SECTOR / 32, "directory cluster {} is full", dir);
        let offset = base + *slot * 32;
        *slot += 1;
        self.data[offset..offset + 32].copy_from_slice(&raw);
    }

    fn push_entry(&mut self, dir: u32, name: &str, attr: u8, cluster: u32, size: u32) {
        let short = self.short_name(name);

        if Self::needs_long_name(name, &short) {
            let checksum = short
                .iter()
                .fold(0u8, |s, &c| ((s & 1) << 7).wrapping_add(s >> 1).wrapping_add(c));
            let mut units: Vec<u16> = name.encode_utf16().collect();
            if units.len() % 13 != 0 {
                units.push(0);
            }
            while units.len() % 13 != 0 {
                units.push(0xFFFF);
            }

            let count = units.len() / 13;
            const OFFSETS: [usize; 13] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];
            for seq in (1..=count).rev() {
                let mut raw = [0u8; 32];
                raw[0] = seq as u8 | if seq == count { 0x40 } else { 0 };
                raw[11] = 0x0F;
                raw[13] = checksum;
                for (unit, offset) in units[(seq - 1) * 13..seq * 13].iter().zip(OFFSETS) {
                    raw[offset..offset + 2].copy_from_slice(&unit.to_le_bytes());
                }
                self.push_raw(dir, raw);
            }
        }

        let mut raw = [0u8; 32];
        raw[..11].copy_from_slice(&short);
        raw[11] = attr;
        raw[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
        raw[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
        raw[28..32].copy_from_slice(&size.to_le_bytes());
        self.push_raw(dir, raw);
    }

    /// Create directory `name` in `parent`, returning its cluster
    pub fn mkdir(&mut self, parent: u32, name: &str) -> u32 {
        let cluster = self.allocate(1)[0];
        self.link(&[cluster]);
        self.push_entry(parent, name, 0x10, cluster, 0);

        let parent_ref = if parent == Self::ROOT { 0 } else { parent };
        let mut dot = [0u8; 32];
        dot[..11].copy_from_slice(b".          ");
        dot[11] = 0x10;
        dot[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
        self.push_raw(cluster, dot);
        let mut dotdot = [0u8; 32];
        dotdot[..11].copy_from_slice(b"..         ");
        dotdot[11] = 0x10;
        dotdot[26..28].copy_from_slice(&(parent_ref as u16).to_le_bytes());
        self.push_raw(cluster, dotdot);

        cluster
    }

    /// Store `content` in exactly the given clusters, in order
    pub fn add_file_at(&mut self, dir: u32, name: &str, content: &[u8], clusters: &[u32]) {
        assert_eq!(clusters.len(), content.len().div_ceil(SECTOR));
        for (chunk, &cluster) in content.chunks(SECTOR).zip(clusters) {
            let offset = self.cluster_sector(cluster) as usize * SECTOR;
            self.data[offset..offset + chunk.len()].copy_from_slice(chunk);
        }
        self.link(clusters);
        let first = clusters.first().copied().unwrap_or(0);
        self.push_entry(dir, name, 0x20, first, content.len() as u32);
    }

    /// Store `content` contiguously, returning the clusters used
    pub fn add_file(&mut self, dir: u32, name: &str, content: &[u8]) -> Vec<u32> {
        let clusters = self.allocate(content.len().div_ceil(SECTOR) as u32);
        self.add_file_at(dir, name, content, &clusters);
        clusters
    }

    /// Copy the volume into `image` at `partition_start` (512-byte LBA)
    pub fn install(self, image: &mut [u8], partition_start: u64) {
        let start = partition_start as usize * SECTOR;
        image[start..start + self.data.len()].copy_from_slice(&self.data);
    }
}

/// Minimal PE32+ UKI: headers in the first 0x400 bytes, then `.cmdline`,
/// `.linux` and `.initrd`, each starting on a sector boundary.
pub struct UkiBuilder {
    pub setup_sects: u8,
    pub linux_sectors: u32,
    pub cmdline: Vec<u8>,
    pub initrd_len: u32,
    pub with_linux: bool,
    /// Added to the `.initrd` raw data pointer
    pub initrd_misalign: u32,
}

impl Default for UkiBuilder {
    fn default() -> Self {
        Self {
            setup_sects: 4,
            linux_sectors: 40,
            cmdline: b"console=ttyS0 root=/dev/sda2".to_vec(),
            initrd_len: 3000,
            with_linux: true,
            initrd_misalign: 0,
        }
    }
}

/// Where a built UKI put its sections, in file sectors
#[derive(Debug, Clone, Copy)]
pub struct UkiLayout {
    pub cmdline: (u32, u32),
    pub linux: (u32, u32),
    pub initrd: (u32, u32),
}

impl UkiBuilder {
    const HEADERS: u32 = 0x400;
    const E_LFANEW: usize = 0x80;
    const OPT_SIZE: usize = 240;

    pub fn layout(&self) -> UkiLayout {
        let sectors = |len: u32| len.div_ceil(SECTOR as u32);
        let cmdline = (Self::HEADERS / SECTOR as u32, sectors(self.cmdline.len() as u32));
        let linux_len = if self.with_linux { self.linux_sectors } else { 0 };
        let linux = (cmdline.0 + cmdline.1, linux_len);
        let initrd = (linux.0 + linux.1, sectors(self.initrd_len));
        UkiLayout {
            cmdline,
            linux,
            initrd,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let layout = self.layout();
        let total = (layout.initrd.0 + layout.initrd.1) as usize * SECTOR;
        let mut data = vec![0u8; total];

        let mut sections: Vec<(&str, u32, u32)> = vec![(
            ".cmdline",
            layout.cmdline.0 * SECTOR as u32,
            self.cmdline.len() as u32,
        )];
        if self.with_linux {
            sections.push((
                ".linux",
                layout.linux.0 * SECTOR as u32,
                self.linux_sectors * SECTOR as u32,
            ));
        }
        sections.push((
            ".initrd",
            layout.initrd.0 * SECTOR as u32 + self.initrd_misalign,
            self.initrd_len,
        ));

        // DOS + PE + COFF
        let pe = Self::E_LFANEW;
        data[0..2].copy_from_slice(b"MZ");
        data[0x3C..0x40].copy_from_slice(&(pe as u32).to_le_bytes());
        data[pe..pe + 4].copy_from_slice(b"PE\0\0");
        data[pe + 4..pe + 6].copy_from_slice(&0x8664u16.to_le_bytes());
        data[pe + 6..pe + 8].copy_from_slice(&(sections.len() as u16).to_le_bytes());
        data[pe + 20..pe + 22].copy_from_slice(&(Self::OPT_SIZE as u16).to_le_bytes());

        let opt = pe + 24;
        data[opt..opt + 2].copy_from_slice(&0x20Bu16.to_le_bytes());
        data[opt + 36..opt + 40].copy_from_slice(&512u32.to_le_bytes());
        data[opt + 56..opt + 60].copy_from_slice(&(total as u32).to_le_bytes());
        data[opt + 60..opt + 64].copy_from_slice(&Self::HEADERS.to_le_bytes());

        let table = opt + Self::OPT_SIZE;
        for (i, (name, offset, size)) in sections.iter().enumerate() {
            let s = table + i * 40;
            data[s..s + name.len()].copy_from_slice(name.as_bytes());
            data[s + 8..s + 12].copy_from_slice(&size.to_le_bytes());
            data[s + 16..s + 20].copy_from_slice(&size.to_le_bytes());
            data[s + 20..s + 24].copy_from_slice(&offset.to_le_bytes());
        }

        let cmdline = layout.cmdline.0 as usize * SECTOR;
        data[cmdline..cmdline + self.cmdline.len()].copy_from_slice(&self.cmdline);

        if self.with_linux {
            let linux = layout.linux.0 as usize * SECTOR;
            data[linux + 0x1f1] = self.setup_sects;
            data[linux + 0x1fe..linux + 0x200].copy_from_slice(&0xAA55u16.to_le_bytes());
            data[linux + 0x202..linux + 0x206].copy_from_slice(b"HdrS");
            data[linux + 0x206..linux + 0x208].copy_from_slice(&0x020Fu16.to_le_bytes());
        }

        let initrd = layout.initrd.0 as usize * SECTOR;
        for (i, byte) in data[initrd..].iter_mut().take(self.initrd_len as usize).enumerate() {
            *byte = (i % 251) as u8;
        }

        data
    }
}
