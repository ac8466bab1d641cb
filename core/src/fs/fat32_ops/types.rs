// FAT32 directory entry types

pub const DIR_ENTRY_SIZE: usize = 32;

pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_LONG_NAME: u8 = 0x0F;

const DELETED_MARKER: u8 = 0xE5;
const LAST_LONG_ENTRY: u8 = 0x40;

/// FAT32 short directory entry (32 bytes)
#[derive(Clone, Copy, Debug)]
pub struct DirEntry {
    pub name: [u8; 11], // 8.3 filename
    pub attr: u8,       // File attributes
    pub cluster_high: u16,
    pub cluster_low: u16,
    pub file_size: u32,
}

impl DirEntry {
    pub fn parse(raw: &[u8; DIR_ENTRY_SIZE]) -> Self {
        let mut name = [0u8; 11];
        name.copy_from_slice(&raw[0..11]);

        Self {
            name,
            attr: raw[11],
            cluster_high: u16::from_le_bytes([raw[20], raw[21]]),
            cluster_low: u16::from_le_bytes([raw[26], raw[27]]),
            file_size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }

    /// No further entries follow in this directory
    pub fn is_end(&self) -> bool {
        self.name[0] == 0x00
    }

    pub fn is_deleted(&self) -> bool {
        self.name[0] == DELETED_MARKER
    }

    pub fn is_long_name(&self) -> bool {
        self.attr & 0x3F == ATTR_LONG_NAME
    }

    pub fn is_volume_label(&self) -> bool {
        self.attr & ATTR_VOLUME_ID != 0
    }

    pub fn is_directory(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    /// `.` and `..`
    pub fn is_dot_entry(&self) -> bool {
        self.name[0] == b'.'
    }

    pub fn first_cluster(&self) -> u32 {
        ((self.cluster_high as u32) << 16) | (self.cluster_low as u32)
    }
}

/// VFAT long-name entry carrying 13 UTF-16 units of the name
#[derive(Clone, Copy, Debug)]
pub struct LongNameEntry {
    pub order: u8,
    pub checksum: u8,
    pub units: [u16; 13],
}

impl LongNameEntry {
    const UNIT_OFFSETS: [usize; 13] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];

    pub fn parse(raw: &[u8; DIR_ENTRY_SIZE]) -> Self {
        let mut units = [0u16; 13];
        for (unit, &offset) in units.iter_mut().zip(Self::UNIT_OFFSETS.iter()) {
            *unit = u16::from_le_bytes([raw[offset], raw[offset + 1]]);
        }

        Self {
            order: raw[0],
            checksum: raw[13],
            units,
        }
    }

    /// 1-based position of this fragment within the name
    pub fn sequence(&self) -> usize {
        (self.order & 0x1F) as usize
    }

    pub fn is_last(&self) -> bool {
        self.order & LAST_LONG_ENTRY != 0
    }
}
