//! FAT32 file name handling
//!
//! Short (8.3) names are stored space padded and upper case; long names are
//! spread over VFAT entries stored in reverse order before the short entry
//! they belong to. Lookups compare case-insensitively against either.

use super::types::LongNameEntry;

/// Render an 8.3 name as `NAME.EXT`
pub fn short_name_to_string(name: &[u8; 11]) -> String {
    let mut raw = *name;
    // 0x05 stands in for a leading 0xE5 byte
    if raw[0] == 0x05 {
        raw[0] = 0xE5;
    }

    let base_len = raw[..8].iter().rposition(|&c| c != b' ').map_or(0, |i| i + 1);
    let ext_len = raw[8..].iter().rposition(|&c| c != b' ').map_or(0, |i| i + 1);

    let mut out: String = raw[..base_len].iter().map(|&c| c as char).collect();
    if ext_len > 0 {
        out.push('.');
        out.extend(raw[8..8 + ext_len].iter().map(|&c| c as char));
    }
    out
}

/// Checksum of a short name, stored in each of its long-name entries
pub fn short_name_checksum(name: &[u8; 11]) -> u8 {
    name.iter()
        .fold(0u8, |sum, &c| ((sum & 1) << 7).wrapping_add(sum >> 1).wrapping_add(c))
}

pub fn names_match(stored: &str, wanted: &str) -> bool {
    stored.eq_ignore_ascii_case(wanted) || stored.to_lowercase() == wanted.to_lowercase()
}

/// Collects long-name fragments until the short entry they describe
#[derive(Default)]
pub struct LongNameAssembler {
    fragments: Vec<Option<[u16; 13]>>,
    checksum: u8,
}

impl LongNameAssembler {
    pub fn push(&mut self, entry: &LongNameEntry) {
        let sequence = entry.sequence();

        if entry.is_last() {
            self.fragments = vec![None; sequence];
            self.checksum = entry.checksum;
        }

        let in_set = sequence >= 1 && sequence <= self.fragments.len();
        if !in_set || entry.checksum != self.checksum {
            self.reset();
            return;
        }

        self.fragments[sequence - 1] = Some(entry.units);
    }

    pub fn reset(&mut self) {
        self.fragments.clear();
    }

    /// Long name for the short entry `short_name`, if a complete and
    /// matching set of fragments was collected. Resets the assembler.
    pub fn finish(&mut self, short_name: &[u8; 11]) -> Option<String> {
        let fragments = core::mem::take(&mut self.fragments);
        if fragments.is_empty() || self.checksum != short_name_checksum(short_name) {
            return None;
        }

        let mut units = Vec::with_capacity(fragments.len() * 13);
        for fragment in fragments {
            units.extend_from_slice(&fragment?);
        }

        let len = units.iter().position(|&u| u == 0x0000).unwrap_or(units.len());
        units.truncate(len);
        while units.last() == Some(&0xFFFF) {
            units.pop();
        }

        Some(String::from_utf16_lossy(&units))
    }
}
