//! Mapping logical file ranges onto physical disk sectors
//!
//! A file on disk is a list of fragments, each a run of consecutive
//! sectors. Laid end to end in list order the fragments form the file.
//! [`map_section_to_ranges`] takes a sector range relative to the start of
//! the file and returns the disk ranges holding it, split wherever the
//! range crosses from one fragment into the next.

/// A run of `length` 512-byte sectors starting at sector `start`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SectorRange {
    pub start: u32,
    pub length: u32,
}

impl SectorRange {
    pub const fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    pub fn end(&self) -> u64 {
        self.start as u64 + self.length as u64
    }
}

/// Disk ranges backing `section` (file-relative) within `fragments`
/// (disk-absolute, in file order).
///
/// Ranges come out in fragment order and are never empty. When the
/// fragments end before the section does, the result covers only the
/// reachable part; callers check the total.
pub fn map_section_to_ranges(section: SectorRange, fragments: &[SectorRange]) -> Vec<SectorRange> {
    let mut ranges = Vec::new();
    let mut target_start = section.start as u64;
    let mut remaining = section.length;
    let mut current_offset = 0u64;

    for fragment in fragments {
        if remaining == 0 {
            break;
        }

        let fragment_end = current_offset + fragment.length as u64;
        if current_offset <= target_start && target_start < fragment_end {
            let relative_start = target_start - current_offset;
            // relative_start < fragment.length, so these fit in u32
            let available = fragment.length - relative_start as u32;
            let length = remaining.min(available);

            ranges.push(SectorRange {
                start: fragment.start + relative_start as u32,
                length,
            });

            remaining -= length;
            target_start += length as u64;
        }

        current_offset = fragment_end;
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(ranges: &[SectorRange]) -> u64 {
        ranges.iter().map(|r| r.length as u64).sum()
    }

    #[test]
    fn splits_at_fragment_boundary() {
        let fragments = [SectorRange::new(100, 10), SectorRange::new(300, 5)];
        let ranges = map_section_to_ranges(SectorRange::new(8, 4), &fragments);
        assert_eq!(ranges, [SectorRange::new(108, 2), SectorRange::new(300, 2)]);
    }

    #[test]
    fn range_inside_one_fragment() {
        let fragments = [
            SectorRange::new(100, 10),
            SectorRange::new(300, 5),
            SectorRange::new(50, 20),
        ];
        let ranges = map_section_to_ranges(SectorRange::new(16, 3), &fragments);
        assert_eq!(ranges, [SectorRange::new(51, 3)]);
    }

    #[test]
    fn spans_several_fragments() {
        let fragments = [
            SectorRange::new(100, 10),
            SectorRange::new(300, 5),
            SectorRange::new(50, 20),
        ];
        let ranges = map_section_to_ranges(SectorRange::new(9, 10), &fragments);
        assert_eq!(
            ranges,
            [
                SectorRange::new(109, 1),
                SectorRange::new(300, 5),
                SectorRange::new(50, 4),
            ]
        );
    }

    #[test]
    fn zero_length_section_maps_to_nothing() {
        let fragments = [SectorRange::new(100, 10)];
        assert!(map_section_to_ranges(SectorRange::new(3, 0), &fragments).is_empty());
    }

    #[test]
    fn short_fragments_give_short_result() {
        let fragments = [SectorRange::new(100, 10), SectorRange::new(300, 5)];
        let ranges = map_section_to_ranges(SectorRange::new(12, 10), &fragments);
        assert_eq!(ranges, [SectorRange::new(302, 3)]);

        let past_end = map_section_to_ranges(SectorRange::new(15, 1), &fragments);
        assert!(past_end.is_empty());
    }

    #[test]
    fn conserves_length_for_every_target() {
        let fragments = [
            SectorRange::new(1000, 3),
            SectorRange::new(10, 1),
            SectorRange::new(500, 7),
            SectorRange::new(2000, 2),
        ];
        let file_len: u32 = fragments.iter().map(|f| f.length).sum();

        for start in 0..=file_len + 2 {
            for length in 0..=file_len + 2 {
                let ranges = map_section_to_ranges(SectorRange::new(start, length), &fragments);
                let reachable = file_len.saturating_sub(start).min(length) as u64;

                assert_eq!(total(&ranges), reachable, "start {} length {}", start, length);
                assert!(ranges.iter().all(|r| r.length > 0));

                // each range lies inside a fragment, visited in order
                let mut last_fragment = 0;
                for range in &ranges {
                    let index = fragments
                        .iter()
                        .position(|f| range.start >= f.start && range.end() <= f.end())
                        .unwrap();
                    assert!(index >= last_fragment);
                    last_fragment = index;
                }
            }
        }
    }
}
