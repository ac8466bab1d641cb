//! UKI resolution: from a file on the ESP to a memory map
//!
//! The stage-2 loader has no filesystem driver. For every payload it needs
//! the raw disk sectors holding it and the physical address to load them
//! to. The `.linux` section is split at the end of the real-mode setup
//! code, since the two halves of the kernel load to different addresses.

use super::mmap::MemoryMapEntry;
use super::sector_range::{map_section_to_ranges, SectorRange};
use crate::disk::block_io::ImageBlockIo;
use crate::disk::layout::SECTOR_SIZE;
use crate::disk::partition::PartitionInfo;
use crate::error::UkiError;
use crate::fs::{self, FileExtents};
use bootprep_pe::{PeError, PeHeaders, SectionHeader, SectionTable, SetupHeader};
use gpt_disk_io::BlockIo;
use gpt_disk_types::BlockSize;
use std::io::{Read, Seek};

pub const REAL_MODE_ADDR: u32 = 0x0001_0000;
pub const CMDLINE_ADDR: u32 = 0x0001_F000;
pub const PROTECTED_MODE_ADDR: u32 = 0x0010_0000;
pub const INITRD_ADDR: u32 = 0x0400_0000;

const LINUX_SECTION: &str = ".linux";
const CMDLINE_SECTION: &str = ".cmdline";
const INITRD_SECTION: &str = ".initrd";

/// First read when looking for the PE headers
const HEADER_PREFIX_LEN: u64 = 4096;

/// Largest run one memory map entry can describe
const MAX_ENTRY_SECTORS: u32 = u16::MAX as u32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionKind {
    RealMode,
    ProtectedMode,
    CommandLine,
    Initrd,
}

impl RegionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RealMode => ".linux (real-mode)",
            Self::ProtectedMode => ".linux (protected-mode)",
            Self::CommandLine => CMDLINE_SECTION,
            Self::Initrd => INITRD_SECTION,
        }
    }

    pub fn load_addr(&self) -> u32 {
        match self {
            Self::RealMode => REAL_MODE_ADDR,
            Self::ProtectedMode => PROTECTED_MODE_ADDR,
            Self::CommandLine => CMDLINE_ADDR,
            Self::Initrd => INITRD_ADDR,
        }
    }
}

/// A payload to load, in sectors relative to the start of the UKI file
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub sectors: SectorRange,
}

/// Memory map and initrd size for one boot entry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedUki {
    pub mmap: Vec<MemoryMapEntry>,
    pub initrd_size: u32,
}

fn section_sectors(section: &SectionHeader) -> SectorRange {
    SectorRange {
        start: section.pointer_to_raw_data / SECTOR_SIZE as u32,
        length: section.size_of_raw_data.div_ceil(SECTOR_SIZE as u32),
    }
}

/// Every section's raw data must start on a sector boundary
fn check_alignment(sections: &SectionTable) -> Result<(), UkiError> {
    match sections
        .iter()
        .find(|s| s.pointer_to_raw_data % SECTOR_SIZE as u32 != 0)
    {
        Some(section) => Err(UkiError::SectionNotAligned {
            name: section.name,
            offset: section.pointer_to_raw_data,
        }),
        None => Ok(()),
    }
}

/// Regions to load, in map order: real-mode setup, protected-mode kernel,
/// command line, initrd. Only `.linux` is mandatory.
pub fn section_regions(sections: &SectionTable, setup_sects: u8) -> Result<Vec<Region>, UkiError> {
    check_alignment(sections)?;

    let linux = sections
        .find(LINUX_SECTION)
        .ok_or(UkiError::MissingSection(LINUX_SECTION))?;
    let linux = section_sectors(linux);

    let setup = setup_sects as u32;
    let protected_len = linux
        .length
        .checked_sub(setup)
        .ok_or(UkiError::Pe(PeError::CorruptedData))?;

    let mut regions = vec![
        Region {
            kind: RegionKind::RealMode,
            sectors: SectorRange::new(linux.start, setup),
        },
        Region {
            kind: RegionKind::ProtectedMode,
            sectors: SectorRange::new(linux.start + setup, protected_len),
        },
    ];

    for (name, kind) in [
        (CMDLINE_SECTION, RegionKind::CommandLine),
        (INITRD_SECTION, RegionKind::Initrd),
    ] {
        if let Some(section) = sections.find(name) {
            regions.push(Region {
                kind,
                sectors: section_sectors(section),
            });
        }
    }

    Ok(regions)
}

/// Map every region through the file's fragments.
///
/// Each region's load address advances with every emitted run, so the
/// payload lands contiguously in memory even when it is split on disk.
pub fn build_memory_map(
    regions: &[Region],
    fragments: &[SectorRange],
) -> Result<Vec<MemoryMapEntry>, UkiError> {
    let mut mmap = Vec::new();

    for region in regions {
        let ranges = map_section_to_ranges(region.sectors, fragments);
        let mapped: u64 = ranges.iter().map(|r| r.length as u64).sum();
        if mapped != region.sectors.length as u64 {
            return Err(UkiError::ExtentsExhausted {
                section: region.kind.name(),
                mapped,
                expected: region.sectors.length as u64,
            });
        }

        let first = mmap.len();
        let mut addr = region.kind.load_addr();
        for range in ranges {
            let mut done = 0u32;
            while done < range.length {
                let length = (range.length - done).min(MAX_ENTRY_SECTORS);
                let start = range
                    .start
                    .checked_add(done)
                    .ok_or(UkiError::LbaOutOfRange(range.start as u64 + done as u64))?;

                mmap.push(MemoryMapEntry {
                    length: length as u16,
                    start,
                    addr,
                });

                addr = (length as u64 * SECTOR_SIZE as u64)
                    .checked_add(addr as u64)
                    .and_then(|a| u32::try_from(a).ok())
                    .ok_or(UkiError::AddressOverflow(region.kind.name()))?;
                done += length;
            }
        }

        log::debug!(
            "{}: {} sector(s) in {} run(s) from {:#x}",
            region.kind.name(),
            mapped,
            mmap.len() - first,
            region.kind.load_addr()
        );
    }

    Ok(mmap)
}

/// File extents as disk-absolute sector runs
fn fragments(file: &FileExtents) -> Result<Vec<SectorRange>, UkiError> {
    file.extents
        .iter()
        .map(|extent| {
            let start = extent.start_sector();
            let end = start + extent.sector_count();
            if end > u32::MAX as u64 {
                return Err(UkiError::LbaOutOfRange(end));
            }
            Ok(SectorRange::new(start as u32, extent.sector_count() as u32))
        })
        .collect()
}

/// Read the PE headers, growing the prefix until the section table fits
fn read_headers<B: BlockIo>(block_io: &mut B, file: &FileExtents) -> Result<PeHeaders, UkiError> {
    let mut len = file.size.min(HEADER_PREFIX_LEN) as usize;
    loop {
        let prefix = file.read_vec(block_io, 0, len)?;
        match PeHeaders::parse(&prefix) {
            Err(PeError::Truncated { needed }) if needed > len && needed as u64 <= file.size => {
                len = needed;
            }
            other => return other.map_err(UkiError::from),
        }
    }
}

fn read_setup_header<B: BlockIo>(
    block_io: &mut B,
    file: &FileExtents,
    linux: &SectionHeader,
) -> Result<SetupHeader, UkiError> {
    let len = SetupHeader::LEN.min(linux.size_of_raw_data as usize);
    let payload = file.read_vec(block_io, linux.pointer_to_raw_data as u64, len)?;
    let header = SetupHeader::parse(&payload)?;

    if header.has_signature() {
        let (major, minor) = header.protocol_version();
        log::debug!(
            "kernel boot protocol {}.{:02}, {} setup sectors",
            major,
            minor,
            header.setup_sects
        );
    } else {
        log::debug!("kernel setup header has no HdrS signature");
    }

    Ok(header)
}

/// Resolve the UKI at `path` on `partition` into its memory map
pub fn resolve_uki<S: Read + Seek>(
    storage: &mut S,
    partition: &PartitionInfo,
    path: &str,
) -> Result<ResolvedUki, UkiError> {
    let mut block_io = ImageBlockIo::new(storage, BlockSize::BS_512);

    let file = fs::file_extents(&mut block_io, partition.start_lba, partition.size_lba(), path)?;
    let headers = read_headers(&mut block_io, &file)?;

    let linux = headers
        .sections
        .find(LINUX_SECTION)
        .ok_or(UkiError::MissingSection(LINUX_SECTION))?;
    let setup = read_setup_header(&mut block_io, &file, linux)?;

    let regions = section_regions(&headers.sections, setup.setup_sects)?;
    let mmap = build_memory_map(&regions, &fragments(&file)?)?;

    let initrd_size = headers
        .sections
        .find(INITRD_SECTION)
        .map_or(0, |s| s.size_of_raw_data);

    Ok(ResolvedUki { mmap, initrd_size })
}
