// Boot records consumed by the stage-2 loader

pub mod entry;
pub mod mmap;
pub mod sector_range;
pub mod uki;

pub use entry::{BootConfig, BootConfigBlock, BootEntry, BootRecord};
pub use mmap::{MemoryMap, MemoryMapEntry};
pub use sector_range::{map_section_to_ranges, SectorRange};
pub use uki::{resolve_uki, ResolvedUki};
