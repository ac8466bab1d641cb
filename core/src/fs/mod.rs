// Filesystem operations (read-only)

mod error;
pub mod fat32_ops;

pub use error::Fat32Error;
pub use fat32_ops::{file_extents, FileExtent, FileExtents};
