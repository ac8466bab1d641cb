//! Common test utilities: in-memory block device and image builders

#![allow(dead_code)]

pub mod builder;
pub use builder::{gpt_disk, Fat32Builder, UkiBuilder};

use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};
use std::io;

/// Writable in-memory block device, used to lay out test images
pub struct MemoryBlockDevice<'a> {
    pub data: &'a mut [u8],
    pub block_size: BlockSize,
}

impl<'a> MemoryBlockDevice<'a> {
    pub fn new(data: &'a mut [u8], block_size: BlockSize) -> Self {
        Self { data, block_size }
    }

    fn range(&self, lba: Lba, len: usize) -> io::Result<std::ops::Range<usize>> {
        let start = lba.0 as usize * self.block_size.to_u32() as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "past end of device"));
        }
        Ok(start..end)
    }
}

impl BlockIo for MemoryBlockDevice<'_> {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        self.block_size
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok((self.data.len() / self.block_size.to_u32() as usize) as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(start_lba, dst.len())?;
        dst.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(start_lba, src.len())?;
        self.data[range].copy_from_slice(src);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub const SECTOR: usize = 512;

/// Read `count` sectors at `lba` straight from an image
pub fn sectors(image: &[u8], lba: u64, count: usize) -> &[u8] {
    let start = lba as usize * SECTOR;
    &image[start..start + count * SECTOR]
}

/// Boot configuration JSON with the given entries, padded with empty ones
pub fn config_json(entries: &[&str]) -> String {
    let mut all: Vec<&str> = entries.to_vec();
    all.resize(4, "{}");
    format!(r#"{{"boot_entries": [{}]}}"#, all.join(", "))
}
