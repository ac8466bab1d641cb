// Adapter exposing seekable disk images through gpt_disk_io's BlockIo

use super::layout::SECTOR_SIZE;
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Read-only block view over a disk image.
///
/// Borrows the storage for the duration of one phase, so the same handle
/// can be wrapped again with another block size (GPT probing) or by the
/// FAT32 reader.
pub struct ImageBlockIo<'a, T> {
    storage: &'a mut T,
    block_size: BlockSize,
}

impl<'a, T: Read + Seek> ImageBlockIo<'a, T> {
    pub fn new(storage: &'a mut T, block_size: BlockSize) -> Self {
        Self {
            storage,
            block_size,
        }
    }

    fn block_bytes(&self) -> u64 {
        u64::from(self.block_size.to_u32())
    }

    fn check_buffer(&self, len: usize) -> io::Result<()> {
        if len as u64 % self.block_bytes() != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "buffer is not a multiple of the block size",
            ));
        }
        Ok(())
    }
}

impl<T: Read + Seek> BlockIo for ImageBlockIo<'_, T> {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        self.block_size
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        let len = self.storage.seek(SeekFrom::End(0))?;
        Ok(len / self.block_bytes())
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        self.check_buffer(dst.len())?;
        let offset = start_lba
            .0
            .checked_mul(self.block_bytes())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "LBA out of range"))?;
        self.storage.seek(SeekFrom::Start(offset))?;
        self.storage.read_exact(dst)
    }

    fn write_blocks(&mut self, _start_lba: Lba, _src: &[u8]) -> Result<(), Self::Error> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "disk image is opened read-only",
        ))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Read whole 512-byte sectors starting at `lba`
pub fn read_sectors<R: Read + Seek>(storage: &mut R, lba: u64, dst: &mut [u8]) -> io::Result<()> {
    ImageBlockIo::new(storage, BlockSize::BS_512).read_blocks(Lba(lba), dst)
}

/// Write whole 512-byte sectors starting at `lba`
pub fn write_sectors<W: Write + Seek>(storage: &mut W, lba: u64, src: &[u8]) -> io::Result<()> {
    if src.len() % SECTOR_SIZE != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "write is not a whole number of sectors",
        ));
    }
    storage.seek(SeekFrom::Start(lba * SECTOR_SIZE as u64))?;
    storage.write_all(src)
}
