//! Bounds-checked little-endian reads for PE parsing

use crate::{PeError, PeResult};

#[inline]
fn bytes<const N: usize>(data: &[u8], offset: usize) -> PeResult<[u8; N]> {
    let end = offset.checked_add(N).ok_or(PeError::CorruptedData)?;
    let slice = data
        .get(offset..end)
        .ok_or(PeError::Truncated { needed: end })?;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}

#[inline]
pub fn read_u8(data: &[u8], offset: usize) -> PeResult<u8> {
    Ok(bytes::<1>(data, offset)?[0])
}

#[inline]
pub fn read_u16(data: &[u8], offset: usize) -> PeResult<u16> {
    bytes(data, offset).map(u16::from_le_bytes)
}

#[inline]
pub fn read_u32(data: &[u8], offset: usize) -> PeResult<u32> {
    bytes(data, offset).map(u32::from_le_bytes)
}

#[inline]
pub fn read_array<const N: usize>(data: &[u8], offset: usize) -> PeResult<[u8; N]> {
    bytes(data, offset)
}
