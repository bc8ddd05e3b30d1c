#![allow(dead_code)]

use fixgate::{AlignedBuffer, SECTOR_SIZE};

/// Region sized for `sectors` whole sectors, zero-filled.
pub fn region(sectors: usize) -> AlignedBuffer {
    AlignedBuffer::zeroed(sectors * SECTOR_SIZE)
}

/// Overwrites `len` bytes at `offset` with zeros, mimicking on-disk damage.
pub fn corrupt(region: &AlignedBuffer, offset: usize, len: usize) {
    region.buffer().unwrap().put_bytes(offset, &vec![0u8; len]);
}
