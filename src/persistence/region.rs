//! Byte regions shared between the single position writer and its readers.
//!
//! An [`AtomicBuffer`] is a borrowed view: it never owns the memory it points at.
//! The owner is either an [`AlignedBuffer`] (heap) or a
//! [`MappedRegionFile`](crate::persistence::mapped::MappedRegionFile) (mmap).
//! Every access through the view is an atomic load or store, so the view can be
//! copied freely across threads.
//!
//! Fields are accessed with their natural width (`i32` session ids, `i64`
//! positions, `u32` header words and checksums). Checksum computation and
//! zero-scans read record bytes as `u32` words. Those mixed-width reads happen on
//! the writer thread, or while a region is opened with no live writer attached;
//! readers that run alongside a writer only issue natural-width loads.

use std::marker::PhantomData;
use std::ops::Range;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, AtomicU8, Ordering};
use thiserror::Error;

/// Required alignment of a region's base address.
pub const REGION_ALIGNMENT: usize = 8;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("region base address is null")]
    Null,
    #[error("region base address {address:#x} is not 8-byte aligned")]
    Misaligned { address: usize },
    #[error("region capacity {capacity} is invalid: {reason}")]
    Capacity {
        capacity: usize,
        reason: &'static str,
    },
    #[error("region I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Atomic view over externally owned memory.
#[derive(Clone, Copy)]
pub struct AtomicBuffer<'a> {
    base: NonNull<u8>,
    capacity: usize,
    _region: PhantomData<&'a [AtomicU8]>,
}

// SAFETY: every access goes through an atomic type; the lifetime ties the view
// to the owner of the memory.
unsafe impl Send for AtomicBuffer<'_> {}
unsafe impl Sync for AtomicBuffer<'_> {}

impl std::fmt::Debug for AtomicBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicBuffer")
            .field("base", &self.base)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<'a> AtomicBuffer<'a> {
    /// Wraps an exclusively borrowed byte slice. The borrow lasts as long as the view,
    /// so no plain (non-atomic) access can alias it.
    pub fn wrap(bytes: &'a mut [u8]) -> Result<Self, RegionError> {
        // SAFETY: the exclusive borrow guarantees the range is valid and unaliased for 'a.
        unsafe { Self::from_raw_parts(bytes.as_mut_ptr(), bytes.len()) }
    }

    /// Builds a view from a raw base pointer.
    ///
    /// # Safety
    ///
    /// `base..base + capacity` must stay valid for reads and writes for `'a`, and for
    /// that lifetime must only be accessed through atomic operations.
    pub unsafe fn from_raw_parts(base: *mut u8, capacity: usize) -> Result<Self, RegionError> {
        let base = NonNull::new(base).ok_or(RegionError::Null)?;
        let address = base.as_ptr() as usize;
        if address % REGION_ALIGNMENT != 0 {
            return Err(RegionError::Misaligned { address });
        }
        if capacity == 0 {
            return Err(RegionError::Capacity {
                capacity,
                reason: "region is empty",
            });
        }
        Ok(Self {
            base,
            capacity,
            _region: PhantomData,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get_i32_volatile(&self, offset: usize) -> i32 {
        self.i32_at(offset).load(Ordering::Acquire)
    }

    pub fn put_i32_ordered(&self, offset: usize, value: i32) {
        self.i32_at(offset).store(value, Ordering::Release);
    }

    pub fn get_i64_volatile(&self, offset: usize) -> i64 {
        self.i64_at(offset).load(Ordering::Acquire)
    }

    pub fn put_i64_ordered(&self, offset: usize, value: i64) {
        self.i64_at(offset).store(value, Ordering::Release);
    }

    pub fn get_u32(&self, offset: usize) -> u32 {
        self.u32_at(offset).load(Ordering::Acquire)
    }

    pub fn put_u32(&self, offset: usize, value: u32) {
        self.u32_at(offset).store(value, Ordering::Release);
    }

    /// Copies `bytes` into the region one byte at a time.
    pub fn put_bytes(&self, offset: usize, bytes: &[u8]) {
        self.check_bounds(offset, bytes.len());
        for (index, byte) in bytes.iter().enumerate() {
            // SAFETY: bounds checked above; u8 has no alignment requirement.
            let cell = unsafe { AtomicU8::from_ptr(self.base.as_ptr().add(offset + index)) };
            cell.store(*byte, Ordering::Relaxed);
        }
    }

    /// Reads the little-endian `u32` words covering `range` into `out`, returning the
    /// number of bytes produced. `range` must be 4-byte aligned on both ends.
    pub fn get_words(&self, range: Range<usize>, out: &mut [u8]) -> usize {
        let len = range.len().min(out.len() - out.len() % 4);
        let mut written = 0;
        while written < len {
            let word = self.get_u32(range.start + written);
            out[written..written + 4].copy_from_slice(&word.to_le_bytes());
            written += 4;
        }
        written
    }

    /// True when every byte in `range` is zero. `range` must be 4-byte aligned.
    pub fn is_zeroed(&self, range: Range<usize>) -> bool {
        let mut offset = range.start;
        while offset < range.end {
            if self.get_u32(offset) != 0 {
                return false;
            }
            offset += 4;
        }
        true
    }

    fn i32_at(&self, offset: usize) -> &AtomicI32 {
        self.check_access(offset, 4);
        // SAFETY: bounds and alignment checked; the region is only accessed atomically.
        unsafe { AtomicI32::from_ptr(self.base.as_ptr().add(offset).cast()) }
    }

    fn i64_at(&self, offset: usize) -> &AtomicI64 {
        self.check_access(offset, 8);
        // SAFETY: bounds and alignment checked; the region is only accessed atomically.
        unsafe { AtomicI64::from_ptr(self.base.as_ptr().add(offset).cast()) }
    }

    fn u32_at(&self, offset: usize) -> &AtomicU32 {
        self.check_access(offset, 4);
        // SAFETY: bounds and alignment checked; the region is only accessed atomically.
        unsafe { AtomicU32::from_ptr(self.base.as_ptr().add(offset).cast()) }
    }

    fn check_access(&self, offset: usize, width: usize) {
        self.check_bounds(offset, width);
        assert!(
            offset % width == 0,
            "offset {offset} is not aligned for a {width}-byte access"
        );
    }

    fn check_bounds(&self, offset: usize, len: usize) {
        assert!(
            offset
                .checked_add(len)
                .is_some_and(|end| end <= self.capacity),
            "access of {len} bytes at {offset} exceeds region capacity {}",
            self.capacity
        );
    }
}

/// Heap-owned, zero-initialised region with 8-byte alignment.
#[derive(Debug)]
pub struct AlignedBuffer {
    words: Box<[AtomicU64]>,
    capacity: usize,
}

impl AlignedBuffer {
    /// Allocates `capacity` zeroed bytes, rounded up to a whole number of words.
    pub fn zeroed(capacity: usize) -> Self {
        let words = capacity.div_ceil(8);
        Self {
            words: (0..words).map(|_| AtomicU64::new(0)).collect(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn buffer(&self) -> Result<AtomicBuffer<'_>, RegionError> {
        // SAFETY: the words are interior-mutable atomics owned by `self`, which the
        // returned view borrows.
        unsafe { AtomicBuffer::from_raw_parts(self.words.as_ptr() as *mut u8, self.capacity) }
    }
}
