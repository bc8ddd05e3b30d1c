use super::PositionIndexError;
use crate::persistence::region::{AtomicBuffer, RegionError};
use crc32fast::Hasher;
use std::ops::Range;

/// Size of a sector. Changing it changes the on-disk format.
pub const SECTOR_SIZE: usize = 4096;
/// Trailing checksum slot at the end of every sector.
pub const CHECKSUM_SIZE: usize = 4;
/// Bytes of a sector available to records (and, in sector 0, the header).
pub const SECTOR_DATA_LENGTH: usize = SECTOR_SIZE - CHECKSUM_SIZE;

const CHECKSUM_CHUNK: usize = 512;

/// Offset arithmetic shared by the writer and every reader so they agree on
/// record placement. Records never straddle a sector or overlap its checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorFramer {
    capacity: usize,
}

impl SectorFramer {
    pub fn new(capacity: usize) -> Result<Self, RegionError> {
        if capacity == 0 || capacity % SECTOR_SIZE != 0 {
            return Err(RegionError::Capacity {
                capacity,
                reason: "must be a non-zero multiple of the sector size",
            });
        }
        Ok(Self { capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the offset at which a record of `record_length` bytes starting no
    /// earlier than `offset` fits entirely inside one sector, or `None` once the
    /// region has no room left.
    pub fn claim(&self, offset: usize, record_length: usize) -> Option<usize> {
        if offset >= self.capacity || record_length > SECTOR_DATA_LENGTH {
            return None;
        }
        let next_sector = (offset / SECTOR_SIZE + 1) * SECTOR_SIZE;
        if offset + record_length <= next_sector - CHECKSUM_SIZE {
            return Some(offset);
        }
        if next_sector >= self.capacity {
            None
        } else {
            Some(next_sector)
        }
    }

    /// Every claimable record offset from `start` onwards, in storage order.
    pub fn slots(&self, start: usize, record_length: usize) -> Slots {
        Slots {
            framer: *self,
            next: start,
            record_length,
        }
    }

    pub fn sector_count(&self) -> usize {
        self.capacity / SECTOR_SIZE
    }

    pub fn sector_of(&self, offset: usize) -> usize {
        offset / SECTOR_SIZE
    }

    pub fn checksum_offset(&self, sector: usize) -> usize {
        sector * SECTOR_SIZE + SECTOR_DATA_LENGTH
    }

    pub fn sector_data(&self, sector: usize) -> Range<usize> {
        let start = sector * SECTOR_SIZE;
        start..start + SECTOR_DATA_LENGTH
    }

    /// CRC-32 of a sector's data span as it currently sits in `buffer`.
    pub fn sector_checksum(&self, buffer: &AtomicBuffer<'_>, sector: usize) -> u32 {
        let data = self.sector_data(sector);
        let mut hasher = Hasher::new();
        let mut chunk = [0u8; CHECKSUM_CHUNK];
        let mut offset = data.start;
        while offset < data.end {
            let end = (offset + CHECKSUM_CHUNK).min(data.end);
            let read = buffer.get_words(offset..end, &mut chunk);
            hasher.update(&chunk[..read]);
            offset = end;
        }
        hasher.finalize()
    }

    pub fn write_checksum(&self, buffer: &AtomicBuffer<'_>, sector: usize) -> u32 {
        let checksum = self.sector_checksum(buffer, sector);
        buffer.put_u32(self.checksum_offset(sector), checksum);
        checksum
    }

    /// Checks every sector against its stored checksum. A sector whose data and
    /// checksum are both zero has never been written and is accepted, as long as no
    /// later sector holds data: slots fill in storage order, so an empty sector in
    /// front of a written one is a lost page. Everything else must match exactly,
    /// including sectors written but never checksummed.
    pub fn validate_checksums(&self, buffer: &AtomicBuffer<'_>) -> Result<(), PositionIndexError> {
        let mut first_empty = None;
        for sector in 0..self.sector_count() {
            let stored = buffer.get_u32(self.checksum_offset(sector));
            if stored == 0 && buffer.is_zeroed(self.sector_data(sector)) {
                first_empty.get_or_insert(sector);
                continue;
            }
            if let Some(missing) = first_empty {
                return Err(PositionIndexError::MissingSector {
                    sector: missing,
                    written: sector,
                });
            }
            let computed = self.sector_checksum(buffer, sector);
            if computed != stored {
                return Err(PositionIndexError::Corruption {
                    sector,
                    stored,
                    computed,
                });
            }
        }
        Ok(())
    }
}

/// Iterator over claimed record offsets; see [`SectorFramer::slots`].
#[derive(Debug, Clone)]
pub struct Slots {
    framer: SectorFramer,
    next: usize,
    record_length: usize,
}

impl Iterator for Slots {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let offset = self.framer.claim(self.next, self.record_length)?;
        self.next = offset + self.record_length;
        Some(offset)
    }
}
