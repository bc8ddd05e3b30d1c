use super::codec::{RecordCodec, HEADER_LENGTH};
use super::framer::SectorFramer;
use super::reader::PositionReader;
use super::{validate_region, PositionIndexError};
use crate::persistence::region::AtomicBuffer;
use log::{info, trace, warn};
use std::cell::Cell;
use std::marker::PhantomData;

/// The only mutator of a position index.
///
/// Mutating calls take `&mut self` and the type is neither `Clone` nor `Sync`, so a
/// writer can move to another thread but never be shared by two. Updates become
/// verifiable on reopen only after [`update_checksums`](Self::update_checksums).
#[derive(Debug)]
pub struct PositionWriter<'a> {
    buffer: AtomicBuffer<'a>,
    framer: SectorFramer,
    codec: RecordCodec,
    dirty: Vec<bool>,
    _single_writer: PhantomData<Cell<()>>,
}

impl<'a> PositionWriter<'a> {
    /// Opens the index over `buffer`. A region that is entirely zero is initialised
    /// with a header and a checksummed first sector; any other region must pass
    /// header and checksum validation.
    pub fn open(buffer: AtomicBuffer<'a>) -> Result<Self, PositionIndexError> {
        let (framer, codec) = validate_region(&buffer)?;
        let mut writer = Self {
            buffer,
            framer,
            codec: codec.unwrap_or_else(RecordCodec::current),
            dirty: vec![false; framer.sector_count()],
            _single_writer: PhantomData,
        };
        if codec.is_none() {
            writer.codec.write_header(&writer.buffer);
            writer.dirty[0] = true;
            writer.update_checksums();
            info!(
                "event=position_index_initialized sectors={} version={}",
                framer.sector_count(),
                writer.codec.acting_version()
            );
        }
        Ok(writer)
    }

    /// Records that `session_id` has been processed up to `position`.
    ///
    /// Overwrites the session's existing record in place, or installs it in the first
    /// empty slot. The store does not check that positions move forward.
    pub fn indexed_up_to(&mut self, session_id: i32, position: i64) -> Result<(), PositionIndexError> {
        if session_id == 0 {
            return Err(PositionIndexError::InvalidSession);
        }
        let record_length = self.codec.record_length();
        for offset in self.framer.slots(HEADER_LENGTH, record_length) {
            let stored = self.codec.session_id(&self.buffer, offset);
            if stored == session_id {
                self.codec.put_position(&self.buffer, offset, position);
                self.mark_dirty(offset);
                return Ok(());
            }
            if stored == 0 {
                self.codec.encode(&self.buffer, offset, session_id, position);
                self.mark_dirty(offset);
                return Ok(());
            }
        }
        warn!(
            "event=position_index_full session_id={} position={} capacity_records={}",
            session_id,
            position,
            self.capacity_records()
        );
        Err(PositionIndexError::OutOfSpace { session_id })
    }

    /// Recomputes and stores the checksum of every sector written since the last call.
    pub fn update_checksums(&mut self) {
        let mut updated = 0;
        for (sector, dirty) in self.dirty.iter_mut().enumerate() {
            if !*dirty {
                continue;
            }
            let checksum = self.framer.write_checksum(&self.buffer, sector);
            trace!(
                "event=position_checksum_updated sector={} checksum={:#010x}",
                sector,
                checksum
            );
            *dirty = false;
            updated += 1;
        }
        if updated > 0 {
            trace!("event=position_checksums_flushed sectors={}", updated);
        }
    }

    pub fn dirty_sectors(&self) -> usize {
        self.dirty.iter().filter(|dirty| **dirty).count()
    }

    /// Total number of record slots in the region.
    pub fn capacity_records(&self) -> usize {
        self.framer
            .slots(HEADER_LENGTH, self.codec.record_length())
            .count()
    }

    /// A reader over the same region; it skips revalidation since this writer
    /// already validated the bytes it is responsible for.
    pub fn reader(&self) -> PositionReader<'a> {
        PositionReader::from_parts(self.buffer, self.framer, self.codec)
    }

    fn mark_dirty(&mut self, offset: usize) {
        let sector = self.framer.sector_of(offset);
        self.dirty[sector] = true;
    }
}
