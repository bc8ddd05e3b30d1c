use super::codec::{RecordCodec, HEADER_LENGTH};
use super::framer::{SectorFramer, Slots};
use super::{validate_region, PositionIndexError, UNKNOWN_POSITION};
use crate::persistence::region::AtomicBuffer;

/// Receives every occupied record during [`PositionReader::for_each`].
pub trait IndexedPositionConsumer {
    fn accept(&mut self, session_id: i32, position: i64);
}

impl<F> IndexedPositionConsumer for F
where
    F: FnMut(i32, i64),
{
    fn accept(&mut self, session_id: i32, position: i64) {
        self(session_id, position)
    }
}

/// Read-only view of a position index. Cheap to copy and safe to use from any
/// number of threads while the writer is running.
#[derive(Debug, Clone, Copy)]
pub struct PositionReader<'a> {
    buffer: AtomicBuffer<'a>,
    framer: SectorFramer,
    codec: RecordCodec,
}

impl<'a> PositionReader<'a> {
    /// Validates the region header and checksums. A region that has never been
    /// initialised opens as an empty index.
    ///
    /// Validation reads whole sectors as words and rejects sectors written since the
    /// last checksum update, so it must not run against a region a writer is still
    /// mutating. Readers that live alongside a writer come from
    /// [`PositionWriter::reader`](super::PositionWriter::reader).
    pub fn open(buffer: AtomicBuffer<'a>) -> Result<Self, PositionIndexError> {
        let (framer, codec) = validate_region(&buffer)?;
        Ok(Self::from_parts(
            buffer,
            framer,
            codec.unwrap_or_else(RecordCodec::current),
        ))
    }

    pub(crate) fn from_parts(buffer: AtomicBuffer<'a>, framer: SectorFramer, codec: RecordCodec) -> Self {
        Self {
            buffer,
            framer,
            codec,
        }
    }

    /// Highest position recorded for `session_id`, or [`UNKNOWN_POSITION`].
    pub fn indexed_position(&self, session_id: i32) -> i64 {
        if session_id == 0 {
            return UNKNOWN_POSITION;
        }
        self.slots()
            .find(|offset| self.codec.session_id(&self.buffer, *offset) == session_id)
            .map(|offset| self.codec.position(&self.buffer, offset))
            .unwrap_or(UNKNOWN_POSITION)
    }

    /// Calls `consumer` once per occupied record, in storage order.
    pub fn for_each(&self, mut consumer: impl IndexedPositionConsumer) {
        for (session_id, position) in self.records() {
            consumer.accept(session_id, position);
        }
    }

    /// Occupied records in storage order.
    pub fn records(&self) -> impl Iterator<Item = (i32, i64)> + 'a {
        let buffer = self.buffer;
        let codec = self.codec;
        self.slots()
            .map(move |offset| codec.decode(&buffer, offset))
            .filter(|(session_id, _)| *session_id != 0)
    }

    fn slots(&self) -> Slots {
        self.framer.slots(HEADER_LENGTH, self.codec.record_length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::positions::{PositionWriter, SECTOR_SIZE};
    use crate::persistence::region::AlignedBuffer;

    #[test]
    fn uninitialised_region_reads_as_empty() {
        let region = AlignedBuffer::zeroed(SECTOR_SIZE);
        let buffer = region.buffer().unwrap();
        let reader = PositionReader::open(buffer).unwrap();
        assert_eq!(reader.indexed_position(1), UNKNOWN_POSITION);
        assert_eq!(reader.records().count(), 0);
        assert!(buffer.is_zeroed(0..SECTOR_SIZE));
    }

    #[test]
    fn reader_opened_before_writer_sees_later_records() {
        let region = AlignedBuffer::zeroed(SECTOR_SIZE);
        let buffer = region.buffer().unwrap();
        let reader = PositionReader::open(buffer).unwrap();
        let mut writer = PositionWriter::open(buffer).unwrap();
        writer.indexed_up_to(3, 30).unwrap();
        assert_eq!(reader.indexed_position(3), 30);
    }

    #[test]
    fn writer_reader_sees_unchecksummed_writes() {
        let region = AlignedBuffer::zeroed(SECTOR_SIZE);
        let buffer = region.buffer().unwrap();
        let mut writer = PositionWriter::open(buffer).unwrap();
        writer.indexed_up_to(4, 40).unwrap();

        let err = PositionReader::open(buffer).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(writer.reader().indexed_position(4), 40);
    }

    #[test]
    fn for_each_accepts_closures() {
        let region = AlignedBuffer::zeroed(2 * SECTOR_SIZE);
        let mut writer = PositionWriter::open(region.buffer().unwrap()).unwrap();
        writer.indexed_up_to(5, 50).unwrap();
        writer.indexed_up_to(6, 60).unwrap();
        writer.indexed_up_to(5, 55).unwrap();

        let mut seen = Vec::new();
        writer.reader().for_each(|session_id, position| seen.push((session_id, position)));
        assert_eq!(seen, vec![(5, 55), (6, 60)]);
    }
}
