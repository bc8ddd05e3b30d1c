use super::framer::SECTOR_DATA_LENGTH;
use super::PositionIndexError;
use crate::persistence::region::AtomicBuffer;

/// Format version written into new regions.
pub const FORMAT_VERSION: u32 = 1;
/// Header span at the start of the region: version then block length.
pub const HEADER_LENGTH: usize = 8;
/// Record length understood by [`FORMAT_VERSION`].
pub const RECORD_BLOCK_LENGTH: usize = 16;

const VERSION_OFFSET: usize = 0;
const BLOCK_LENGTH_OFFSET: usize = 4;
const SESSION_ID_OFFSET: usize = 0;
const POSITION_OFFSET: usize = 8;

/// Encodes and decodes `(session_id, position)` records using the layout declared by
/// the region header. Records written by a newer minor layout with a longer block are
/// still readable: the trailing bytes are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCodec {
    acting_version: u32,
    record_length: usize,
}

impl RecordCodec {
    pub fn current() -> Self {
        Self {
            acting_version: FORMAT_VERSION,
            record_length: RECORD_BLOCK_LENGTH,
        }
    }

    /// Reads the region header. `Ok(None)` means the header was never written.
    pub fn read_header(buffer: &AtomicBuffer<'_>) -> Result<Option<Self>, PositionIndexError> {
        let version = buffer.get_u32(VERSION_OFFSET);
        let block_length = buffer.get_u32(BLOCK_LENGTH_OFFSET);
        if version == 0 && block_length == 0 {
            return Ok(None);
        }
        let record_length = block_length as usize;
        let compatible = version != 0
            && version <= FORMAT_VERSION
            && record_length >= RECORD_BLOCK_LENGTH
            && record_length % 8 == 0
            && record_length <= SECTOR_DATA_LENGTH - HEADER_LENGTH;
        if !compatible {
            return Err(PositionIndexError::IncompatibleHeader {
                version,
                block_length,
            });
        }
        Ok(Some(Self {
            acting_version: version,
            record_length,
        }))
    }

    pub fn write_header(&self, buffer: &AtomicBuffer<'_>) {
        buffer.put_u32(BLOCK_LENGTH_OFFSET, self.record_length as u32);
        buffer.put_u32(VERSION_OFFSET, self.acting_version);
    }

    pub fn acting_version(&self) -> u32 {
        self.acting_version
    }

    pub fn record_length(&self) -> usize {
        self.record_length
    }

    /// Writes a full record. The position lands before the session id so a
    /// concurrent reader never pairs the id with an unwritten position.
    pub fn encode(&self, buffer: &AtomicBuffer<'_>, offset: usize, session_id: i32, position: i64) {
        buffer.put_i64_ordered(offset + POSITION_OFFSET, position);
        buffer.put_i32_ordered(offset + SESSION_ID_OFFSET, session_id);
    }

    pub fn decode(&self, buffer: &AtomicBuffer<'_>, offset: usize) -> (i32, i64) {
        let session_id = self.session_id(buffer, offset);
        (session_id, self.position(buffer, offset))
    }

    pub fn session_id(&self, buffer: &AtomicBuffer<'_>, offset: usize) -> i32 {
        buffer.get_i32_volatile(offset + SESSION_ID_OFFSET)
    }

    pub fn position(&self, buffer: &AtomicBuffer<'_>, offset: usize) -> i64 {
        buffer.get_i64_volatile(offset + POSITION_OFFSET)
    }

    pub fn put_position(&self, buffer: &AtomicBuffer<'_>, offset: usize, position: i64) {
        buffer.put_i64_ordered(offset + POSITION_OFFSET, position);
    }
}
