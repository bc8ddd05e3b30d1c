//! Durable index of the highest stream position processed per remote session.
//!
//! The index lives in a fixed-capacity [`AtomicBuffer`] laid out as a header
//! followed by sectors of fixed-length records, each sector closed by a CRC-32
//! checksum. One [`PositionWriter`] mutates it; any number of
//! [`PositionReader`]s query it concurrently without locks.
//!
//! Lookups and installs are linear scans over the claimed slots. That is fine for
//! one record per connected counterparty but does not scale to large session counts.

pub mod codec;
pub mod framer;
pub mod progress;
pub mod reader;
pub mod recovery;
pub mod writer;

pub use codec::{RecordCodec, FORMAT_VERSION, HEADER_LENGTH, RECORD_BLOCK_LENGTH};
pub use framer::{SectorFramer, Slots, CHECKSUM_SIZE, SECTOR_DATA_LENGTH, SECTOR_SIZE};
pub use progress::IndexProgress;
pub use reader::{IndexedPositionConsumer, PositionReader};
pub use recovery::PositionTable;
pub use writer::PositionWriter;

use crate::persistence::region::{AtomicBuffer, RegionError};
use log::error;
use thiserror::Error;

/// Returned by lookups for sessions that have no record.
pub const UNKNOWN_POSITION: i64 = -1;

#[derive(Debug, Error)]
pub enum PositionIndexError {
    #[error(
        "position index corrupted: sector {sector} stored checksum {stored:#010x}, computed {computed:#010x}"
    )]
    Corruption {
        sector: usize,
        stored: u32,
        computed: u32,
    },
    #[error("position index sector {sector} is empty but later sector {written} holds records")]
    MissingSector { sector: usize, written: usize },
    #[error("incompatible position index header: version {version}, block length {block_length}")]
    IncompatibleHeader { version: u32, block_length: u32 },
    #[error("position index has no free slot for session {session_id}")]
    OutOfSpace { session_id: i32 },
    #[error("session id 0 is reserved for empty slots")]
    InvalidSession,
    #[error(transparent)]
    Region(#[from] RegionError),
}

impl PositionIndexError {
    /// True for failures that make the region unusable, as opposed to capacity exhaustion
    /// or caller errors.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            PositionIndexError::Corruption { .. }
                | PositionIndexError::MissingSector { .. }
                | PositionIndexError::IncompatibleHeader { .. }
        )
    }
}

/// Validates the header and every sector checksum of an existing region.
/// `codec` is `None` when the region has never been initialised.
pub(crate) fn validate_region(
    buffer: &AtomicBuffer<'_>,
) -> Result<(SectorFramer, Option<RecordCodec>), PositionIndexError> {
    let framer = SectorFramer::new(buffer.capacity())?;
    let codec = match RecordCodec::read_header(buffer) {
        Ok(Some(codec)) => codec,
        Ok(None) if buffer.is_zeroed(0..buffer.capacity()) => return Ok((framer, None)),
        Ok(None) => {
            return Err(report_corruption(PositionIndexError::IncompatibleHeader {
                version: 0,
                block_length: 0,
            }))
        }
        Err(err) => return Err(report_corruption(err)),
    };
    framer
        .validate_checksums(buffer)
        .map_err(report_corruption)?;
    Ok((framer, Some(codec)))
}

fn report_corruption(err: PositionIndexError) -> PositionIndexError {
    error!("event=position_index_corrupt error={}", err);
    err
}
