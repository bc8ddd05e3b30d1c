//! Core library for the fixgate FIX gateway.
//! Exposes the durable, crash-detecting index of per-session stream positions that
//! the replication and recovery layers build on.

pub mod config;
pub mod persistence;
pub mod util;

pub use config::{ConfigError, PositionIndexConfig};
pub use persistence::{
    AlignedBuffer, AtomicBuffer, IndexProgress, IndexedPositionConsumer, MappedRegionFile,
    PositionIndexError, PositionReader, PositionTable, PositionWriter, RegionError, SectorFramer,
    SECTOR_SIZE, UNKNOWN_POSITION,
};
pub use util::{FixGateError, SerializationError, StorageError};
