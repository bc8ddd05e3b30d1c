use crate::config::ConfigError;
use crate::persistence::positions::PositionIndexError;
use crate::persistence::region::RegionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(SerializationError::from(err))
    }
}

#[derive(Debug, Error)]
pub enum FixGateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Positions(#[from] PositionIndexError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl From<RegionError> for FixGateError {
    fn from(err: RegionError) -> Self {
        FixGateError::Storage(StorageError::from(err))
    }
}

impl FixGateError {
    /// True when the on-disk index failed header or checksum validation.
    pub fn is_corruption(&self) -> bool {
        matches!(self, FixGateError::Positions(err) if err.is_corruption())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corruption_is_visible_through_aggregate() {
        let err = FixGateError::from(PositionIndexError::Corruption {
            sector: 0,
            stored: 1,
            computed: 2,
        });
        assert!(err.is_corruption());
        let err = FixGateError::from(PositionIndexError::OutOfSpace { session_id: 9 });
        assert!(!err.is_corruption());
    }
}
