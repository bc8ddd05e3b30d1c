//! Shared error types.

pub mod error;

pub use error::{FixGateError, SerializationError, StorageError};
