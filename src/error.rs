use thiserror::Error;

use crate::ingest::ItemError;

/// Failures surfaced by the command and ingestion paths.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no device registered with hardware id {0:?}")]
    DeviceNotFound(String),

    /// The device row exists but its 1:1 settings row does not.
    #[error("device {serial_number} has no settings record")]
    MissingSettings { serial_number: String },

    #[error("{0}")]
    Validation(String),

    /// The request body is not a snapshot or a list of snapshots at all.
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("no readings stored: {} item(s) rejected", .errors.len())]
    NothingStored { errors: Vec<ItemError> },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}
