use super::ids::EntryId;
use crate::core::DbError;
use thiserror::Error;

/// Errors the tombstone reclamation subsystem can surface.
///
/// `Cancelled` is the only variant the sweeper loop swallows silently;
/// everything else is logged at `warn` and the affected tombstone is
/// dropped from the sweeper's view rather than retried forever.
#[derive(Error, Debug)]
pub enum GcError {
    #[error("tombstone scheduled without a version stamp for entry {0:?}")]
    MissingVersionStamp(EntryId),

    #[error("invalid gc config option `{0}`: {1}")]
    InvalidConfig(String, String),

    #[error("region map failed to remove tombstone: {0}")]
    RegionMapFailure(String),

    #[error("gc operation cancelled")]
    Cancelled,
}

impl From<GcError> for DbError {
    fn from(err: GcError) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}
