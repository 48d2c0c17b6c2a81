//! Error types for the resolution engine

use retention_hub_storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Source {0} not found")]
    SourceNotFound(Uuid),

    /// The resolved policy id points at a policy that no longer exists.
    /// Cannot happen while delete guards hold; defended against anyway.
    #[error("Effective policy {0} not found")]
    PolicyNotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
