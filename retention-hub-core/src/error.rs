//! Error types for the core crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("policy_id is required for override_policy rules")]
    PolicyIdRequired,

    #[error("legal_hold is required for override_hold rules")]
    LegalHoldRequired,
}
