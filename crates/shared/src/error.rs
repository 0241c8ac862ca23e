//! Error types shared by RetireZest crates

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetireError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
