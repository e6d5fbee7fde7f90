//! Error types for Trellis Core

use thiserror::Error;

use crate::limits::ValidationError;

/// Result type alias using Trellis's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Graph integrity errors raised on the write path
#[derive(Error, Debug)]
pub enum Error {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}
