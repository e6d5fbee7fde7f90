//! Response construction error types

use thiserror::Error;

/// Result type alias for response construction
pub type ResponseResult<T> = std::result::Result<T, ResponseError>;

/// Errors raised while building a graph view
///
/// None of these escape [`ResponseAssembler`](crate::ResponseAssembler):
/// it maps them into a degraded response. Exhausting the budget is not an
/// error at all; it is reported through `meta.truncated`.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("Content could not be serialized for estimation: {0}")]
    Estimation(String),

    #[error("Unknown mode '{0}'; expected one of: smart, entities, relationships, raw")]
    UnknownMode(String),

    #[error("Invalid response config: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
