//! Trellis Response - budget-aware graph views
//!
//! Builds bounded-size, prioritized views over a knowledge graph snapshot
//! for consumers with a hard context-window ceiling:
//!
//! - [`SizeEstimator`] approximates the token cost of serialized content
//! - [`Budget`] tracks a shrinking token allowance as an immutable value
//! - [`SectionTruncator`] shrinks one piece of content to fit a budget
//! - [`GraphViewBuilder`] derives the named sections of the smart view
//! - [`ResponseAssembler`] packs sections into one of four response modes

pub mod assembler;
pub mod budget;
pub mod config;
pub mod error;
pub mod estimator;
pub mod truncate;
pub mod views;

pub use assembler::{
    GraphRequest, ResponseAssembler, ResponseMeta, ResponseMode, ResponseOptions,
    StreamingResponse,
};
pub use budget::Budget;
pub use config::{ResponseConfig, SectionReservations};
pub use error::{ResponseError, ResponseResult};
pub use estimator::SizeEstimator;
pub use truncate::{SectionTruncator, Truncated};
pub use views::{ContentSection, GraphViewBuilder, SectionKind};
