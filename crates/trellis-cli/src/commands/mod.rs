//! CLI command implementations

pub mod completions;
pub mod config;
pub mod graph;
pub mod io;
pub mod search;
