//! CLI command implementations
//!
//! - analyze: scan a source tree and report object relationships
//! - scan: list identifier mentions
//! - match: find identifiers in a single string

mod commands;
mod io_utils;

pub use commands::*;
pub use io_utils::*;
