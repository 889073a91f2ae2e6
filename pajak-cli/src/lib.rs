//! Command-line front end for `pajak-rag`.
//!
//! - `pajak ingest` rebuilds the collection from the data directory
//! - `pajak query <text>` answers a question with sources
//! - `pajak dump` inspects the collection and can save it as JSON

pub mod cli;
pub mod commands;
pub mod output;

pub use cli::{Cli, Commands};
