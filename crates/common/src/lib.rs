//! Slidecast Common Utilities
//!
//! Shared infrastructure for all Slidecast crates:
//! - Error types and result aliases
//! - The per-run working scope
//! - Tracing/logging initialization
//! - External tool helpers
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod process;
pub mod scope;

pub use config::*;
pub use error::*;
pub use scope::WorkingScope;
