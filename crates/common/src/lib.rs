//! Gazepoint Common Utilities
//!
//! Shared infrastructure for all Gazepoint crates:
//! - Error types and result aliases
//! - Frame clock and per-frame budget tracking
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
