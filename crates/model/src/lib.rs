//! Gazepoint Model
//!
//! Defines the core data contracts of the gaze pipeline:
//! - **Landmarks:** Per-frame facial landmark sets and the index roles read from them
//! - **Features:** The 8-element gaze feature vector
//! - **Calibration:** Targets, aggregated records, and the persisted calibration set
//! - **Events:** Dwell/click events emitted during tracking
//! - **Sessions:** Recorded landmark streams in JSONL form
//!
//! Landmark coordinates are image-normalized (`[0.0, 1.0]` for x/y).
//! Gaze positions are screen-relative fractions until converted to pixels.

pub mod calibration;
pub mod event;
pub mod feature;
pub mod geometry;
pub mod landmark;
pub mod session;

pub use calibration::*;
pub use event::*;
pub use feature::*;
pub use geometry::*;
pub use landmark::*;
pub use session::*;

/// Errors that can occur when reading or writing persisted data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid data: {message}")]
    ValidationError { message: String },
}
