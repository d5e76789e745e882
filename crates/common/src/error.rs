//! Error types shared across Gazepoint crates.

use std::path::PathBuf;

/// Top-level error type for Gazepoint operations.
#[derive(Debug, thiserror::Error)]
pub enum GazeError {
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Calibration point {point} has no valid samples ({collected} collected)")]
    NoValidSamples { point: usize, collected: usize },

    #[error("Insufficient calibration data: {completed} of {required} points completed")]
    InsufficientCalibrationData { completed: usize, required: usize },

    #[error("Predictor training failed: {message}")]
    Training { message: String },

    #[error("Predictor has not been trained")]
    Untrained,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using GazeError.
pub type GazeResult<T> = Result<T, GazeError>;

impl GazeError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the caller can recover by retrying the current step
    /// (re-collecting a calibration point) instead of aborting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoValidSamples { .. })
    }
}
