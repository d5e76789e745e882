//! Gazepoint Processing Core
//!
//! Turns per-frame facial landmarks into a stable on-screen pointer:
//! - **Features:** Geometric eye features normalized by eye or face width
//! - **Calibration:** Per-target averaging of valid feature samples
//! - **Prediction:** Pluggable feature-to-screen regression, trained off the frame loop
//! - **Smoothing:** Adaptive 1€ filter per axis
//! - **Dwell:** Fixation timing that emits click events
//!
//! Everything except [`predictor::TrainingJob`] is synchronous and does no I/O.

pub mod calibration;
pub mod dwell;
pub mod features;
pub mod pipeline;
pub mod predictor;
pub mod smoothing;
pub mod synthetic;

pub use calibration::{CalibrationAggregator, CalibrationState};
pub use dwell::DwellDetector;
pub use features::{FeatureExtractor, FeatureValidator, Normalization};
pub use pipeline::{FrameOutput, GazePipeline, PipelineMode};
pub use predictor::{Predictor, RidgePredictor, TrainingJob};
pub use smoothing::{GazeSmoother, OneEuroFilter};
pub use synthetic::SyntheticFace;
