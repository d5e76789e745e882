//! Per-frame gaze pipeline.
//!
//! Wires the stages together in frame order:
//!
//! ```text
//! landmarks -> FeatureExtractor -> Calibrating: CalibrationAggregator
//!                               -> Tracking:    validity -> Predictor -> GazeSmoother
//!                                               -> pixels -> DwellDetector
//! ```
//!
//! The current mode is passed into every call rather than stored, so a UI
//! layer and the processing loop never share mutable mode state.

use gazepoint_common::config::AppConfig;
use gazepoint_common::error::{GazeError, GazeResult};
use gazepoint_model::calibration::{CalibrationSet, CalibrationTarget};
use gazepoint_model::event::DwellEvent;
use gazepoint_model::feature::FeatureVector;
use gazepoint_model::geometry::{Point2D, ScreenSize};
use gazepoint_model::landmark::Landmark;
use serde::Serialize;

use crate::calibration::CalibrationAggregator;
use crate::dwell::DwellDetector;
use crate::features::{FeatureExtractor, FeatureValidator};
use crate::predictor::Predictor;
use crate::smoothing::GazeSmoother;

/// Consecutive frames without a face before tracking state is dropped
/// (about a third of a second at 30 Hz). Shorter gaps are skipped.
pub const FACE_LOST_FRAMES: u32 = 10;

/// What the pipeline should do with this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineMode {
    /// Extract and validate features only (face-detection preview).
    Detection,
    /// Feed the aggregator; the user is fixating `target`.
    Calibrating { target: CalibrationTarget },
    /// Predict, smooth and detect dwell clicks.
    Tracking,
}

/// Result of processing one frame.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameOutput {
    /// Extracted features, absent when no usable face was found.
    pub features: Option<FeatureVector>,
    /// Whether the features passed the validity thresholds.
    pub valid: bool,
    /// Unsmoothed predictor output (screen-relative).
    pub raw_gaze: Option<Point2D>,
    /// Smoothed gaze in display pixels.
    pub gaze: Option<Point2D>,
    /// Dwell event emitted this frame.
    pub dwell: Option<DwellEvent>,
}

impl FrameOutput {
    /// A face was found in the frame.
    pub fn has_face(&self) -> bool {
        self.features.is_some()
    }
}

/// Owns every stateful stage for one tracked subject.
pub struct GazePipeline {
    screen: ScreenSize,
    extractor: FeatureExtractor,
    validator: FeatureValidator,
    aggregator: CalibrationAggregator,
    predictor: Option<Box<dyn Predictor>>,
    smoother: GazeSmoother,
    dwell: DwellDetector,
    tracking: bool,
    missing_frames: u32,
}

impl GazePipeline {
    pub fn new(config: &AppConfig) -> GazeResult<Self> {
        config.validate()?;
        let validator = FeatureValidator::new(config.validity);
        Ok(Self {
            screen: ScreenSize::new(config.screen.width, config.screen.height),
            extractor: FeatureExtractor::with_defaults(),
            aggregator: CalibrationAggregator::new(config.calibration.clone(), validator)?,
            validator,
            predictor: None,
            smoother: GazeSmoother::new(config.smoothing),
            dwell: DwellDetector::new(config.dwell.clone()),
            tracking: false,
            missing_frames: 0,
        })
    }

    /// Replace the default feature extractor.
    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Process one landmark set observed at `now_secs`.
    ///
    /// Bad frames never fail: a missing face or invalid features produce an
    /// output with no gaze and leave tracking state untouched. After
    /// [`FACE_LOST_FRAMES`] consecutive frames without a face the smoother
    /// and dwell detector are reset, with a `DwellCancel` if a dwell was in
    /// progress. Errors are reserved for misuse, such as a calibration
    /// target the aggregator is not collecting or tracking without a
    /// trained predictor.
    pub fn process_frame(
        &mut self,
        landmarks: &[Landmark],
        mode: &PipelineMode,
        now_secs: f64,
    ) -> GazeResult<FrameOutput> {
        let tracking = matches!(mode, PipelineMode::Tracking);
        if self.tracking && !tracking {
            self.reset_tracking();
        }
        self.tracking = tracking;

        let features = self.extractor.extract(landmarks);
        let valid = features.is_some_and(|f| self.validator.is_valid(&f));
        let mut output = FrameOutput {
            features,
            valid,
            ..FrameOutput::default()
        };

        match mode {
            PipelineMode::Detection => {}
            PipelineMode::Calibrating { target } => {
                if self.aggregator.current_target() != Some(target) {
                    return Err(GazeError::invalid_state(format!(
                        "frame tagged for calibration target {} but the aggregator expects {:?}",
                        target.ordinal,
                        self.aggregator.current_target().map(|t| t.ordinal)
                    )));
                }
                // Validity is judged when the point completes
                if let Some(features) = features {
                    let pixels = target.to_pixels(self.screen);
                    self.aggregator
                        .add_sample(features, pixels.x, pixels.y, now_secs)?;
                }
            }
            PipelineMode::Tracking => {
                let predictor = self
                    .predictor
                    .as_deref()
                    .filter(|p| p.is_trained())
                    .ok_or(GazeError::Untrained)?;

                let Some(features) = features else {
                    self.missing_frames += 1;
                    if self.missing_frames == FACE_LOST_FRAMES {
                        tracing::debug!(frames = self.missing_frames, "Face lost");
                        if self.dwell.is_dwelling() {
                            output.dwell = Some(DwellEvent::DwellCancel);
                        }
                        self.reset_tracking();
                    }
                    return Ok(output);
                };
                self.missing_frames = 0;
                if !valid {
                    return Ok(output);
                }

                let Some(raw) = predictor.predict(&features).filter(Point2D::is_finite) else {
                    return Ok(output);
                };
                let smoothed = self.smoother.filter(raw, now_secs);
                let pixels = self.screen.to_pixels(smoothed);

                output.raw_gaze = Some(raw);
                output.gaze = Some(pixels);
                output.dwell = self.dwell.update(Some(pixels), now_secs);
            }
        }

        Ok(output)
    }

    /// Install a trained predictor. The previous one (if any) is returned.
    pub fn install_predictor(
        &mut self,
        predictor: Box<dyn Predictor>,
    ) -> GazeResult<Option<Box<dyn Predictor>>> {
        if !predictor.is_trained() {
            return Err(GazeError::Untrained);
        }
        tracing::info!(predictor = predictor.name(), "Predictor installed");
        self.reset_tracking();
        Ok(self.predictor.replace(predictor))
    }

    /// A trained predictor is installed.
    pub fn is_ready(&self) -> bool {
        self.predictor.as_ref().is_some_and(|p| p.is_trained())
    }

    /// Finish the aggregator and package its records for this screen.
    pub fn finish_calibration(&mut self) -> GazeResult<CalibrationSet> {
        let records = self.aggregator.finish()?;
        Ok(CalibrationSet::new(self.screen, records))
    }

    /// Clear smoother and dwell state.
    pub fn reset_tracking(&mut self) {
        self.smoother.reset();
        self.dwell.reset();
        self.missing_frames = 0;
    }

    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    pub fn aggregator(&self) -> &CalibrationAggregator {
        &self.aggregator
    }

    pub fn aggregator_mut(&mut self) -> &mut CalibrationAggregator {
        &mut self.aggregator
    }

    pub fn smoother_mut(&mut self) -> &mut GazeSmoother {
        &mut self.smoother
    }

    pub fn dwell_mut(&mut self) -> &mut DwellDetector {
        &mut self.dwell
    }
}
