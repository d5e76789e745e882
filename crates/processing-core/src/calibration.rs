//! Calibration sample aggregation.
//!
//! Collects feature vectors while the user fixates each calibration target,
//! then averages the valid ones into one [`CalibrationRecord`] per target.
//! Averaging many frames per fixation cancels landmark jitter before it
//! reaches the predictor.
//!
//! ```text
//! Idle -> Collecting(0) -> PointComplete(0) -> Collecting(1) -> ... -> Finished
//! ```

use gazepoint_common::config::CalibrationSettings;
use gazepoint_common::error::{GazeError, GazeResult};
use gazepoint_model::calibration::{CalibrationRecord, CalibrationTarget};
use gazepoint_model::feature::FeatureVector;

use crate::features::FeatureValidator;

/// Aggregator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    /// Not started, or reset.
    Idle,
    /// Accepting samples for the point at this index.
    Collecting { point: usize },
    /// The point at this index produced a record; waiting for the next one.
    PointComplete { point: usize },
    /// Records handed out by `finish()`.
    Finished,
}

/// One raw sample. Validity is judged at aggregation time, not here, so
/// raw counts stay inspectable.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationSample {
    pub features: FeatureVector,
    /// Target position in screen pixels.
    pub target_x: f64,
    pub target_y: f64,
    pub timestamp_secs: f64,
}

/// Drives calibration collection for a fixed target layout.
#[derive(Debug, Clone)]
pub struct CalibrationAggregator {
    settings: CalibrationSettings,
    validator: FeatureValidator,
    targets: Vec<CalibrationTarget>,
    state: CalibrationState,
    buffer: Vec<CalibrationSample>,
    records: Vec<CalibrationRecord>,
}

impl CalibrationAggregator {
    /// Create an aggregator. The point count must form a square grid.
    pub fn new(settings: CalibrationSettings, validator: FeatureValidator) -> GazeResult<Self> {
        let targets = CalibrationTarget::layout_for_count(settings.point_count).ok_or_else(|| {
            GazeError::config(format!(
                "calibration.point_count must be a square of at least 4, got {}",
                settings.point_count
            ))
        })?;
        if settings.min_points > settings.point_count {
            return Err(GazeError::config(format!(
                "calibration.min_points ({}) exceeds calibration.point_count ({})",
                settings.min_points, settings.point_count
            )));
        }

        Ok(Self {
            buffer: Vec::with_capacity(settings.samples_per_point),
            settings,
            validator,
            targets,
            state: CalibrationState::Idle,
            records: Vec::new(),
        })
    }

    /// Nine-point layout with default thresholds.
    pub fn with_defaults() -> Self {
        Self {
            settings: CalibrationSettings::default(),
            validator: FeatureValidator::default(),
            targets: CalibrationTarget::grid(3),
            state: CalibrationState::Idle,
            buffer: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Clear all records and begin collecting the first point.
    pub fn start(&mut self) {
        self.records.clear();
        self.buffer.clear();
        self.state = CalibrationState::Collecting { point: 0 };
        tracing::info!(points = self.targets.len(), "Calibration started");
    }

    /// Return to `Idle`, discarding everything.
    pub fn reset(&mut self) {
        self.records.clear();
        self.buffer.clear();
        self.state = CalibrationState::Idle;
    }

    /// Buffer one sample for the current point.
    pub fn add_sample(
        &mut self,
        features: FeatureVector,
        target_x: f64,
        target_y: f64,
        timestamp_secs: f64,
    ) -> GazeResult<()> {
        if !matches!(self.state, CalibrationState::Collecting { .. }) {
            return Err(GazeError::invalid_state(format!(
                "cannot add calibration samples while {:?}",
                self.state
            )));
        }
        self.buffer.push(CalibrationSample {
            features,
            target_x,
            target_y,
            timestamp_secs,
        });
        Ok(())
    }

    /// Average the valid buffered samples into a record and advance.
    ///
    /// With no valid samples the point fails with
    /// [`GazeError::NoValidSamples`]; the buffer is cleared and the session
    /// stays on the same point so the caller can collect it again.
    pub fn complete_current_point(&mut self) -> GazeResult<CalibrationRecord> {
        let CalibrationState::Collecting { point } = self.state else {
            return Err(GazeError::invalid_state(format!(
                "no calibration point is being collected ({:?})",
                self.state
            )));
        };

        let collected = self.buffer.len();
        let valid: Vec<&CalibrationSample> = self
            .buffer
            .iter()
            .filter(|s| self.validator.is_valid(&s.features))
            .collect();

        let (Some(first), Some(features)) = (
            valid.first().copied(),
            FeatureVector::mean(valid.iter().map(|s| &s.features)),
        ) else {
            tracing::warn!(point, collected, "Calibration point has no valid samples");
            self.buffer.clear();
            return Err(GazeError::NoValidSamples { point, collected });
        };

        let record = CalibrationRecord {
            target_x: first.target_x,
            target_y: first.target_y,
            features,
            sample_count: valid.len(),
        };

        tracing::info!(
            point,
            valid = record.sample_count,
            collected,
            "Calibration point complete"
        );

        self.records.push(record.clone());
        self.buffer.clear();
        self.state = CalibrationState::PointComplete { point };
        Ok(record)
    }

    /// Move from `PointComplete(i)` to `Collecting(i + 1)`.
    pub fn begin_next_point(&mut self) -> GazeResult<usize> {
        let CalibrationState::PointComplete { point } = self.state else {
            return Err(GazeError::invalid_state(format!(
                "current point is not complete ({:?})",
                self.state
            )));
        };
        let next = point + 1;
        if next >= self.targets.len() {
            return Err(GazeError::invalid_state(format!(
                "all {} calibration points are complete",
                self.targets.len()
            )));
        }
        self.state = CalibrationState::Collecting { point: next };
        Ok(next)
    }

    /// Hand out the records in completion order.
    ///
    /// Fails with [`GazeError::InsufficientCalibrationData`] (carrying the
    /// completed and required counts) when fewer than `min_points` points
    /// were completed; `completed == 0` means the calibration is empty.
    pub fn finish(&mut self) -> GazeResult<Vec<CalibrationRecord>> {
        let completed = self.records.len();
        let required = self.settings.min_points;
        if completed < required {
            return Err(GazeError::InsufficientCalibrationData {
                completed,
                required,
            });
        }
        self.buffer.clear();
        self.state = CalibrationState::Finished;
        tracing::info!(records = completed, "Calibration finished");
        Ok(self.records.clone())
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Index of the point being (or next to be) collected.
    pub fn point_index(&self) -> usize {
        self.records.len()
    }

    /// Target for the current point, if one is being collected.
    pub fn current_target(&self) -> Option<&CalibrationTarget> {
        match self.state {
            CalibrationState::Collecting { point } => self.targets.get(point),
            _ => None,
        }
    }

    pub fn targets(&self) -> &[CalibrationTarget] {
        &self.targets
    }

    /// Raw samples buffered for the current point.
    pub fn sample_count(&self) -> usize {
        self.buffer.len()
    }

    /// The buffer holds the configured number of samples per point.
    pub fn is_point_ready(&self) -> bool {
        self.buffer.len() >= self.settings.samples_per_point
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.state, CalibrationState::Collecting { .. })
    }

    pub fn completed_points(&self) -> usize {
        self.records.len()
    }

    /// Fraction of points completed.
    pub fn progress(&self) -> f64 {
        self.records.len() as f64 / self.targets.len().max(1) as f64
    }

    pub fn records(&self) -> &[CalibrationRecord] {
        &self.records
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }
}
