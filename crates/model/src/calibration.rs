//! Calibration targets, aggregated records, and the persisted calibration set.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::feature::FeatureVector;
use crate::geometry::{Point2D, ScreenSize};
use crate::StoreError;

/// Schema version written into saved calibration sets.
pub const CALIBRATION_SCHEMA_VERSION: &str = "1.0";

/// A fixed on-screen point the user looks at during calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTarget {
    /// Horizontal position, percent of screen width.
    pub x_pct: f64,
    /// Vertical position, percent of screen height.
    pub y_pct: f64,
    /// 1-based visiting order.
    pub ordinal: u32,
}

impl CalibrationTarget {
    pub fn new(x_pct: f64, y_pct: f64, ordinal: u32) -> Self {
        Self {
            x_pct,
            y_pct,
            ordinal,
        }
    }

    /// Row-major `side × side` grid spanning 10%..90% on both axes.
    ///
    /// `grid(3)` is the canonical nine-point layout (10/50/90).
    pub fn grid(side: usize) -> Vec<CalibrationTarget> {
        if side == 0 {
            return vec![];
        }
        let step = if side > 1 {
            80.0 / (side - 1) as f64
        } else {
            0.0
        };
        let coord = |i: usize| if side > 1 { 10.0 + step * i as f64 } else { 50.0 };

        let mut targets = Vec::with_capacity(side * side);
        for row in 0..side {
            for col in 0..side {
                targets.push(CalibrationTarget::new(
                    coord(col),
                    coord(row),
                    (targets.len() + 1) as u32,
                ));
            }
        }
        targets
    }

    /// Layout for a configured point count. Only perfect squares of at
    /// least four points form a grid.
    pub fn layout_for_count(count: usize) -> Option<Vec<CalibrationTarget>> {
        let side = (count as f64).sqrt().round() as usize;
        if side >= 2 && side * side == count {
            Some(Self::grid(side))
        } else {
            None
        }
    }

    /// Screen-relative position as a fraction.
    pub fn normalized(&self) -> Point2D {
        Point2D::new(self.x_pct / 100.0, self.y_pct / 100.0)
    }

    /// Absolute position on the given screen.
    pub fn to_pixels(&self, screen: ScreenSize) -> Point2D {
        screen.to_pixels(self.normalized())
    }
}

/// Averaged features for one completed calibration target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Target X in screen pixels.
    pub target_x: f64,
    /// Target Y in screen pixels.
    pub target_y: f64,
    /// Element-wise mean of the valid samples.
    pub features: FeatureVector,
    /// Number of valid samples averaged (always >= 1).
    pub sample_count: usize,
}

/// A complete calibration, as saved to disk and fed to predictor training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSet {
    /// Schema version.
    pub version: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Screen the targets were shown on.
    pub screen: ScreenSize,

    /// Records in completion order.
    pub records: Vec<CalibrationRecord>,
}

impl CalibrationSet {
    pub fn new(screen: ScreenSize, records: Vec<CalibrationRecord>) -> Self {
        Self {
            version: CALIBRATION_SCHEMA_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            screen,
            records,
        }
    }

    /// Total valid samples behind all records.
    pub fn total_samples(&self) -> usize {
        self.records.iter().map(|r| r.sample_count).sum()
    }

    /// Check structural invariants of a loaded set.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(StoreError::ValidationError {
                message: "screen dimensions must be non-zero".to_string(),
            });
        }
        for (i, record) in self.records.iter().enumerate() {
            if record.sample_count == 0 {
                return Err(StoreError::ValidationError {
                    message: format!("record {i} has zero samples"),
                });
            }
            if record.features.0.iter().any(|v| !v.is_finite()) {
                return Err(StoreError::ValidationError {
                    message: format!("record {i} has non-finite features"),
                });
            }
        }
        Ok(())
    }

    /// Load a calibration set from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| StoreError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let set: CalibrationSet =
            serde_json::from_str(&json).map_err(|e| StoreError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        set.validate()?;
        Ok(set)
    }

    /// Save the calibration set as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| StoreError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| StoreError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
