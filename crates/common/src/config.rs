//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GazeError, GazeResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Calibration collection settings.
    pub calibration: CalibrationSettings,

    /// Dwell-click settings.
    pub dwell: DwellSettings,

    /// Adaptive smoothing filter parameters.
    pub smoothing: SmoothingSettings,

    /// Feature validity thresholds (post-gain units).
    pub validity: ValiditySettings,

    /// Target display geometry.
    pub screen: ScreenSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Calibration collection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// Number of calibration targets (a perfect square; 9 = 3x3 grid).
    pub point_count: usize,

    /// Samples to collect per target before completing it.
    pub samples_per_point: usize,

    /// Minimum completed points required by `finish()` and predictor training.
    pub min_points: usize,
}

/// Dwell detector parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellSettings {
    /// Fixation time required to emit a click (milliseconds).
    pub dwell_time_ms: u64,

    /// Maximum movement (pixels) still counted as the same fixation.
    pub threshold_px: f64,

    /// Whether dwell detection is active.
    pub enabled: bool,
}

/// One-euro filter parameters shared by both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingSettings {
    /// Cutoff frequency (Hz) applied when the signal is still.
    pub min_cutoff: f64,

    /// Speed coefficient: how fast the cutoff rises with signal speed.
    pub beta: f64,

    /// Fixed cutoff (Hz) for the derivative low-pass.
    pub d_cutoff: f64,
}

/// Thresholds deciding whether a feature vector is reliable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValiditySettings {
    /// Minimum aperture ratio for either eye (closed eye / blink below).
    pub min_aperture: f64,

    /// Maximum absolute iris offset on any axis.
    pub max_offset: f64,

    /// Maximum left/right divergence for either symmetry feature.
    pub max_symmetry: f64,
}

/// Display dimensions in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSettings {
    pub width: u32,
    pub height: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "gazepoint=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            point_count: 9,
            samples_per_point: 60,
            min_points: 9,
        }
    }
}

impl Default for DwellSettings {
    fn default() -> Self {
        Self {
            dwell_time_ms: 600,
            threshold_px: 50.0,
            enabled: true,
        }
    }
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            min_cutoff: 1.0,
            beta: 0.007,
            d_cutoff: 1.0,
        }
    }
}

impl Default for ValiditySettings {
    fn default() -> Self {
        Self {
            min_aperture: 0.5,
            max_offset: 5.0,
            max_symmetry: 3.0,
        }
    }
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path, reporting any failure.
    pub fn load_from(path: impl AsRef<Path>) -> GazeResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GazeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Reject values the processing components cannot run with.
    pub fn validate(&self) -> GazeResult<()> {
        let cal = &self.calibration;
        if cal.point_count == 0 || cal.samples_per_point == 0 {
            return Err(GazeError::config(
                "calibration.point_count and calibration.samples_per_point must be positive",
            ));
        }
        if cal.min_points > cal.point_count {
            return Err(GazeError::config(format!(
                "calibration.min_points ({}) exceeds calibration.point_count ({})",
                cal.min_points, cal.point_count
            )));
        }
        let s = &self.smoothing;
        if s.min_cutoff <= 0.0 || s.d_cutoff <= 0.0 || s.beta < 0.0 {
            return Err(GazeError::config(
                "smoothing.min_cutoff and smoothing.d_cutoff must be positive, smoothing.beta non-negative",
            ));
        }
        if self.dwell.threshold_px <= 0.0 {
            return Err(GazeError::config("dwell.threshold_px must be positive"));
        }
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(GazeError::config("screen dimensions must be non-zero"));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("gazepoint").join("config.json")
}
