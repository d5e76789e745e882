//! Dwell events emitted by the tracking pipeline.
//!
//! Positions are in display pixels. Events serialize as tagged JSON objects
//! so a replay can be written out as JSONL.

use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;

/// Discrete output of the dwell detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DwellEvent {
    /// A new fixation anchor was set.
    DwellStart {
        /// Anchor position.
        x: f64,
        y: f64,
    },

    /// The fixation is holding.
    DwellProgress {
        /// Fraction of the dwell time elapsed, in `[0.0, 1.0)`.
        progress: f64,
        /// Milliseconds since the anchor was set.
        elapsed_ms: f64,
    },

    /// The fixation reached the dwell time.
    Click {
        /// Anchor position of the completed fixation.
        x: f64,
        y: f64,
        /// How long the fixation lasted (milliseconds).
        dwell_ms: f64,
    },

    /// Gaze left an in-progress fixation.
    DwellCancel,
}

impl DwellEvent {
    pub fn start(anchor: Point2D) -> Self {
        Self::DwellStart {
            x: anchor.x,
            y: anchor.y,
        }
    }

    pub fn click(anchor: Point2D, dwell_ms: f64) -> Self {
        Self::Click {
            x: anchor.x,
            y: anchor.y,
            dwell_ms,
        }
    }

    /// Position carried by the event, if any.
    pub fn position(&self) -> Option<Point2D> {
        match self {
            Self::DwellStart { x, y } | Self::Click { x, y, .. } => Some(Point2D::new(*x, *y)),
            _ => None,
        }
    }

    pub fn is_click(&self) -> bool {
        matches!(self, Self::Click { .. })
    }
}
