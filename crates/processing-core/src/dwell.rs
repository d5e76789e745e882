//! Dwell-click detection.
//!
//! Turns a stream of smoothed pixel positions into discrete events. A gaze
//! that stays within `threshold_px` of its anchor for `dwell_time_ms` emits
//! a click at the anchor, then re-anchors so a held fixation keeps clicking
//! at the dwell interval.

use gazepoint_common::config::DwellSettings;
use gazepoint_model::event::DwellEvent;
use gazepoint_model::geometry::Point2D;

/// Fixation tracking state for one subject.
#[derive(Debug, Clone)]
pub struct DwellDetector {
    settings: DwellSettings,
    anchor: Option<Point2D>,
    dwell_start: Option<f64>,
    dwelling: bool,
}

impl DwellDetector {
    pub fn new(settings: DwellSettings) -> Self {
        Self {
            settings,
            anchor: None,
            dwell_start: None,
            dwelling: false,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DwellSettings::default())
    }

    /// Feed one position (pixels) observed at `now_secs`.
    ///
    /// Missing or non-finite input is a no-op that leaves state untouched.
    /// While disabled, every call clears state and returns `None`.
    pub fn update(&mut self, position: Option<Point2D>, now_secs: f64) -> Option<DwellEvent> {
        if !self.settings.enabled {
            self.reset();
            return None;
        }
        let position = position.filter(Point2D::is_finite)?;
        if !now_secs.is_finite() {
            return None;
        }

        let (Some(anchor), Some(start)) = (self.anchor, self.dwell_start) else {
            self.anchor_at(position, now_secs);
            return Some(DwellEvent::start(position));
        };

        if position.distance_to(&anchor) >= self.settings.threshold_px {
            let was_dwelling = self.dwelling;
            self.anchor_at(position, now_secs);
            return Some(if was_dwelling {
                tracing::debug!(x = position.x, y = position.y, "Dwell cancelled");
                DwellEvent::DwellCancel
            } else {
                DwellEvent::start(position)
            });
        }

        let elapsed = (now_secs - start).max(0.0);
        let dwell_secs = self.settings.dwell_time_ms as f64 / 1000.0;

        if elapsed >= dwell_secs {
            tracing::debug!(x = anchor.x, y = anchor.y, elapsed, "Dwell click");
            self.anchor_at(position, now_secs);
            return Some(DwellEvent::click(anchor, elapsed * 1000.0));
        }

        self.dwelling = true;
        Some(DwellEvent::DwellProgress {
            progress: (elapsed / dwell_secs).min(1.0),
            elapsed_ms: elapsed * 1000.0,
        })
    }

    fn anchor_at(&mut self, position: Point2D, now_secs: f64) {
        self.anchor = Some(position);
        self.dwell_start = Some(now_secs);
        self.dwelling = false;
    }

    /// Drop any fixation in progress (tracking disabled or face lost).
    pub fn reset(&mut self) {
        self.anchor = None;
        self.dwell_start = None;
        self.dwelling = false;
    }

    /// Enable or disable detection. Disabling clears state.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
        if !enabled {
            self.reset();
        }
    }

    pub fn set_dwell_time_ms(&mut self, dwell_time_ms: u64) {
        self.settings.dwell_time_ms = dwell_time_ms;
    }

    pub fn set_threshold_px(&mut self, threshold_px: f64) {
        self.settings.threshold_px = threshold_px;
    }

    pub fn settings(&self) -> &DwellSettings {
        &self.settings
    }

    pub fn anchor(&self) -> Option<Point2D> {
        self.anchor
    }

    pub fn is_dwelling(&self) -> bool {
        self.dwelling
    }
}

impl Default for DwellDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}
