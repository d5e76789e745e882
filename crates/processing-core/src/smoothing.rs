//! Adaptive gaze smoothing (one-euro filter).
//!
//! A first-order low-pass whose cutoff rises with the signal's speed:
//! a still gaze is smoothed heavily to kill jitter, a saccade passes
//! through quickly to keep latency low.
//!
//! ```text
//! alpha(fc)  = 1 / (1 + tau / te)    tau = 1 / (2 pi fc), te = 1 / rate
//! dx         = lowpass((x - x_prev) / dt, alpha(d_cutoff))
//! fc         = min_cutoff + beta * |dx|
//! x_hat      = lowpass(x, alpha(fc))
//! ```

use std::f64::consts::PI;

use gazepoint_common::config::SmoothingSettings;
use gazepoint_model::geometry::Point2D;

/// Sampling rate assumed until two samples have been seen (camera rate).
const INITIAL_RATE_HZ: f64 = 30.0;

/// Smoothing factor for a cutoff frequency at a sampling rate.
fn alpha(cutoff_hz: f64, rate_hz: f64) -> f64 {
    let tau = 1.0 / (2.0 * PI * cutoff_hz);
    let te = 1.0 / rate_hz;
    1.0 / (1.0 + tau / te)
}

fn lowpass(value: f64, previous: f64, alpha: f64) -> f64 {
    alpha * value + (1.0 - alpha) * previous
}

/// Scalar one-euro filter. One instance per axis.
#[derive(Debug, Clone)]
pub struct OneEuroFilter {
    params: SmoothingSettings,
    rate_hz: f64,
    last_value: Option<f64>,
    last_derivative: f64,
    last_timestamp: Option<f64>,
}

impl OneEuroFilter {
    pub fn new(params: SmoothingSettings) -> Self {
        Self {
            params,
            rate_hz: INITIAL_RATE_HZ,
            last_value: None,
            last_derivative: 0.0,
            last_timestamp: None,
        }
    }

    /// Filter one sample taken at `timestamp_secs`.
    ///
    /// The first sample passes through unchanged. A non-positive time step
    /// (duplicate or rolled-back timestamp) keeps the previous rate and
    /// derivative instead of dividing by it. Non-finite input is ignored.
    pub fn filter(&mut self, value: f64, timestamp_secs: f64) -> f64 {
        if !value.is_finite() {
            return self.last_value.unwrap_or(value);
        }

        let (Some(previous), Some(last_t)) = (self.last_value, self.last_timestamp) else {
            self.last_value = Some(value);
            self.last_timestamp = Some(timestamp_secs);
            return value;
        };

        let dt = timestamp_secs - last_t;
        let derivative = if dt > 0.0 && dt.is_finite() {
            self.rate_hz = 1.0 / dt;
            let raw = (value - previous) / dt;
            lowpass(
                raw,
                self.last_derivative,
                alpha(self.params.d_cutoff, self.rate_hz),
            )
        } else {
            self.last_derivative
        };

        let cutoff = self.params.min_cutoff + self.params.beta * derivative.abs();
        let smoothed = lowpass(value, previous, alpha(cutoff, self.rate_hz));

        self.last_value = Some(smoothed);
        self.last_derivative = derivative;
        if timestamp_secs.is_finite() {
            self.last_timestamp = Some(timestamp_secs);
        }
        smoothed
    }

    /// Forget all history; the next sample is treated as the first.
    pub fn reset(&mut self) {
        self.rate_hz = INITIAL_RATE_HZ;
        self.last_value = None;
        self.last_derivative = 0.0;
        self.last_timestamp = None;
    }

    pub fn set_params(&mut self, params: SmoothingSettings) {
        self.params = params;
    }

    pub fn params(&self) -> &SmoothingSettings {
        &self.params
    }

    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    /// Smoothed derivative (units per second).
    pub fn derivative(&self) -> f64 {
        self.last_derivative
    }

    /// Current sampling-rate estimate (Hz).
    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }
}

/// Two-axis gaze smoother sharing one parameter set.
#[derive(Debug, Clone)]
pub struct GazeSmoother {
    x: OneEuroFilter,
    y: OneEuroFilter,
}

impl GazeSmoother {
    pub fn new(params: SmoothingSettings) -> Self {
        Self {
            x: OneEuroFilter::new(params),
            y: OneEuroFilter::new(params),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SmoothingSettings::default())
    }

    /// Smooth one gaze sample.
    pub fn filter(&mut self, point: Point2D, timestamp_secs: f64) -> Point2D {
        Point2D::new(
            self.x.filter(point.x, timestamp_secs),
            self.y.filter(point.y, timestamp_secs),
        )
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }

    pub fn set_params(&mut self, params: SmoothingSettings) {
        self.x.set_params(params);
        self.y.set_params(params);
    }

    pub fn x_axis(&self) -> &OneEuroFilter {
        &self.x
    }

    pub fn y_axis(&self) -> &OneEuroFilter {
        &self.y
    }
}

impl Default for GazeSmoother {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f64 = 1.0 / 30.0;

    #[test]
    fn test_alpha_matches_formula() {
        // fc = 1 Hz at 30 Hz: tau = 1/(2 pi), te = 1/30
        let expected = 1.0 / (1.0 + (1.0 / (2.0 * PI)) * 30.0);
        assert!((alpha(1.0, 30.0) - expected).abs() < 1e-12);
        assert!(alpha(100.0, 30.0) > alpha(1.0, 30.0));
    }

    #[test]
    fn test_first_sample_passes_through() {
        let mut filter = OneEuroFilter::new(SmoothingSettings::default());
        assert_eq!(filter.filter(0.73, 10.0), 0.73);
        assert_eq!(filter.derivative(), 0.0);
    }

    #[test]
    fn test_constant_input_converges() {
        let mut filter = OneEuroFilter::new(SmoothingSettings::default());
        filter.filter(0.0, 0.0);
        let mut out = 0.0;
        for i in 1..=300 {
            out = filter.filter(0.5, i as f64 * DT);
        }
        assert!((out - 0.5).abs() < 1e-3, "output {out} should approach 0.5");
        assert!(filter.derivative().abs() < 1e-3);
        assert!((filter.rate_hz() - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_ramp_lags_but_follows() {
        let mut filter = OneEuroFilter::new(SmoothingSettings::default());
        let mut out = 0.0;
        let mut gap_early = 0.0;
        for i in 0..=90 {
            let t = i as f64 * DT;
            let value = 0.2 * t;
            out = filter.filter(value, t);
            if i > 0 {
                assert!(out < value, "smoothed value should lag the ramp");
            }
            if i == 10 {
                gap_early = value - out;
            }
        }
        let final_value = 0.2 * 90.0 * DT;
        let gap_late = final_value - out;
        assert!(out > 0.5 * final_value);
        // The lag settles instead of growing with the ramp
        assert!(gap_late < gap_early * 2.0);
    }

    #[test]
    fn test_fast_motion_is_smoothed_less() {
        let settings = SmoothingSettings {
            min_cutoff: 0.5,
            beta: 5.0,
            d_cutoff: 1.0,
        };
        let mut adaptive = OneEuroFilter::new(settings);
        let mut fixed = OneEuroFilter::new(SmoothingSettings {
            beta: 0.0,
            ..settings
        });

        for i in 0..10 {
            let t = i as f64 * DT;
            let v = if i < 5 { 0.0 } else { 1.0 };
            adaptive.filter(v, t);
            fixed.filter(v, t);
        }
        let a = adaptive.last_value().unwrap();
        let f = fixed.last_value().unwrap();
        assert!(a > f, "adaptive {a} should track the step faster than fixed {f}");
    }

    #[test]
    fn test_non_positive_dt_does_not_divide_by_zero() {
        let mut filter = OneEuroFilter::new(SmoothingSettings::default());
        filter.filter(0.0, 1.0);
        filter.filter(0.1, 1.0 + DT);
        let derivative = filter.derivative();

        let same_time = filter.filter(0.2, 1.0 + DT);
        assert!(same_time.is_finite());
        assert_eq!(filter.derivative(), derivative);

        let rolled_back = filter.filter(0.3, 0.5);
        assert!(rolled_back.is_finite());
        assert_eq!(filter.derivative(), derivative);
    }

    #[test]
    fn test_reset_forgets_state() {
        let mut smoother = GazeSmoother::with_defaults();
        smoother.filter(Point2D::new(0.1, 0.1), 0.0);
        smoother.filter(Point2D::new(0.2, 0.3), DT);

        smoother.reset();
        let out = smoother.filter(Point2D::new(0.9, 0.8), 5.0);
        assert_eq!(out, Point2D::new(0.9, 0.8));
        assert_eq!(smoother.x_axis().derivative(), 0.0);
    }

    #[test]
    fn test_axes_are_independent() {
        let mut smoother = GazeSmoother::with_defaults();
        smoother.filter(Point2D::new(0.5, 0.5), 0.0);
        let out = smoother.filter(Point2D::new(0.9, 0.5), DT);
        assert!(out.x > 0.5 && out.x < 0.9);
        assert!((out.y - 0.5).abs() < 1e-12);
        assert!(smoother.y_axis().derivative().abs() < 1e-12);
    }

    #[test]
    fn test_nan_input_is_ignored() {
        let mut filter = OneEuroFilter::new(SmoothingSettings::default());
        filter.filter(0.4, 0.0);
        assert_eq!(filter.filter(f64::NAN, DT), 0.4);
        assert_eq!(filter.last_value(), Some(0.4));
    }

    proptest! {
        #[test]
        fn prop_output_stays_within_input_range(
            values in proptest::collection::vec(0.0f64..1.0, 1..200),
            steps in proptest::collection::vec(0.001f64..0.2, 200),
        ) {
            let mut filter = OneEuroFilter::new(SmoothingSettings::default());
            let mut t = 0.0;
            let mut lo = f64::MAX;
            let mut hi = f64::MIN;
            for (v, dt) in values.iter().zip(steps.iter()) {
                t += dt;
                lo = lo.min(*v);
                hi = hi.max(*v);
                let out = filter.filter(*v, t);
                prop_assert!(out >= lo - 1e-12 && out <= hi + 1e-12);
            }
        }
    }
}
