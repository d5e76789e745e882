//! Clock and timing utilities for the per-frame loop.
//!
//! Landmark frames are stamped against a monotonic epoch recorded when a
//! session starts. This module provides utilities for:
//! - Capturing the epoch
//! - Converting between nanosecond stamps and seconds
//! - Tracking per-frame processing time against a frame budget

use std::time::{Duration, Instant};

/// A session clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment the session started).
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// The instant the session started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl FrameClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get nanoseconds elapsed since session start.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Get seconds elapsed since session start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at session start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Convert an elapsed nanosecond value to seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }

    /// Convert seconds to nanoseconds.
    pub fn secs_to_ns(secs: f64) -> u64 {
        (secs * 1_000_000_000.0) as u64
    }
}

/// Per-frame processing time accounting.
///
/// The core must finish well inside one camera frame (~33 ms at 30 Hz);
/// frames that exceed the budget are counted so callers can report them.
#[derive(Debug, Clone)]
pub struct FrameBudget {
    budget: Duration,
    frames: u64,
    over_budget: u64,
    total: Duration,
    worst: Duration,
}

impl FrameBudget {
    /// Create a budget tracker with the given per-frame allowance.
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            frames: 0,
            over_budget: 0,
            total: Duration::ZERO,
            worst: Duration::ZERO,
        }
    }

    /// Budget derived from a camera rate in Hz.
    pub fn for_rate_hz(rate_hz: u32) -> Self {
        Self::new(Duration::from_nanos(1_000_000_000 / rate_hz.max(1) as u64))
    }

    /// Record one frame's processing time. Returns true if it exceeded the budget.
    pub fn record(&mut self, elapsed: Duration) -> bool {
        self.frames += 1;
        self.total += elapsed;
        self.worst = self.worst.max(elapsed);
        let over = elapsed > self.budget;
        if over {
            self.over_budget += 1;
            tracing::warn!(
                elapsed_us = elapsed.as_micros() as u64,
                budget_us = self.budget.as_micros() as u64,
                "Frame processing exceeded budget"
            );
        }
        over
    }

    /// Time a closure and record it.
    pub fn measure<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(start.elapsed());
        out
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn over_budget(&self) -> u64 {
        self.over_budget
    }

    /// Worst single-frame time seen.
    pub fn worst(&self) -> Duration {
        self.worst
    }

    /// Mean per-frame time, zero before any frame.
    pub fn mean(&self) -> Duration {
        if self.frames == 0 {
            Duration::ZERO
        } else {
            self.total / self.frames as u32
        }
    }
}
