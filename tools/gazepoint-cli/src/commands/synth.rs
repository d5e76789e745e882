//! Generate a synthetic landmark session.

use std::path::PathBuf;

use gazepoint_common::clock::FrameClock;
use gazepoint_common::config::AppConfig;
use gazepoint_model::calibration::CalibrationTarget;
use gazepoint_model::geometry::{Point2D, ScreenSize};
use gazepoint_model::session::{FrameWriter, LandmarkFrame, SessionHeader, SESSION_SCHEMA_VERSION};
use gazepoint_processing_core::SyntheticFace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct SynthOptions {
    pub output: PathBuf,
    pub seed: u64,
    pub noise: f64,
    pub blink_rate: f64,
    pub fixations: usize,
    pub hold_ms: u64,
    pub fps: u32,
}

struct FrameSource {
    rng: StdRng,
    face: SyntheticFace,
    noise: f64,
    blink_rate: f64,
    frame_ns: f64,
    index: u64,
}

impl FrameSource {
    /// Next frame looking at `gaze`, or a frame with no face when `gaze` is `None`.
    fn next(&mut self, gaze: Option<Point2D>, target: Option<u32>) -> LandmarkFrame {
        let timestamp_ns = (self.index as f64 * self.frame_ns).round() as u64;
        self.index += 1;

        let landmarks = match gaze {
            Some(gaze) => {
                let face = if self.rng.gen_bool(self.blink_rate) {
                    self.face.blinking()
                } else {
                    self.face
                };
                let jitter = (
                    self.rng.gen_range(-self.noise..=self.noise),
                    self.rng.gen_range(-self.noise..=self.noise),
                );
                face.landmarks(gaze, jitter)
            }
            None => Vec::new(),
        };

        LandmarkFrame {
            timestamp_ns,
            target,
            landmarks,
        }
    }
}

pub fn run(config: &AppConfig, options: SynthOptions) -> anyhow::Result<()> {
    anyhow::ensure!(options.noise >= 0.0, "--noise must be non-negative");
    anyhow::ensure!(
        (0.0..=1.0).contains(&options.blink_rate),
        "--blink-rate must be within [0, 1]"
    );
    anyhow::ensure!(options.fps > 0, "--fps must be positive");

    let targets = CalibrationTarget::layout_for_count(config.calibration.point_count)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "calibration.point_count {} is not a square grid",
                config.calibration.point_count
            )
        })?;

    println!("Generating synthetic session: {}", options.output.display());

    let clock = FrameClock::start();
    let header = SessionHeader {
        schema_version: SESSION_SCHEMA_VERSION.to_string(),
        epoch_wall: clock.epoch_wall().to_string(),
        screen: ScreenSize::new(config.screen.width, config.screen.height),
        fps: options.fps,
    };
    let mut writer = FrameWriter::new(options.output.clone(), &header)?;

    let mut rng = StdRng::seed_from_u64(options.seed);
    let face = SyntheticFace::default().scaled(rng.gen_range(0.9..1.1));
    let mut source = FrameSource {
        rng,
        face,
        noise: options.noise,
        blink_rate: options.blink_rate,
        frame_ns: 1_000_000_000.0 / options.fps as f64,
        index: 0,
    };

    for target in &targets {
        for _ in 0..config.calibration.samples_per_point {
            writer.write_frame(&source.next(Some(target.normalized()), Some(target.ordinal)))?;
        }
    }
    println!(
        "  Calibration: {} targets x {} frames",
        targets.len(),
        config.calibration.samples_per_point
    );

    let hold_frames = (options.hold_ms * options.fps as u64 / 1000).max(1);
    for _ in 0..options.fixations {
        let gaze = Point2D::new(
            source.rng.gen_range(0.15..0.85),
            source.rng.gen_range(0.15..0.85),
        );
        // Face briefly lost between fixations
        writer.write_frame(&source.next(None, None))?;
        for _ in 0..hold_frames {
            writer.write_frame(&source.next(Some(gaze), None))?;
        }
        tracing::debug!(x = gaze.x, y = gaze.y, frames = hold_frames, "Fixation generated");
    }
    println!(
        "  Tracking: {} fixations x {} frames",
        options.fixations, hold_frames
    );

    writer.flush()?;
    println!("Wrote {} frames.", writer.frames_written());

    Ok(())
}
