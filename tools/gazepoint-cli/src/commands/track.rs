//! Replay the tracking frames of a session through a trained pipeline.

use std::path::PathBuf;

use gazepoint_common::clock::FrameBudget;
use gazepoint_common::config::AppConfig;
use gazepoint_model::calibration::CalibrationSet;
use gazepoint_model::event::DwellEvent;
use gazepoint_model::session::Session;
use gazepoint_processing_core::{GazePipeline, PipelineMode, RidgePredictor, TrainingJob};
use serde::Serialize;

#[derive(Serialize)]
struct EventLine<'a> {
    t: f64,
    #[serde(flatten)]
    event: &'a DwellEvent,
}

#[derive(Default)]
struct ReplayStats {
    frames: usize,
    no_face: usize,
    invalid: usize,
    clicks: usize,
    cancels: usize,
}

pub async fn run(
    mut config: AppConfig,
    session_path: PathBuf,
    calibration_path: PathBuf,
    json: bool,
) -> anyhow::Result<()> {
    let calibration = CalibrationSet::load(&calibration_path)
        .map_err(|e| anyhow::anyhow!("Failed to load calibration: {e}"))?;
    let session = Session::load(&session_path)?;

    config.screen.width = calibration.screen.width;
    config.screen.height = calibration.screen.height;
    let mut pipeline = GazePipeline::new(&config)?;

    tracing::info!(records = calibration.records.len(), "Training predictor");
    let predictor = RidgePredictor::new(config.calibration.min_points, 1e-3);
    let trained = TrainingJob::spawn(predictor, calibration).wait().await?;
    pipeline.install_predictor(Box::new(trained))?;

    let fps = session.header.as_ref().map_or(30, |h| h.fps);
    let mut budget = FrameBudget::for_rate_hz(fps);
    let mut stats = ReplayStats::default();

    for frame in session.tracking_frames() {
        let now = frame.timestamp_secs();
        let output = budget
            .measure(|| pipeline.process_frame(&frame.landmarks, &PipelineMode::Tracking, now))?;

        stats.frames += 1;
        if !output.has_face() {
            stats.no_face += 1;
        } else if !output.valid {
            stats.invalid += 1;
        }

        let Some(event) = output.dwell else {
            continue;
        };
        match event {
            DwellEvent::Click { .. } => stats.clicks += 1,
            DwellEvent::DwellCancel => stats.cancels += 1,
            _ => {}
        }

        if json {
            println!("{}", serde_json::to_string(&EventLine { t: now, event: &event })?);
        } else {
            match event {
                DwellEvent::DwellStart { x, y } => {
                    println!("{now:>8.3}s  dwell start  ({x:.0}, {y:.0})")
                }
                DwellEvent::Click { x, y, dwell_ms } => {
                    println!("{now:>8.3}s  CLICK        ({x:.0}, {y:.0}) after {dwell_ms:.0} ms")
                }
                DwellEvent::DwellCancel => println!("{now:>8.3}s  dwell cancel"),
                DwellEvent::DwellProgress { .. } => {}
            }
        }
    }

    if !json {
        println!();
        println!("Replayed {} frames:", stats.frames);
        println!("  No face: {}", stats.no_face);
        println!("  Invalid features: {}", stats.invalid);
        println!("  Clicks: {}", stats.clicks);
        println!("  Cancels: {}", stats.cancels);
        println!(
            "  Processing: mean {:?}, worst {:?}, {} over budget",
            budget.mean(),
            budget.worst(),
            budget.over_budget()
        );
    }

    Ok(())
}
