//! Build a calibration from the target-tagged frames of a session.

use std::path::PathBuf;

use gazepoint_common::config::AppConfig;
use gazepoint_common::error::GazeError;
use gazepoint_model::calibration::CalibrationRecord;
use gazepoint_model::session::{LandmarkFrame, Session};
use gazepoint_processing_core::{GazePipeline, PipelineMode};

/// Consecutive frames looking at the same target.
fn target_runs<'a>(
    frames: impl Iterator<Item = &'a LandmarkFrame>,
) -> Vec<(u32, Vec<&'a LandmarkFrame>)> {
    let mut runs: Vec<(u32, Vec<&LandmarkFrame>)> = Vec::new();
    for frame in frames {
        let Some(ordinal) = frame.target else {
            continue;
        };
        match runs.last_mut() {
            Some((current, run)) if *current == ordinal => run.push(frame),
            _ => runs.push((ordinal, vec![frame])),
        }
    }
    runs
}

/// What became of one target run.
enum RunOutcome {
    Completed(CalibrationRecord),
    /// Every frame of the run was used and none produced a valid point.
    Exhausted { collected: usize },
    /// The run is not for the point being collected.
    Skipped,
}

/// Feed one target run into the aggregator.
///
/// A point that fails with no valid samples is collected again from the
/// remaining frames of the same run.
fn collect_run(
    pipeline: &mut GazePipeline,
    ordinal: u32,
    frames: &[&LandmarkFrame],
) -> anyhow::Result<RunOutcome> {
    let Some(target) = pipeline.aggregator().current_target().copied() else {
        return Ok(RunOutcome::Skipped);
    };
    if target.ordinal != ordinal {
        tracing::warn!(
            expected = target.ordinal,
            found = ordinal,
            frames = frames.len(),
            "Skipping frames for an out-of-order target"
        );
        return Ok(RunOutcome::Skipped);
    }

    let mode = PipelineMode::Calibrating { target };
    let mut remaining = frames.iter().peekable();
    loop {
        while !pipeline.aggregator().is_point_ready() {
            let Some(frame) = remaining.next() else {
                break;
            };
            pipeline.process_frame(&frame.landmarks, &mode, frame.timestamp_secs())?;
        }

        match pipeline.aggregator_mut().complete_current_point() {
            Ok(record) => return Ok(RunOutcome::Completed(record)),
            Err(GazeError::NoValidSamples { collected, .. }) => {
                if remaining.peek().is_none() {
                    return Ok(RunOutcome::Exhausted { collected });
                }
                tracing::info!(
                    ordinal,
                    collected,
                    "No valid samples, re-collecting from the rest of the run"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
}

pub fn run(mut config: AppConfig, session_path: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    println!("Calibrating from session: {}", session_path.display());

    let session = Session::load(&session_path)?;
    if let Some(header) = &session.header {
        config.screen.width = header.screen.width;
        config.screen.height = header.screen.height;
    }

    let mut pipeline = GazePipeline::new(&config)?;
    let point_count = pipeline.aggregator().targets().len();
    pipeline.aggregator_mut().start();

    for (ordinal, frames) in target_runs(session.calibration_frames()) {
        if !pipeline.aggregator().is_collecting() {
            break;
        }
        match collect_run(&mut pipeline, ordinal, &frames)? {
            RunOutcome::Completed(record) => {
                println!(
                    "  Point {ordinal}/{point_count} at ({:.0}, {:.0}): {} valid samples",
                    record.target_x, record.target_y, record.sample_count
                );
                if pipeline.aggregator().completed_points() < point_count {
                    pipeline.aggregator_mut().begin_next_point()?;
                }
            }
            RunOutcome::Exhausted { collected } => {
                println!(
                    "  Point {ordinal}/{point_count}: no valid samples in the last {collected} frames; \
                     the point needs another run of this target"
                );
            }
            RunOutcome::Skipped => {}
        }
    }

    let calibration = pipeline.finish_calibration()?;
    calibration.save(&output)?;

    println!(
        "\nCalibration saved to: {} ({} points, {} samples)",
        output.display(),
        calibration.records.len(),
        calibration.total_samples()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazepoint_model::calibration::CalibrationTarget;
    use gazepoint_processing_core::SyntheticFace;

    fn frame(t: u64, target: Option<u32>) -> LandmarkFrame {
        LandmarkFrame {
            timestamp_ns: t,
            target,
            landmarks: Vec::new(),
        }
    }

    #[test]
    fn test_runs_split_on_target_change() {
        let frames = vec![
            frame(0, Some(1)),
            frame(1, Some(1)),
            frame(2, None),
            frame(3, Some(2)),
            frame(4, Some(1)),
        ];
        let runs = target_runs(frames.iter());
        let shape: Vec<(u32, usize)> = runs.iter().map(|(o, r)| (*o, r.len())).collect();
        assert_eq!(shape, vec![(1, 2), (2, 1), (1, 1)]);
    }

    fn small_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.calibration.point_count = 4;
        config.calibration.samples_per_point = 10;
        config.calibration.min_points = 4;
        config
    }

    fn looking_at(
        face: SyntheticFace,
        target: &CalibrationTarget,
        count: usize,
        t0: u64,
    ) -> Vec<LandmarkFrame> {
        (0..count as u64)
            .map(|i| LandmarkFrame {
                timestamp_ns: (t0 + i) * 33_000_000,
                target: Some(target.ordinal),
                landmarks: face.landmarks(target.normalized(), (0.0, 0.0)),
            })
            .collect()
    }

    #[test]
    fn test_failed_point_recollects_from_same_run() {
        let mut pipeline = GazePipeline::new(&small_config()).unwrap();
        let targets = pipeline.aggregator().targets().to_vec();
        let face = SyntheticFace::default();
        pipeline.aggregator_mut().start();

        // Closed eyes for a full point, then a usable fixation
        let mut frames = looking_at(face.blinking(), &targets[0], 10, 0);
        frames.extend(looking_at(face, &targets[0], 10, 10));
        let run: Vec<&LandmarkFrame> = frames.iter().collect();

        match collect_run(&mut pipeline, targets[0].ordinal, &run).unwrap() {
            RunOutcome::Completed(record) => assert_eq!(record.sample_count, 10),
            _ => panic!("point should complete from the remaining frames"),
        }
        assert_eq!(pipeline.aggregator().completed_points(), 1);

        pipeline.aggregator_mut().begin_next_point().unwrap();
        let next = looking_at(face, &targets[1], 10, 20);
        let run: Vec<&LandmarkFrame> = next.iter().collect();
        assert!(matches!(
            collect_run(&mut pipeline, targets[1].ordinal, &run).unwrap(),
            RunOutcome::Completed(_)
        ));
    }

    #[test]
    fn test_exhausted_run_leaves_point_open() {
        let mut pipeline = GazePipeline::new(&small_config()).unwrap();
        let targets = pipeline.aggregator().targets().to_vec();
        pipeline.aggregator_mut().start();

        let frames = looking_at(SyntheticFace::default().blinking(), &targets[0], 15, 0);
        let run: Vec<&LandmarkFrame> = frames.iter().collect();
        assert!(matches!(
            collect_run(&mut pipeline, targets[0].ordinal, &run).unwrap(),
            RunOutcome::Exhausted { collected: 5 }
        ));
        assert!(pipeline.aggregator().is_collecting());
        assert_eq!(pipeline.aggregator().point_index(), 0);
    }

    #[test]
    fn test_out_of_order_run_is_skipped() {
        let mut pipeline = GazePipeline::new(&small_config()).unwrap();
        let targets = pipeline.aggregator().targets().to_vec();
        pipeline.aggregator_mut().start();

        let frames = looking_at(SyntheticFace::default(), &targets[2], 10, 0);
        let run: Vec<&LandmarkFrame> = frames.iter().collect();
        assert!(matches!(
            collect_run(&mut pipeline, targets[2].ordinal, &run).unwrap(),
            RunOutcome::Skipped
        ));
        assert_eq!(pipeline.aggregator().sample_count(), 0);
    }
}
