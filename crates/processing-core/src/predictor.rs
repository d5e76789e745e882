//! Gaze predictor interface and training boundary.
//!
//! A predictor maps a valid [`FeatureVector`] to a screen-relative gaze
//! point. Any regression technique can sit behind [`Predictor`];
//! [`RidgePredictor`] is the built-in affine model.
//!
//! Training can be slow relative to a 33 ms frame, so it runs off the
//! frame loop through [`TrainingJob`]: the loop polls for the result and
//! dropping the job discards whatever training eventually produces.

use gazepoint_common::error::{GazeError, GazeResult};
use gazepoint_model::calibration::CalibrationSet;
use gazepoint_model::feature::{FeatureVector, FEATURE_LEN};
use gazepoint_model::geometry::Point2D;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Trainable mapping from features to screen-relative gaze.
pub trait Predictor: Send {
    /// Fit the model to a calibration. Fails with
    /// [`GazeError::InsufficientCalibrationData`] when there are too few records.
    fn train(&mut self, calibration: &CalibrationSet) -> GazeResult<()>;

    /// Screen-relative gaze (`[0.0, 1.0]` nominal, may overshoot),
    /// or `None` before training. Callers pass only valid vectors.
    fn predict(&self, features: &FeatureVector) -> Option<Point2D>;

    fn is_trained(&self) -> bool;

    /// Predictor name for logging.
    fn name(&self) -> &str;
}

/// Weights plus bias per output axis.
const PARAMS: usize = FEATURE_LEN + 1;

/// Affine ridge regression, one weight vector per screen axis.
#[derive(Debug, Clone)]
pub struct RidgePredictor {
    min_records: usize,
    lambda: f64,
    weights: Option<[[f64; PARAMS]; 2]>,
}

impl RidgePredictor {
    pub fn new(min_records: usize, lambda: f64) -> Self {
        Self {
            min_records,
            lambda,
            weights: None,
        }
    }

    fn design_row(features: &FeatureVector) -> [f64; PARAMS] {
        let mut row = [1.0; PARAMS];
        row[..FEATURE_LEN].copy_from_slice(&features.0);
        row
    }
}

impl Default for RidgePredictor {
    fn default() -> Self {
        Self::new(9, 1e-3)
    }
}

impl Predictor for RidgePredictor {
    fn train(&mut self, calibration: &CalibrationSet) -> GazeResult<()> {
        let records = &calibration.records;
        if records.len() < self.min_records {
            return Err(GazeError::InsufficientCalibrationData {
                completed: records.len(),
                required: self.min_records,
            });
        }

        let width = calibration.screen.width.max(1) as f64;
        let height = calibration.screen.height.max(1) as f64;

        // Normal equations: (X^T X + lambda I') w = X^T y, bias unpenalized
        let mut gram = [[0.0; PARAMS]; PARAMS];
        let mut rhs = [[0.0; 2]; PARAMS];
        for record in records {
            let row = Self::design_row(&record.features);
            let targets = [record.target_x / width, record.target_y / height];
            for i in 0..PARAMS {
                for j in 0..PARAMS {
                    gram[i][j] += row[i] * row[j];
                }
                rhs[i][0] += row[i] * targets[0];
                rhs[i][1] += row[i] * targets[1];
            }
        }
        for (i, diag) in gram.iter_mut().enumerate().take(FEATURE_LEN) {
            diag[i] += self.lambda;
        }

        let solution = solve(gram, rhs)
            .ok_or_else(|| GazeError::training("calibration features are degenerate"))?;

        let mut weights = [[0.0; PARAMS]; 2];
        for (i, row) in solution.iter().enumerate() {
            weights[0][i] = row[0];
            weights[1][i] = row[1];
        }
        self.weights = Some(weights);

        tracing::info!(records = records.len(), "Ridge predictor trained");
        Ok(())
    }

    fn predict(&self, features: &FeatureVector) -> Option<Point2D> {
        let weights = self.weights.as_ref()?;
        let row = Self::design_row(features);
        let dot = |w: &[f64; PARAMS]| w.iter().zip(row.iter()).map(|(a, b)| a * b).sum::<f64>();
        Some(Point2D::new(dot(&weights[0]), dot(&weights[1])))
    }

    fn is_trained(&self) -> bool {
        self.weights.is_some()
    }

    fn name(&self) -> &str {
        "ridge"
    }
}

/// Gaussian elimination with partial pivoting for two right-hand sides.
fn solve(
    mut a: [[f64; PARAMS]; PARAMS],
    mut b: [[f64; 2]; PARAMS],
) -> Option<[[f64; 2]; PARAMS]> {
    for col in 0..PARAMS {
        let pivot = (col..PARAMS).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..PARAMS {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..PARAMS {
                a[row][k] -= factor * a[col][k];
            }
            b[row][0] -= factor * b[col][0];
            b[row][1] -= factor * b[col][1];
        }
    }

    let mut x = [[0.0; 2]; PARAMS];
    for row in (0..PARAMS).rev() {
        for axis in 0..2 {
            let tail: f64 = ((row + 1)..PARAMS).map(|k| a[row][k] * x[k][axis]).sum();
            x[row][axis] = (b[row][axis] - tail) / a[row][row];
        }
    }
    Some(x)
}

/// Training running on the blocking pool.
///
/// The per-frame loop calls [`TrainingJob::try_take`] each frame and keeps
/// its pre-trained behavior until a result arrives. Dropping the job or
/// calling [`TrainingJob::cancel`] discards the result.
pub struct TrainingJob<P> {
    rx: Option<oneshot::Receiver<GazeResult<P>>>,
    task: JoinHandle<bool>,
}

impl<P: Predictor + 'static> TrainingJob<P> {
    /// Start training `predictor` on `calibration`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(mut predictor: P, calibration: CalibrationSet) -> Self {
        let (tx, rx) = oneshot::channel();
        let task = tokio::task::spawn_blocking(move || {
            tracing::debug!(predictor = predictor.name(), "Training started");
            let result = predictor.train(&calibration).map(|()| predictor);
            let delivered = tx.send(result).is_ok();
            if !delivered {
                tracing::debug!("Training result discarded");
            }
            delivered
        });
        Self { rx: Some(rx), task }
    }

    /// Non-blocking poll. Returns the result once, then `None`.
    pub fn try_take(&mut self) -> Option<GazeResult<P>> {
        let rx = self.rx.as_mut()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(GazeError::training(
                "training task ended without producing a result",
            )),
        };
        self.rx = None;
        Some(result)
    }

    /// Wait for training to finish.
    pub async fn wait(mut self) -> GazeResult<P> {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| GazeError::invalid_state("training result already taken"))?;
        rx.await.map_err(|_| {
            GazeError::training("training task ended without producing a result")
        })?
    }

    /// Whether the result is still outstanding.
    pub fn is_pending(&self) -> bool {
        self.rx.is_some()
    }

    /// Abandon the job. Training may still run, but its result is dropped.
    ///
    /// The returned handle resolves once training stops, to `false` when
    /// the result was discarded. Callers that do not care can drop it.
    pub fn cancel(self) -> JoinHandle<bool> {
        tracing::debug!("Training cancelled");
        drop(self.rx);
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureExtractor;
    use crate::synthetic::SyntheticFace;
    use gazepoint_model::calibration::{CalibrationRecord, CalibrationTarget};
    use gazepoint_model::geometry::ScreenSize;

    fn synthetic_calibration(points: usize) -> CalibrationSet {
        let screen = ScreenSize::new(1920, 1080);
        let face = SyntheticFace::default();
        let extractor = FeatureExtractor::with_defaults();
        let records = CalibrationTarget::grid(3)
            .into_iter()
            .take(points)
            .map(|target| {
                let landmarks = face.landmarks(target.normalized(), (0.0, 0.0));
                let pixels = target.to_pixels(screen);
                CalibrationRecord {
                    target_x: pixels.x,
                    target_y: pixels.y,
                    features: extractor.extract(&landmarks).unwrap(),
                    sample_count: 60,
                }
            })
            .collect();
        CalibrationSet::new(screen, records)
    }

    #[test]
    fn test_untrained_predicts_nothing() {
        let predictor = RidgePredictor::default();
        assert!(!predictor.is_trained());
        assert!(predictor.predict(&FeatureVector([0.0; 8])).is_none());
    }

    #[test]
    fn test_too_few_records_is_insufficient() {
        let mut predictor = RidgePredictor::default();
        let err = predictor.train(&synthetic_calibration(4)).unwrap_err();
        assert!(matches!(
            err,
            GazeError::InsufficientCalibrationData {
                completed: 4,
                required: 9
            }
        ));
        assert!(!predictor.is_trained());
    }

    #[test]
    fn test_recovers_linear_mapping() {
        let mut predictor = RidgePredictor::default();
        predictor.train(&synthetic_calibration(9)).unwrap();

        let face = SyntheticFace::default();
        let extractor = FeatureExtractor::with_defaults();
        for gaze in [Point2D::new(0.3, 0.7), Point2D::new(0.65, 0.2)] {
            let features = extractor.extract(&face.landmarks(gaze, (0.0, 0.0))).unwrap();
            let predicted = predictor.predict(&features).unwrap();
            assert!((predicted.x - gaze.x).abs() < 1e-3, "x {predicted:?} vs {gaze:?}");
            assert!((predicted.y - gaze.y).abs() < 1e-3, "y {predicted:?} vs {gaze:?}");
        }
    }

    #[test]
    fn test_identical_records_without_penalty_are_degenerate() {
        let mut set = synthetic_calibration(9);
        let first = set.records[0].features;
        for record in &mut set.records {
            record.features = first;
        }
        let mut predictor = RidgePredictor::new(9, 0.0);
        assert!(matches!(
            predictor.train(&set),
            Err(GazeError::Training { .. })
        ));
    }

    #[test]
    fn test_solve_small_system() {
        let mut a = [[0.0; PARAMS]; PARAMS];
        let mut b = [[0.0; 2]; PARAMS];
        for i in 0..PARAMS {
            a[i][i] = 2.0;
            b[i] = [4.0, i as f64];
        }
        a[0][1] = 1.0;
        let x = solve(a, b).unwrap();
        // 2 x0 + x1 = 4 with x1 = 2 -> x0 = 1
        assert!((x[1][0] - 2.0).abs() < 1e-12);
        assert!((x[0][0] - 1.0).abs() < 1e-12);
        assert!((x[3][1] - 1.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_training_job_wait() {
        let job = TrainingJob::spawn(RidgePredictor::default(), synthetic_calibration(9));
        let predictor = job.wait().await.unwrap();
        assert!(predictor.is_trained());
    }

    #[tokio::test]
    async fn test_training_job_poll_until_ready() {
        let mut job = TrainingJob::spawn(RidgePredictor::default(), synthetic_calibration(9));
        let mut result = None;
        for _ in 0..400 {
            if let Some(r) = job.try_take() {
                result = Some(r);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(result.expect("training should finish").is_ok());
        assert!(!job.is_pending());
        assert!(job.try_take().is_none());
    }

    #[tokio::test]
    async fn test_training_failure_propagates() {
        let job = TrainingJob::spawn(RidgePredictor::default(), synthetic_calibration(3));
        assert!(matches!(
            job.wait().await,
            Err(GazeError::InsufficientCalibrationData { .. })
        ));
    }

    /// Blocks in `train` until the test opens the gate.
    struct GatedPredictor {
        gate: std::sync::mpsc::Receiver<()>,
        trained: bool,
    }

    impl Predictor for GatedPredictor {
        fn train(&mut self, _calibration: &CalibrationSet) -> GazeResult<()> {
            self.gate
                .recv()
                .map_err(|_| GazeError::training("gate closed"))?;
            self.trained = true;
            Ok(())
        }

        fn predict(&self, _features: &FeatureVector) -> Option<Point2D> {
            self.trained.then(|| Point2D::new(0.5, 0.5))
        }

        fn is_trained(&self) -> bool {
            self.trained
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    fn gated() -> (std::sync::mpsc::Sender<()>, GatedPredictor) {
        let (open, gate) = std::sync::mpsc::channel();
        (
            open,
            GatedPredictor {
                gate,
                trained: false,
            },
        )
    }

    #[tokio::test]
    async fn test_job_stays_pending_until_training_ends() {
        let (open, predictor) = gated();
        let mut job = TrainingJob::spawn(predictor, synthetic_calibration(9));
        for _ in 0..5 {
            assert!(job.try_take().is_none());
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        assert!(job.is_pending());

        open.send(()).unwrap();
        let predictor = job.wait().await.unwrap();
        assert!(predictor.is_trained());
    }

    #[tokio::test]
    async fn test_cancel_discards_result() {
        let (open, predictor) = gated();
        let mut job = TrainingJob::spawn(predictor, synthetic_calibration(9));
        assert!(job.try_take().is_none());

        let task = job.cancel();
        open.send(()).unwrap();
        let delivered = task.await.unwrap();
        assert!(!delivered);
    }
}
