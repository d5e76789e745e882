//! Geometric feature extraction from facial landmarks.
//!
//! Each eye contributes three scale-invariant ratios: iris offset from the
//! eye center (X and Y) and lid aperture, all divided by the eye width so the
//! signal does not depend on the subject's distance from the camera. Two
//! symmetry features compare the eyes. Everything is multiplied by
//! [`FEATURE_GAIN`] before it leaves this module.

use gazepoint_common::config::ValiditySettings;
use gazepoint_model::feature::{FeatureVector, FEATURE_GAIN};
use gazepoint_model::landmark::{EyeIndices, Landmark, LandmarkIndices, MIN_LANDMARKS};

/// What the per-eye distances are divided by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Divide by each eye's corner-to-corner width.
    #[default]
    EyeWidth,
    /// Divide by the face-edge width. Produces a different feature scale;
    /// calibrations recorded under one mode do not transfer to the other.
    FaceWidth,
}

/// Per-eye ratios before gain.
#[derive(Debug, Clone, Copy)]
struct EyeRatios {
    offset_x: f64,
    offset_y: f64,
    aperture: f64,
}

/// Stateless landmark → feature vector transform.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    indices: LandmarkIndices,
    normalization: Normalization,
}

impl FeatureExtractor {
    pub fn new(indices: LandmarkIndices, normalization: Normalization) -> Self {
        Self {
            indices,
            normalization,
        }
    }

    /// Face-mesh indices with eye-width normalization.
    pub fn with_defaults() -> Self {
        Self::new(LandmarkIndices::FACE_MESH, Normalization::EyeWidth)
    }

    /// Compute the feature vector for one frame.
    ///
    /// Returns `None` when the frame cannot be measured: fewer than
    /// [`MIN_LANDMARKS`] points, non-finite coordinates at a used index,
    /// or zero-width geometry. A returned vector may still be unreliable;
    /// check it with [`FeatureValidator`].
    pub fn extract(&self, landmarks: &[Landmark]) -> Option<FeatureVector> {
        if landmarks.len() < MIN_LANDMARKS || landmarks.len() <= self.indices.max_index() {
            return None;
        }

        let face_width = match self.normalization {
            Normalization::EyeWidth => None,
            Normalization::FaceWidth => {
                let left = landmarks[self.indices.face_left];
                let right = landmarks[self.indices.face_right];
                if !left.is_finite() || !right.is_finite() {
                    return None;
                }
                Some(left.distance_2d(&right))
            }
        };

        let left = self.eye_ratios(landmarks, &self.indices.left_eye, face_width)?;
        let right = self.eye_ratios(landmarks, &self.indices.right_eye, face_width)?;

        let lx = left.offset_x * FEATURE_GAIN;
        let ly = left.offset_y * FEATURE_GAIN;
        let la = left.aperture * FEATURE_GAIN;
        let rx = right.offset_x * FEATURE_GAIN;
        let ry = right.offset_y * FEATURE_GAIN;
        let ra = right.aperture * FEATURE_GAIN;

        Some(FeatureVector([
            lx,
            ly,
            la,
            rx,
            ry,
            ra,
            (lx - rx).abs(),
            (la - ra).abs(),
        ]))
    }

    fn eye_ratios(
        &self,
        landmarks: &[Landmark],
        eye: &EyeIndices,
        face_width: Option<f64>,
    ) -> Option<EyeRatios> {
        let inner = landmarks[eye.inner_corner];
        let outer = landmarks[eye.outer_corner];
        let top = landmarks[eye.top_lid];
        let bottom = landmarks[eye.bottom_lid];
        let iris = landmarks[eye.iris_center];

        if [inner, outer, top, bottom, iris].iter().any(|l| !l.is_finite()) {
            return None;
        }

        let (center_x, center_y) = inner.midpoint(&outer);
        let width = face_width.unwrap_or_else(|| inner.distance_2d(&outer));
        if width <= f64::EPSILON {
            return None;
        }

        Some(EyeRatios {
            offset_x: (iris.x - center_x) / width,
            offset_y: (iris.y - center_y) / width,
            aperture: top.distance_2d(&bottom) / width,
        })
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Outcome of the three independent validity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityVerdict {
    /// Both eyes open enough.
    pub aperture_ok: bool,
    /// No iris offset beyond the ceiling.
    pub offset_ok: bool,
    /// Left and right readings agree.
    pub symmetry_ok: bool,
}

impl ValidityVerdict {
    pub fn is_valid(&self) -> bool {
        self.aperture_ok && self.offset_ok && self.symmetry_ok
    }
}

/// Threshold rules deciding whether a feature vector may be used
/// downstream. Thresholds are in post-gain units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureValidator {
    thresholds: ValiditySettings,
}

impl FeatureValidator {
    pub fn new(thresholds: ValiditySettings) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ValiditySettings {
        &self.thresholds
    }

    pub fn verdict(&self, v: &FeatureVector) -> ValidityVerdict {
        let t = &self.thresholds;
        let (lx, ly) = v.left_offset();
        let (rx, ry) = v.right_offset();

        ValidityVerdict {
            aperture_ok: v.left_aperture() >= t.min_aperture
                && v.right_aperture() >= t.min_aperture,
            offset_ok: [lx, ly, rx, ry].iter().all(|o| o.abs() <= t.max_offset),
            symmetry_ok: v.iris_symmetry() <= t.max_symmetry
                && v.aperture_symmetry() <= t.max_symmetry,
        }
    }

    pub fn is_valid(&self, v: &FeatureVector) -> bool {
        self.verdict(v).is_valid()
    }
}

impl Default for FeatureValidator {
    fn default() -> Self {
        Self::new(ValiditySettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticFace;
    use gazepoint_model::geometry::Point2D;
    use proptest::prelude::*;

    fn good_vector() -> FeatureVector {
        FeatureVector([1.0, -0.5, 3.0, 1.2, -0.4, 3.1, 0.2, 0.1])
    }

    #[test]
    fn test_centered_gaze_has_zero_offsets() {
        let face = SyntheticFace::default();
        let landmarks = face.landmarks(Point2D::new(0.5, 0.5), (0.0, 0.0));
        let v = FeatureExtractor::with_defaults().extract(&landmarks).unwrap();

        let (lx, ly) = v.left_offset();
        let (rx, ry) = v.right_offset();
        for o in [lx, ly, rx, ry] {
            assert!(o.abs() < 1e-9, "offset {o} should be zero");
        }
        // aperture / width = 0.02 / 0.06, times gain
        assert!((v.left_aperture() - 10.0 / 3.0).abs() < 1e-9);
        assert!((v.right_aperture() - 10.0 / 3.0).abs() < 1e-9);
        assert!(v.iris_symmetry().abs() < 1e-9);
        assert!(v.aperture_symmetry().abs() < 1e-9);
    }

    #[test]
    fn test_offsets_are_gained_and_width_normalized() {
        let face = SyntheticFace::default();
        let landmarks = face.landmarks(Point2D::new(0.5, 0.5), (0.006, -0.003));
        let v = FeatureExtractor::with_defaults().extract(&landmarks).unwrap();
        // 0.006 / 0.06 * 10 = 1.0 ; -0.003 / 0.06 * 10 = -0.5
        assert!((v.left_offset().0 - 1.0).abs() < 1e-9);
        assert!((v.left_offset().1 + 0.5).abs() < 1e-9);
        assert!((v.right_offset().0 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_invariance() {
        let near = SyntheticFace::default();
        let far = near.scaled(0.5);
        let gaze = Point2D::new(0.8, 0.3);

        let extractor = FeatureExtractor::with_defaults();
        let a = extractor.extract(&near.landmarks(gaze, (0.0, 0.0))).unwrap();
        let b = extractor.extract(&far.landmarks(gaze, (0.0, 0.0))).unwrap();
        for (x, y) in a.0.iter().zip(b.0.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_477_landmarks_is_absent() {
        let face = SyntheticFace::default();
        let mut landmarks = face.landmarks(Point2D::new(0.5, 0.5), (0.0, 0.0));
        landmarks.truncate(MIN_LANDMARKS - 1);
        assert!(FeatureExtractor::with_defaults().extract(&landmarks).is_none());
    }

    #[test]
    fn test_zero_width_eye_is_absent() {
        let face = SyntheticFace::default();
        let mut landmarks = face.landmarks(Point2D::new(0.5, 0.5), (0.0, 0.0));
        let eye = LandmarkIndices::FACE_MESH.left_eye;
        landmarks[eye.outer_corner] = landmarks[eye.inner_corner];
        assert!(FeatureExtractor::with_defaults().extract(&landmarks).is_none());
    }

    #[test]
    fn test_nan_landmark_is_absent() {
        let face = SyntheticFace::default();
        let mut landmarks = face.landmarks(Point2D::new(0.5, 0.5), (0.0, 0.0));
        landmarks[LandmarkIndices::FACE_MESH.right_eye.iris_center].x = f64::NAN;
        assert!(FeatureExtractor::with_defaults().extract(&landmarks).is_none());
    }

    #[test]
    fn test_face_width_normalization_changes_scale() {
        let face = SyntheticFace::default();
        let landmarks = face.landmarks(Point2D::new(0.5, 0.5), (0.0, 0.0));
        let v = FeatureExtractor::new(LandmarkIndices::FACE_MESH, Normalization::FaceWidth)
            .extract(&landmarks)
            .unwrap();
        // aperture 0.02 over face width 0.35
        assert!((v.left_aperture() - 0.02 / 0.35 * FEATURE_GAIN).abs() < 1e-9);
    }

    #[test]
    fn test_blinking_face_fails_validity_but_is_returned() {
        let face = SyntheticFace::default().blinking();
        let landmarks = face.landmarks(Point2D::new(0.5, 0.5), (0.0, 0.0));
        let v = FeatureExtractor::with_defaults().extract(&landmarks).unwrap();
        let verdict = FeatureValidator::default().verdict(&v);
        assert!(!verdict.aperture_ok);
        assert!(!verdict.is_valid());
    }

    #[test]
    fn test_validity_accepts_in_bounds_vector() {
        assert!(FeatureValidator::default().is_valid(&good_vector()));
    }

    #[test]
    fn test_validity_bounds_are_inclusive() {
        let v = FeatureVector([5.0, -5.0, 0.5, 5.0, 5.0, 0.5, 0.0, 0.0]);
        assert!(FeatureValidator::default().is_valid(&v));
        let v = FeatureVector([1.0, 0.0, 3.0, -2.0, 0.0, 3.0, 3.0, 3.0]);
        assert!(FeatureValidator::default().is_valid(&v));
    }

    #[test]
    fn test_each_validity_bound_fails_alone() {
        let validator = FeatureValidator::default();

        let mut closed = good_vector();
        closed.0[FeatureVector::RIGHT_APERTURE] = 0.49;
        let verdict = validator.verdict(&closed);
        assert!(!verdict.aperture_ok && verdict.offset_ok && verdict.symmetry_ok);

        let mut far = good_vector();
        far.0[FeatureVector::LEFT_OFFSET_Y] = -5.01;
        let verdict = validator.verdict(&far);
        assert!(verdict.aperture_ok && !verdict.offset_ok && verdict.symmetry_ok);

        let mut asym = good_vector();
        asym.0[FeatureVector::APERTURE_SYMMETRY] = 3.01;
        let verdict = validator.verdict(&asym);
        assert!(verdict.aperture_ok && verdict.offset_ok && !verdict.symmetry_ok);

        let mut iris_asym = good_vector();
        iris_asym.0[FeatureVector::IRIS_SYMMETRY] = 3.5;
        assert!(!validator.is_valid(&iris_asym));
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let strict = FeatureValidator::new(ValiditySettings {
            min_aperture: 3.05,
            ..Default::default()
        });
        // left aperture 3.0 now below the floor
        assert!(!strict.is_valid(&good_vector()));
    }

    proptest! {
        #[test]
        fn prop_short_landmark_sets_are_absent(len in 0usize..MIN_LANDMARKS, x in 0.0f64..1.0) {
            let landmarks = vec![Landmark::new(x, x, 0.0); len];
            prop_assert!(FeatureExtractor::with_defaults().extract(&landmarks).is_none());
        }
    }
}
