//! The gaze feature vector.

use serde::{Deserialize, Serialize};

/// Number of elements in a feature vector.
pub const FEATURE_LEN: usize = 8;

/// Gain applied to every normalized feature for numeric conditioning.
///
/// A predictor trained on vectors at this scale expects it at inference.
pub const FEATURE_GAIN: f64 = 10.0;

/// Ordered gaze features, all pre-scaled by [`FEATURE_GAIN`]:
///
/// | idx | feature |
/// |-----|---------|
/// | 0 | left iris offset X / width |
/// | 1 | left iris offset Y / width |
/// | 2 | left aperture / width |
/// | 3 | right iris offset X / width |
/// | 4 | right iris offset Y / width |
/// | 5 | right aperture / width |
/// | 6 | iris symmetry `|0 - 3|` |
/// | 7 | aperture symmetry `|2 - 5|` |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(pub [f64; FEATURE_LEN]);

impl FeatureVector {
    pub const LEFT_OFFSET_X: usize = 0;
    pub const LEFT_OFFSET_Y: usize = 1;
    pub const LEFT_APERTURE: usize = 2;
    pub const RIGHT_OFFSET_X: usize = 3;
    pub const RIGHT_OFFSET_Y: usize = 4;
    pub const RIGHT_APERTURE: usize = 5;
    pub const IRIS_SYMMETRY: usize = 6;
    pub const APERTURE_SYMMETRY: usize = 7;

    pub fn new(values: [f64; FEATURE_LEN]) -> Self {
        Self(values)
    }

    pub fn as_array(&self) -> &[f64; FEATURE_LEN] {
        &self.0
    }

    pub fn left_offset(&self) -> (f64, f64) {
        (self.0[Self::LEFT_OFFSET_X], self.0[Self::LEFT_OFFSET_Y])
    }

    pub fn right_offset(&self) -> (f64, f64) {
        (self.0[Self::RIGHT_OFFSET_X], self.0[Self::RIGHT_OFFSET_Y])
    }

    pub fn left_aperture(&self) -> f64 {
        self.0[Self::LEFT_APERTURE]
    }

    pub fn right_aperture(&self) -> f64 {
        self.0[Self::RIGHT_APERTURE]
    }

    pub fn iris_symmetry(&self) -> f64 {
        self.0[Self::IRIS_SYMMETRY]
    }

    pub fn aperture_symmetry(&self) -> f64 {
        self.0[Self::APERTURE_SYMMETRY]
    }

    /// Element-wise mean. Returns `None` for an empty input.
    pub fn mean<'a>(vectors: impl IntoIterator<Item = &'a FeatureVector>) -> Option<FeatureVector> {
        let mut sum = [0.0; FEATURE_LEN];
        let mut count = 0usize;
        for v in vectors {
            for (acc, value) in sum.iter_mut().zip(v.0.iter()) {
                *acc += value;
            }
            count += 1;
        }
        if count == 0 {
            return None;
        }
        for acc in &mut sum {
            *acc /= count as f64;
        }
        Some(FeatureVector(sum))
    }
}
