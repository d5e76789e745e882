//! Facial landmark types and the index roles read by feature extraction.

use serde::{Deserialize, Serialize};

/// Minimum landmark count for a usable frame: the face-mesh topology with
/// iris refinement (468 mesh points + 2 × 5 iris points).
pub const MIN_LANDMARKS: usize = 478;

/// One tracked point on the face.
///
/// `x`/`y` are image-normalized (roughly `[0.0, 1.0]`), `z` is relative depth.
/// Serialized compactly as `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar midpoint with another landmark.
    pub fn midpoint(&self, other: &Landmark) -> (f64, f64) {
        ((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Planar Euclidean distance (depth is ignored).
    pub fn distance_2d(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Landmark {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Landmark> for [f64; 3] {
    fn from(l: Landmark) -> Self {
        [l.x, l.y, l.z]
    }
}

/// Landmark indices for one eye.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeIndices {
    pub inner_corner: usize,
    pub outer_corner: usize,
    pub top_lid: usize,
    pub bottom_lid: usize,
    pub iris_center: usize,
}

impl EyeIndices {
    fn max_index(&self) -> usize {
        self.inner_corner
            .max(self.outer_corner)
            .max(self.top_lid)
            .max(self.bottom_lid)
            .max(self.iris_center)
    }
}

/// The landmark roles read from each frame.
///
/// "Left" and "right" are image sides, not the subject's eyes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkIndices {
    pub left_eye: EyeIndices,
    pub right_eye: EyeIndices,
    /// Far-left face edge.
    pub face_left: usize,
    /// Far-right face edge.
    pub face_right: usize,
}

impl LandmarkIndices {
    /// Face-mesh indices with iris refinement.
    pub const FACE_MESH: LandmarkIndices = LandmarkIndices {
        left_eye: EyeIndices {
            inner_corner: 133,
            outer_corner: 33,
            top_lid: 159,
            bottom_lid: 145,
            iris_center: 468,
        },
        right_eye: EyeIndices {
            inner_corner: 362,
            outer_corner: 263,
            top_lid: 386,
            bottom_lid: 374,
            iris_center: 473,
        },
        face_left: 234,
        face_right: 454,
    };

    /// Largest index referenced by any role.
    pub fn max_index(&self) -> usize {
        self.left_eye
            .max_index()
            .max(self.right_eye.max_index())
            .max(self.face_left)
            .max(self.face_right)
    }
}

impl Default for LandmarkIndices {
    fn default() -> Self {
        Self::FACE_MESH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_serializes_as_triple() {
        let l = Landmark::new(0.25, 0.5, -0.01);
        let json = serde_json::to_string(&l).unwrap();
        assert_eq!(json, "[0.25,0.5,-0.01]");
        let back: Landmark = serde_json::from_str(&json).unwrap();
        assert_eq!(back, l);
    }

    #[test]
    fn test_face_mesh_indices_fit_minimum_count() {
        assert!(LandmarkIndices::FACE_MESH.max_index() < MIN_LANDMARKS);
    }

    #[test]
    fn test_distance_ignores_depth() {
        let a = Landmark::new(0.0, 0.0, 5.0);
        let b = Landmark::new(0.3, 0.4, -2.0);
        assert!((a.distance_2d(&b) - 0.5).abs() < 1e-12);
        assert_eq!(a.midpoint(&b), (0.15, 0.2));
    }
}
