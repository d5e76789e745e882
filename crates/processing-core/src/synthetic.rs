//! Synthetic landmark generation for tests and offline demos.
//!
//! Builds a full face-mesh-sized landmark set whose eye geometry encodes a
//! known gaze point: iris offsets move linearly with the gaze target, so
//! the features extracted from it are an affine function of the target.

use gazepoint_model::geometry::Point2D;
use gazepoint_model::landmark::{EyeIndices, Landmark, LandmarkIndices, MIN_LANDMARKS};

/// Parametric frontal face in image-normalized coordinates.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticFace {
    /// Face center in the image.
    pub center: Point2D,
    /// Corner-to-corner width of each eye.
    pub eye_width: f64,
    /// Distance between the two eye centers.
    pub eye_spacing: f64,
    /// Lid-to-lid opening.
    pub aperture: f64,
    /// Distance between the face-edge landmarks.
    pub face_width: f64,
    /// Horizontal iris travel per unit of gaze, as a fraction of eye width.
    pub gaze_gain_x: f64,
    /// Vertical iris travel per unit of gaze, as a fraction of eye width.
    pub gaze_gain_y: f64,
}

impl Default for SyntheticFace {
    fn default() -> Self {
        Self {
            center: Point2D::new(0.5, 0.45),
            eye_width: 0.06,
            eye_spacing: 0.12,
            aperture: 0.02,
            face_width: 0.35,
            gaze_gain_x: 0.3,
            gaze_gain_y: 0.2,
        }
    }
}

impl SyntheticFace {
    /// The same face seen at a different distance from the camera.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            eye_width: self.eye_width * factor,
            eye_spacing: self.eye_spacing * factor,
            aperture: self.aperture * factor,
            face_width: self.face_width * factor,
            ..*self
        }
    }

    /// The same face with the eyes nearly shut.
    pub fn blinking(&self) -> Self {
        Self {
            aperture: self.aperture * 0.05,
            ..*self
        }
    }

    /// Landmarks for a subject looking at `gaze` (screen fraction), with
    /// `iris_jitter` added to both iris centers in image units.
    pub fn landmarks(&self, gaze: Point2D, iris_jitter: (f64, f64)) -> Vec<Landmark> {
        let indices = LandmarkIndices::FACE_MESH;
        let c = self.center;
        let mut landmarks = vec![Landmark::new(c.x, c.y, 0.0); MIN_LANDMARKS];

        let iris_dx = (gaze.x - 0.5) * self.gaze_gain_x * self.eye_width + iris_jitter.0;
        let iris_dy = (gaze.y - 0.5) * self.gaze_gain_y * self.eye_width + iris_jitter.1;

        let half = self.eye_spacing / 2.0;
        self.place_eye(&mut landmarks, &indices.left_eye, c.x - half, -1.0, (iris_dx, iris_dy));
        self.place_eye(&mut landmarks, &indices.right_eye, c.x + half, 1.0, (iris_dx, iris_dy));

        landmarks[indices.face_left] = Landmark::new(c.x - self.face_width / 2.0, c.y, 0.0);
        landmarks[indices.face_right] = Landmark::new(c.x + self.face_width / 2.0, c.y, 0.0);

        landmarks
    }

    /// `outward` is -1 for the image-left eye, +1 for the image-right eye.
    fn place_eye(
        &self,
        landmarks: &mut [Landmark],
        eye: &EyeIndices,
        eye_x: f64,
        outward: f64,
        iris: (f64, f64),
    ) {
        let y = self.center.y;
        let half_w = self.eye_width / 2.0;
        let half_a = self.aperture / 2.0;

        landmarks[eye.outer_corner] = Landmark::new(eye_x + outward * half_w, y, 0.0);
        landmarks[eye.inner_corner] = Landmark::new(eye_x - outward * half_w, y, 0.0);
        landmarks[eye.top_lid] = Landmark::new(eye_x, y - half_a, -0.01);
        landmarks[eye.bottom_lid] = Landmark::new(eye_x, y + half_a, -0.01);
        landmarks[eye.iris_center] = Landmark::new(eye_x + iris.0, y + iris.1, -0.02);
    }
}
