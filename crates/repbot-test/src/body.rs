//! Synthetic body poses
//!
//! Builds full 33-landmark frames with chosen joint angles, so tests can
//! drive the engine with angle scripts instead of recorded video.

use repbot_core::{AngleId, Landmark, LandmarkSet, PoseLandmark};

/// Limb length used when re-placing an endpoint (normalized image units)
const LIMB: f32 = 0.15;

/// Mutable synthetic skeleton
#[derive(Clone, Debug)]
pub struct BodyPose {
    landmarks: LandmarkSet,
}

impl BodyPose {
    /// Front-facing person, arms hanging, legs straight.
    ///
    /// Image coordinates: x to the right, y downwards. The subject's left
    /// side appears on the right half of the image.
    pub fn standing() -> Self {
        use PoseLandmark::*;

        let mut landmarks = LandmarkSet::new();
        let mut put = |joint, x, y| landmarks.insert(joint, Landmark::new(x, y, 0.0, 1.0));

        put(Nose, 0.50, 0.10);
        put(LeftEyeInner, 0.51, 0.08);
        put(LeftEye, 0.52, 0.08);
        put(LeftEyeOuter, 0.53, 0.08);
        put(RightEyeInner, 0.49, 0.08);
        put(RightEye, 0.48, 0.08);
        put(RightEyeOuter, 0.47, 0.08);
        put(LeftEar, 0.55, 0.09);
        put(RightEar, 0.45, 0.09);
        put(MouthLeft, 0.52, 0.13);
        put(MouthRight, 0.48, 0.13);

        put(LeftShoulder, 0.60, 0.25);
        put(RightShoulder, 0.40, 0.25);
        put(LeftElbow, 0.62, 0.40);
        put(RightElbow, 0.38, 0.40);
        put(LeftWrist, 0.63, 0.55);
        put(RightWrist, 0.37, 0.55);
        put(LeftPinky, 0.64, 0.58);
        put(RightPinky, 0.36, 0.58);
        put(LeftIndex, 0.63, 0.59);
        put(RightIndex, 0.37, 0.59);
        put(LeftThumb, 0.62, 0.57);
        put(RightThumb, 0.38, 0.57);

        put(LeftHip, 0.56, 0.55);
        put(RightHip, 0.44, 0.55);
        put(LeftKnee, 0.57, 0.72);
        put(RightKnee, 0.43, 0.72);
        put(LeftAnkle, 0.57, 0.90);
        put(RightAnkle, 0.43, 0.90);
        put(LeftHeel, 0.56, 0.92);
        put(RightHeel, 0.44, 0.92);
        put(LeftFootIndex, 0.59, 0.94);
        put(RightFootIndex, 0.41, 0.94);

        Self { landmarks }
    }

    /// Move joints so that `id` measures `degrees` (clamped to `[0, 180]`).
    ///
    /// Limb angles rotate the distal joint around the vertex. The lateral
    /// raise angle moves the left elbow, and the wrist follows.
    pub fn with_angle(mut self, id: AngleId, degrees: f32) -> Self {
        self.set_angle(id, degrees);
        self
    }

    /// In-place form of [`with_angle`](Self::with_angle)
    pub fn set_angle(&mut self, id: AngleId, degrees: f32) {
        let degrees = degrees.clamp(0.0, 180.0);
        match id {
            AngleId::LateralRaise => self.set_lateral_raise(degrees),
            _ => {
                let triple = id.triple();
                self.rotate_endpoint(triple.a, triple.vertex, triple.c, degrees);
            }
        }
    }

    /// Same visibility on every landmark
    pub fn with_visibility(mut self, visibility: f32) -> Self {
        for joint in PoseLandmark::all() {
            if let Some(mut l) = self.landmarks.get(*joint).copied() {
                l.visibility = visibility;
                self.landmarks.insert(*joint, l);
            }
        }
        self
    }

    /// Drop a joint from the frame
    pub fn without(mut self, joint: PoseLandmark) -> Self {
        self.landmarks.remove(joint);
        self
    }

    /// Current landmark set
    pub fn landmarks(&self) -> &LandmarkSet {
        &self.landmarks
    }

    /// Consume the pose into its landmark set
    pub fn into_landmarks(self) -> LandmarkSet {
        self.landmarks
    }

    fn point(&self, joint: PoseLandmark) -> Option<(f32, f32)> {
        self.landmarks.get(joint).map(|l| l.xy())
    }

    fn place(&mut self, joint: PoseLandmark, (x, y): (f32, f32)) {
        let visibility = self.landmarks.get(joint).map_or(1.0, |l| l.visibility);
        self.landmarks.insert(joint, Landmark::new(x, y, 0.0, visibility));
    }

    /// Put `c` at `LIMB` from `vertex`, `degrees` away from the `vertex → a` ray
    fn rotate_endpoint(&mut self, a: PoseLandmark, vertex: PoseLandmark, c: PoseLandmark, degrees: f32) {
        let (Some(pa), Some(pv)) = (self.point(a), self.point(vertex)) else {
            return;
        };
        let (dx, dy) = (pa.0 - pv.0, pa.1 - pv.1);
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 {
            return;
        }
        let (ux, uy) = (dx / len, dy / len);
        let (sin, cos) = degrees.to_radians().sin_cos();
        let (rx, ry) = (ux * cos - uy * sin, ux * sin + uy * cos);
        self.place(c, (pv.0 + LIMB * rx, pv.1 + LIMB * ry));
    }

    /// Elbow on the perpendicular bisector of the shoulder line, below it,
    /// so the shoulders subtend `degrees` at the elbow.
    fn set_lateral_raise(&mut self, degrees: f32) {
        let (Some(left), Some(right)) = (
            self.point(PoseLandmark::LeftShoulder),
            self.point(PoseLandmark::RightShoulder),
        ) else {
            return;
        };
        let mid = ((left.0 + right.0) / 2.0, (left.1 + right.1) / 2.0);
        let half = ((left.0 - right.0).powi(2) + (left.1 - right.1).powi(2)).sqrt() / 2.0;
        let drop = half / (degrees.max(1.0).to_radians() / 2.0).tan();

        let elbow = (mid.0, mid.1 + drop);
        self.place(PoseLandmark::LeftElbow, elbow);
        self.place(PoseLandmark::LeftWrist, (elbow.0, elbow.1 + LIMB));
    }
}

impl Default for BodyPose {
    fn default() -> Self {
        Self::standing()
    }
}
