//! Feature extraction for form classification
//!
//! Layout of one frame (58 floats):
//! - 0..52: `(x, y, z, visibility)` for each of [`FEATURE_JOINTS`]
//! - 52..58: the derived angles in [`AngleId`] order, in degrees

use serde::{Deserialize, Serialize};

use crate::{AngleId, AngleSet, LandmarkSet, PoseLandmark, ANGLE_COUNT};

/// Joints carried in the feature vector, in order
pub const FEATURE_JOINTS: [PoseLandmark; 13] = [
    PoseLandmark::LeftShoulder,
    PoseLandmark::RightShoulder,
    PoseLandmark::LeftElbow,
    PoseLandmark::RightElbow,
    PoseLandmark::LeftWrist,
    PoseLandmark::RightWrist,
    PoseLandmark::LeftHip,
    PoseLandmark::RightHip,
    PoseLandmark::LeftKnee,
    PoseLandmark::RightKnee,
    PoseLandmark::LeftAnkle,
    PoseLandmark::RightAnkle,
    PoseLandmark::Nose,
];

/// Floats per joint: x, y, z, visibility
pub const VALUES_PER_JOINT: usize = 4;

/// Total feature vector length
pub const FEATURE_LEN: usize = FEATURE_JOINTS.len() * VALUES_PER_JOINT + ANGLE_COUNT;

/// Fixed-order numeric description of one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    /// Wrap raw values without checking the layout
    pub fn from_values(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Raw values in layout order
    pub fn values(&self) -> &[f32] {
        &self.0
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector holds no values
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The trailing angle block, `None` if the vector is too short to hold one
    pub fn angles(&self) -> Option<&[f32]> {
        let len = self.0.len();
        (len >= ANGLE_COUNT).then(|| &self.0[len - ANGLE_COUNT..])
    }

    /// One angle from the trailing block
    pub fn angle(&self, id: AngleId) -> Option<f32> {
        self.angles().map(|block| block[id.index()])
    }
}

/// Assembles [`FeatureVector`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Create a builder
    pub fn new() -> Self {
        Self
    }

    /// Missing joints contribute zeros, faulted angles contribute `0.0`
    pub fn build(&self, landmarks: &LandmarkSet, angles: &AngleSet) -> FeatureVector {
        let mut values = Vec::with_capacity(FEATURE_LEN);

        for joint in FEATURE_JOINTS {
            match landmarks.get(joint) {
                Some(l) => values.extend_from_slice(&[l.x, l.y, l.z, l.visibility]),
                None => values.extend_from_slice(&[0.0; VALUES_PER_JOINT]),
            }
        }
        values.extend_from_slice(&angles.degrees());

        FeatureVector(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AngleExtractor, Landmark};

    fn left_arm() -> LandmarkSet {
        LandmarkSet::new()
            .with(PoseLandmark::LeftShoulder, Landmark::new(0.0, 0.0, 0.1, 0.9))
            .with(PoseLandmark::LeftElbow, Landmark::new(0.5, 0.0, 0.2, 0.8))
            .with(PoseLandmark::LeftWrist, Landmark::new(0.5, 0.5, 0.3, 0.7))
    }

    #[test]
    fn test_feature_length_is_fixed() {
        let builder = FeatureBuilder::new();
        let extractor = AngleExtractor::new();

        let empty = LandmarkSet::new();
        let partial = left_arm();

        assert_eq!(FEATURE_LEN, 58);
        assert_eq!(builder.build(&empty, &extractor.extract_all(&empty)).len(), FEATURE_LEN);
        assert_eq!(
            builder.build(&partial, &extractor.extract_all(&partial)).len(),
            FEATURE_LEN
        );
    }

    #[test]
    fn test_feature_layout() {
        let set = left_arm();
        let angles = AngleExtractor::new().extract_all(&set);
        let features = FeatureBuilder::new().build(&set, &angles);
        let v = features.values();

        // LEFT_SHOULDER first
        assert_eq!(&v[0..4], &[0.0, 0.0, 0.1, 0.9]);
        // RIGHT_SHOULDER absent
        assert_eq!(&v[4..8], &[0.0; 4]);
        // LEFT_ELBOW third
        assert_eq!(&v[8..12], &[0.5, 0.0, 0.2, 0.8]);

        let elbow = features.angle(AngleId::LeftElbow).unwrap();
        assert!((elbow - 90.0).abs() < 0.01);
        assert_eq!(features.angle(AngleId::LeftKnee), Some(0.0));
    }

    #[test]
    fn test_short_vector_has_no_angles() {
        let short = FeatureVector::from_values(vec![1.0; ANGLE_COUNT - 1]);
        assert!(short.angles().is_none());
        assert_eq!(short.angle(AngleId::LeftElbow), None);

        let just_angles = FeatureVector::from_values(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        assert_eq!(just_angles.angle(AngleId::LeftKnee), Some(30.0));
    }
}
