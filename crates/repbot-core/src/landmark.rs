//! Landmarks - per-frame body joint positions
//!
//! One [`LandmarkSet`] describes a single detected body. Joint naming and
//! index order follow the 33-point MediaPipe pose topology, so a detector's
//! raw output can be ingested by position.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RepbotError;

/// Body landmark identifier (MediaPipe pose index order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl PoseLandmark {
    /// All landmarks in index order
    pub fn all() -> &'static [PoseLandmark] {
        use PoseLandmark::*;
        &[
            Nose,
            LeftEyeInner,
            LeftEye,
            LeftEyeOuter,
            RightEyeInner,
            RightEye,
            RightEyeOuter,
            LeftEar,
            RightEar,
            MouthLeft,
            MouthRight,
            LeftShoulder,
            RightShoulder,
            LeftElbow,
            RightElbow,
            LeftWrist,
            RightWrist,
            LeftPinky,
            RightPinky,
            LeftIndex,
            RightIndex,
            LeftThumb,
            RightThumb,
            LeftHip,
            RightHip,
            LeftKnee,
            RightKnee,
            LeftAnkle,
            RightAnkle,
            LeftHeel,
            RightHeel,
            LeftFootIndex,
            RightFootIndex,
        ]
    }

    /// Number of landmarks
    pub fn count() -> usize {
        33
    }

    /// Landmark at detector index `idx`
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::all().get(idx).copied()
    }

    /// Detector index
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical detector name, e.g. `LEFT_SHOULDER`
    pub fn name(self) -> &'static str {
        use PoseLandmark::*;
        match self {
            Nose => "NOSE",
            LeftEyeInner => "LEFT_EYE_INNER",
            LeftEye => "LEFT_EYE",
            LeftEyeOuter => "LEFT_EYE_OUTER",
            RightEyeInner => "RIGHT_EYE_INNER",
            RightEye => "RIGHT_EYE",
            RightEyeOuter => "RIGHT_EYE_OUTER",
            LeftEar => "LEFT_EAR",
            RightEar => "RIGHT_EAR",
            MouthLeft => "MOUTH_LEFT",
            MouthRight => "MOUTH_RIGHT",
            LeftShoulder => "LEFT_SHOULDER",
            RightShoulder => "RIGHT_SHOULDER",
            LeftElbow => "LEFT_ELBOW",
            RightElbow => "RIGHT_ELBOW",
            LeftWrist => "LEFT_WRIST",
            RightWrist => "RIGHT_WRIST",
            LeftPinky => "LEFT_PINKY",
            RightPinky => "RIGHT_PINKY",
            LeftIndex => "LEFT_INDEX",
            RightIndex => "RIGHT_INDEX",
            LeftThumb => "LEFT_THUMB",
            RightThumb => "RIGHT_THUMB",
            LeftHip => "LEFT_HIP",
            RightHip => "RIGHT_HIP",
            LeftKnee => "LEFT_KNEE",
            RightKnee => "RIGHT_KNEE",
            LeftAnkle => "LEFT_ANKLE",
            RightAnkle => "RIGHT_ANKLE",
            LeftHeel => "LEFT_HEEL",
            RightHeel => "RIGHT_HEEL",
            LeftFootIndex => "LEFT_FOOT_INDEX",
            RightFootIndex => "RIGHT_FOOT_INDEX",
        }
    }
}

impl fmt::Display for PoseLandmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PoseLandmark {
    type Err = RepbotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|l| l.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RepbotError::InvalidConfig(format!("unknown landmark {s}")))
    }
}

/// Anything that exposes a landmark's position and detection confidence.
///
/// Detector outputs, deserialized frames and test fixtures all implement this,
/// so the engine never cares which concrete type produced a frame.
pub trait LandmarkPoint {
    fn x(&self) -> f32;
    fn y(&self) -> f32;
    fn z(&self) -> f32;
    /// Detection confidence in `[0, 1]`
    fn visibility(&self) -> f32;
}

/// A single landmark observation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Normalized image x
    pub x: f32,
    /// Normalized image y
    pub y: f32,
    /// Depth relative to the hips
    pub z: f32,
    /// Detection confidence in `[0, 1]`
    pub visibility: f32,
}

impl Landmark {
    /// Landmark from raw components
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// Fully visible landmark on the image plane
    pub fn planar(x: f32, y: f32) -> Self {
        Self::new(x, y, 0.0, 1.0)
    }

    /// Copy any landmark-like value
    pub fn from_point<P: LandmarkPoint + ?Sized>(p: &P) -> Self {
        Self::new(p.x(), p.y(), p.z(), p.visibility())
    }

    /// Image-plane coordinates used for angle geometry
    pub fn xy(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl LandmarkPoint for Landmark {
    fn x(&self) -> f32 {
        self.x
    }

    fn y(&self) -> f32 {
        self.y
    }

    fn z(&self) -> f32 {
        self.z
    }

    fn visibility(&self) -> f32 {
        self.visibility
    }
}

/// Landmarks detected in one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: HashMap<PoseLandmark, Landmark>,
}

impl LandmarkSet {
    /// Empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from detector output ordered by landmark index.
    ///
    /// Entries past the 33rd are ignored.
    pub fn from_indexed<P: LandmarkPoint>(points: &[P]) -> Self {
        let points = points
            .iter()
            .zip(PoseLandmark::all())
            .map(|(p, &joint)| (joint, Landmark::from_point(p)))
            .collect();
        Self { points }
    }

    /// Set or replace one joint
    pub fn insert(&mut self, joint: PoseLandmark, landmark: Landmark) {
        self.points.insert(joint, landmark);
    }

    /// Builder-style insert
    pub fn with(mut self, joint: PoseLandmark, landmark: Landmark) -> Self {
        self.insert(joint, landmark);
        self
    }

    /// Joint position, if detected
    pub fn get(&self, joint: PoseLandmark) -> Option<&Landmark> {
        self.points.get(&joint)
    }

    /// Remove one joint
    pub fn remove(&mut self, joint: PoseLandmark) -> Option<Landmark> {
        self.points.remove(&joint)
    }

    /// Whether `joint` was detected
    pub fn contains(&self, joint: PoseLandmark) -> bool {
        self.points.contains_key(&joint)
    }

    /// Number of detected joints
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether nothing was detected
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Detected joints in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&PoseLandmark, &Landmark)> {
        self.points.iter()
    }

    /// Mean visibility over present landmarks, `None` when the set is empty
    pub fn mean_visibility(&self) -> Option<f32> {
        if self.points.is_empty() {
            return None;
        }
        let sum: f32 = self.points.values().map(|l| l.visibility).sum();
        Some(sum / self.points.len() as f32)
    }
}

/// Result of asking a [`PoseProvider`] for the next frame
#[derive(Debug, Clone, PartialEq)]
pub enum PoseDetection {
    Detected(LandmarkSet),
    NoDetection,
}

impl PoseDetection {
    /// Landmarks when something was detected
    pub fn landmarks(&self) -> Option<&LandmarkSet> {
        match self {
            PoseDetection::Detected(set) => Some(set),
            PoseDetection::NoDetection => None,
        }
    }
}

impl From<Option<LandmarkSet>> for PoseDetection {
    fn from(set: Option<LandmarkSet>) -> Self {
        set.map_or(PoseDetection::NoDetection, PoseDetection::Detected)
    }
}

/// Source of per-frame landmark sets (a pose estimator upstream).
///
/// "Nothing detected" is a normal value, not a failure.
pub trait PoseProvider {
    fn next_detection(&mut self) -> PoseDetection;
}
