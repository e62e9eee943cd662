//! Joint angles from landmark triples
//!
//! Angle at vertex B of (A, B, C) via the dot product:
//! cos(θ) = (BA · BC) / (|BA| × |BC|)
//!
//! Only the image-plane (x, y) components take part. A frame that cannot
//! produce an angle yields `0.0` with a fault attached instead of an error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{LandmarkSet, PoseLandmark};

/// Shorter limb vectors are treated as zero length
const MIN_LIMB_LENGTH: f32 = 1e-6;

/// Why an angle could not be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleFault {
    /// A required joint is absent from the frame
    MissingLandmark(PoseLandmark),
    /// One of the limb vectors has zero length
    DegenerateGeometry,
}

impl fmt::Display for AngleFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AngleFault::MissingLandmark(joint) => write!(f, "missing landmark {joint}"),
            AngleFault::DegenerateGeometry => f.write_str("degenerate geometry"),
        }
    }
}

/// Three joints defining the angle at `vertex`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointTriple {
    /// First endpoint
    pub a: PoseLandmark,
    /// Joint the angle is measured at
    pub vertex: PoseLandmark,
    /// Second endpoint
    pub c: PoseLandmark,
}

impl JointTriple {
    /// Triple measured at `vertex`
    pub const fn new(a: PoseLandmark, vertex: PoseLandmark, c: PoseLandmark) -> Self {
        Self { a, vertex, c }
    }
}

/// The derived angles tracked for every frame, in feature order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleId {
    LeftElbow,
    RightElbow,
    LeftKnee,
    RightKnee,
    Torso,
    LateralRaise,
}

/// Number of derived angles
pub const ANGLE_COUNT: usize = 6;

impl AngleId {
    /// Every angle in feature order
    pub fn all() -> &'static [AngleId; ANGLE_COUNT] {
        &[
            AngleId::LeftElbow,
            AngleId::RightElbow,
            AngleId::LeftKnee,
            AngleId::RightKnee,
            AngleId::Torso,
            AngleId::LateralRaise,
        ]
    }

    /// Position in the angle block
    pub fn index(self) -> usize {
        self as usize
    }

    /// Joints defining this angle
    pub fn triple(self) -> JointTriple {
        use PoseLandmark::*;
        match self {
            AngleId::LeftElbow => JointTriple::new(LeftShoulder, LeftElbow, LeftWrist),
            AngleId::RightElbow => JointTriple::new(RightShoulder, RightElbow, RightWrist),
            AngleId::LeftKnee => JointTriple::new(LeftHip, LeftKnee, LeftAnkle),
            AngleId::RightKnee => JointTriple::new(RightHip, RightKnee, RightAnkle),
            AngleId::Torso => JointTriple::new(Nose, LeftShoulder, LeftHip),
            // Upper-arm abduction: elbow relative to the shoulder line
            AngleId::LateralRaise => JointTriple::new(LeftShoulder, LeftElbow, RightShoulder),
        }
    }
}

/// A computed joint angle in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAngle {
    degrees: f32,
    fault: Option<AngleFault>,
}

impl JointAngle {
    /// Trusted angle
    pub fn valid(degrees: f32) -> Self {
        Self {
            degrees,
            fault: None,
        }
    }

    /// Faulted angle reported as `0.0`
    pub fn invalid(fault: AngleFault) -> Self {
        Self {
            degrees: 0.0,
            fault: Some(fault),
        }
    }

    /// Reported degrees; `0.0` when invalid
    pub fn degrees(&self) -> f32 {
        self.degrees
    }

    /// Why the angle is invalid, if it is
    pub fn fault(&self) -> Option<AngleFault> {
        self.fault
    }

    /// Whether the angle can be trusted
    pub fn is_valid(&self) -> bool {
        self.fault.is_none()
    }

    /// Degrees only when the angle can be trusted
    pub fn value(&self) -> Option<f32> {
        self.is_valid().then_some(self.degrees)
    }
}

/// Angle at `vertex` between the limbs towards `a` and `c`, in `[0, 180]`
pub fn angle_between(a: (f32, f32), vertex: (f32, f32), c: (f32, f32)) -> Result<f32, AngleFault> {
    let v1 = (a.0 - vertex.0, a.1 - vertex.1);
    let v2 = (c.0 - vertex.0, c.1 - vertex.1);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

    if !(mag1 >= MIN_LIMB_LENGTH && mag2 >= MIN_LIMB_LENGTH) {
        return Err(AngleFault::DegenerateGeometry);
    }

    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    Ok(cos_angle.acos().to_degrees())
}

/// Computes joint angles from landmark sets
#[derive(Debug, Clone, Copy, Default)]
pub struct AngleExtractor;

impl AngleExtractor {
    /// Create an extractor
    pub fn new() -> Self {
        Self
    }

    /// Angle for an arbitrary joint triple
    pub fn angle(&self, landmarks: &LandmarkSet, triple: JointTriple) -> JointAngle {
        let lookup = |joint| {
            landmarks
                .get(joint)
                .map(|l| l.xy())
                .ok_or(AngleFault::MissingLandmark(joint))
        };

        let result = lookup(triple.a)
            .and_then(|a| lookup(triple.vertex).map(|b| (a, b)))
            .and_then(|(a, b)| lookup(triple.c).map(|c| (a, b, c)))
            .and_then(|(a, b, c)| angle_between(a, b, c));

        match result {
            Ok(degrees) => JointAngle::valid(degrees),
            Err(fault) => JointAngle::invalid(fault),
        }
    }

    /// All tracked angles for one frame
    pub fn extract_all(&self, landmarks: &LandmarkSet) -> AngleSet {
        let mut angles = [JointAngle::invalid(AngleFault::DegenerateGeometry); ANGLE_COUNT];
        for id in AngleId::all() {
            angles[id.index()] = self.angle(landmarks, id.triple());
        }
        AngleSet { angles }
    }
}

/// Every tracked angle of one frame, indexed by [`AngleId`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleSet {
    angles: [JointAngle; ANGLE_COUNT],
}

impl AngleSet {
    /// One angle, valid or faulted
    pub fn get(&self, id: AngleId) -> JointAngle {
        self.angles[id.index()]
    }

    /// Reported degrees in feature order (faulted angles are `0.0`)
    pub fn degrees(&self) -> [f32; ANGLE_COUNT] {
        self.angles.map(|a| a.degrees())
    }

    /// Every angle paired with its id
    pub fn iter(&self) -> impl Iterator<Item = (AngleId, JointAngle)> + '_ {
        AngleId::all().iter().map(move |&id| (id, self.get(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Landmark;
    use proptest::prelude::*;

    fn arm(shoulder: (f32, f32), elbow: (f32, f32), wrist: (f32, f32)) -> LandmarkSet {
        LandmarkSet::new()
            .with(PoseLandmark::LeftShoulder, Landmark::planar(shoulder.0, shoulder.1))
            .with(PoseLandmark::LeftElbow, Landmark::planar(elbow.0, elbow.1))
            .with(PoseLandmark::LeftWrist, Landmark::planar(wrist.0, wrist.1))
    }

    #[test]
    fn test_straight_arm() {
        let angle = angle_between((0.0, 0.0), (0.5, 0.0), (1.0, 0.0)).unwrap();
        assert!((angle - 180.0).abs() < 0.01);
    }

    #[test]
    fn test_bent_arm() {
        let angle = angle_between((0.0, 0.0), (0.5, 0.0), (0.5, 0.5)).unwrap();
        assert!((angle - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_z_is_ignored() {
        let set = arm((0.0, 0.0), (0.5, 0.0), (0.5, 0.5))
            .with(PoseLandmark::LeftWrist, Landmark::new(0.5, 0.5, 3.0, 1.0));
        let angle = AngleExtractor::new().angle(&set, AngleId::LeftElbow.triple());
        assert!((angle.degrees() - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_coincident_points_are_degenerate() {
        let extractor = AngleExtractor::new();

        let a_on_b = arm((0.5, 0.5), (0.5, 0.5), (1.0, 0.0));
        let angle = extractor.angle(&a_on_b, AngleId::LeftElbow.triple());
        assert_eq!(angle.degrees(), 0.0);
        assert_eq!(angle.fault(), Some(AngleFault::DegenerateGeometry));

        let c_on_b = arm((0.0, 0.0), (0.5, 0.5), (0.5, 0.5));
        let angle = extractor.angle(&c_on_b, AngleId::LeftElbow.triple());
        assert!(!angle.is_valid());
        assert_eq!(angle.value(), None);
    }

    #[test]
    fn test_missing_landmark() {
        let mut set = arm((0.0, 0.0), (0.5, 0.0), (1.0, 0.0));
        set.remove(PoseLandmark::LeftWrist);

        let angle = AngleExtractor::new().angle(&set, AngleId::LeftElbow.triple());
        assert_eq!(angle.degrees(), 0.0);
        assert_eq!(
            angle.fault(),
            Some(AngleFault::MissingLandmark(PoseLandmark::LeftWrist))
        );
    }

    #[test]
    fn test_extract_all_partial_frame() {
        let set = arm((0.0, 0.0), (0.5, 0.0), (0.5, 0.5));
        let angles = AngleExtractor::new().extract_all(&set);

        assert!(angles.get(AngleId::LeftElbow).is_valid());
        assert!(!angles.get(AngleId::LeftKnee).is_valid());
        assert_eq!(angles.degrees()[AngleId::LeftKnee.index()], 0.0);
        assert_eq!(angles.iter().filter(|(_, a)| a.is_valid()).count(), 1);
    }

    proptest! {
        #[test]
        fn prop_angle_in_range(
            ax in -2.0f32..2.0, ay in -2.0f32..2.0,
            bx in -2.0f32..2.0, by in -2.0f32..2.0,
            cx in -2.0f32..2.0, cy in -2.0f32..2.0,
        ) {
            match angle_between((ax, ay), (bx, by), (cx, cy)) {
                Ok(angle) => prop_assert!((0.0..=180.0).contains(&angle)),
                Err(fault) => prop_assert_eq!(fault, AngleFault::DegenerateGeometry),
            }
        }
    }
}
