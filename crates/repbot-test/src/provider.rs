//! Pose providers for driving the engine in tests
//!
//! - Scripted: replays a fixed frame list
//! - Noisy: perturbs frames with seeded jitter and dropouts

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use repbot_core::{AngleId, Landmark, LandmarkSet, PoseDetection, PoseLandmark, PoseProvider};

use crate::body::BodyPose;

/// Replays a fixed list of detections, then reports no detection forever
#[derive(Clone, Debug, Default)]
pub struct ScriptedProvider {
    frames: VecDeque<PoseDetection>,
}

impl ScriptedProvider {
    /// Replay `frames` in order
    pub fn new(frames: Vec<PoseDetection>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    /// One frame per angle, all other joints from the standing pose
    pub fn from_angles(id: AngleId, angles: &[f32]) -> Self {
        let frames = angles
            .iter()
            .map(|&a| PoseDetection::Detected(BodyPose::standing().with_angle(id, a).into_landmarks()))
            .collect();
        Self::new(frames)
    }

    /// Append a frame to the end of the script
    pub fn push(&mut self, detection: PoseDetection) {
        self.frames.push_back(detection);
    }

    /// Frames left before the script runs dry
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl PoseProvider for ScriptedProvider {
    fn next_detection(&mut self) -> PoseDetection {
        self.frames.pop_front().unwrap_or(PoseDetection::NoDetection)
    }
}

/// Frame perturbation settings
#[derive(Clone, Debug)]
pub struct NoiseConfig {
    /// Max absolute jitter added to x and y
    pub jitter: f32,
    /// Probability that a whole frame is lost (0.0 - 1.0)
    pub dropout_prob: f64,
    /// Probability that a single landmark is lost (0.0 - 1.0)
    pub landmark_loss_prob: f64,
    /// Visibility range assigned to surviving landmarks
    pub visibility: (f32, f32),
}

impl Default for NoiseConfig {
    fn default() -> Self {
        NoiseConfig {
            jitter: 0.002,
            dropout_prob: 0.02,
            landmark_loss_prob: 0.0,
            visibility: (0.8, 1.0),
        }
    }
}

impl NoiseConfig {
    /// Perfect capture
    pub fn clean() -> Self {
        NoiseConfig {
            jitter: 0.0,
            dropout_prob: 0.0,
            landmark_loss_prob: 0.0,
            visibility: (1.0, 1.0),
        }
    }

    /// Dim room, partial occlusion
    pub fn poor() -> Self {
        NoiseConfig {
            jitter: 0.004,
            dropout_prob: 0.15,
            landmark_loss_prob: 0.05,
            visibility: (0.3, 0.9),
        }
    }
}

/// Wraps another provider and perturbs its frames
pub struct NoisyProvider<P> {
    inner: P,
    config: NoiseConfig,
    rng: StdRng,
}

impl<P: PoseProvider> NoisyProvider<P> {
    /// Wrap `inner` with a seeded noise generator
    pub fn with_seed(inner: P, config: NoiseConfig, seed: u64) -> Self {
        Self {
            inner,
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn perturb(&mut self, set: &LandmarkSet) -> LandmarkSet {
        let mut out = LandmarkSet::new();
        for joint in PoseLandmark::all() {
            let Some(l) = set.get(*joint) else {
                continue;
            };
            if self.config.landmark_loss_prob > 0.0 && self.rng.gen_bool(self.config.landmark_loss_prob) {
                continue;
            }
            let (lo, hi) = self.config.visibility;
            let visibility = if hi > lo { self.rng.gen_range(lo..hi) } else { lo };
            out.insert(
                *joint,
                Landmark::new(
                    l.x + self.jitter(),
                    l.y + self.jitter(),
                    l.z,
                    visibility,
                ),
            );
        }
        out
    }

    fn jitter(&mut self) -> f32 {
        if self.config.jitter > 0.0 {
            self.rng.gen_range(-self.config.jitter..self.config.jitter)
        } else {
            0.0
        }
    }
}

impl<P: PoseProvider> PoseProvider for NoisyProvider<P> {
    fn next_detection(&mut self) -> PoseDetection {
        let detection = self.inner.next_detection();
        let PoseDetection::Detected(set) = detection else {
            return PoseDetection::NoDetection;
        };
        if self.config.dropout_prob > 0.0 && self.rng.gen_bool(self.config.dropout_prob) {
            return PoseDetection::NoDetection;
        }
        PoseDetection::Detected(self.perturb(&set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_exhausts_to_no_detection() {
        let mut provider = ScriptedProvider::from_angles(AngleId::LeftElbow, &[170.0, 20.0]);
        assert_eq!(provider.remaining(), 2);
        assert!(provider.next_detection().landmarks().is_some());
        assert!(provider.next_detection().landmarks().is_some());
        assert_eq!(provider.next_detection(), PoseDetection::NoDetection);
    }

    #[test]
    fn test_clean_noise_is_identity() {
        let scripted = ScriptedProvider::from_angles(AngleId::LeftKnee, &[120.0]);
        let expected = BodyPose::standing().with_angle(AngleId::LeftKnee, 120.0).into_landmarks();

        let mut noisy = NoisyProvider::with_seed(scripted, NoiseConfig::clean(), 1);
        assert_eq!(noisy.next_detection(), PoseDetection::Detected(expected));
    }

    #[test]
    fn test_noise_is_reproducible() {
        let angles = [170.0, 90.0, 20.0, 90.0, 170.0, 20.0];
        let mut a = NoisyProvider::with_seed(
            ScriptedProvider::from_angles(AngleId::LeftElbow, &angles),
            NoiseConfig::poor(),
            99,
        );
        let mut b = NoisyProvider::with_seed(
            ScriptedProvider::from_angles(AngleId::LeftElbow, &angles),
            NoiseConfig::poor(),
            99,
        );
        for _ in 0..angles.len() {
            assert_eq!(a.next_detection(), b.next_detection());
        }
    }
}
