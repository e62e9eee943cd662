//! Rep counter - hysteresis state machine per exercise
//!
//! Above the high threshold the counter arms in the extended stage. Dropping
//! below the low threshold while armed completes one rep. Angles between
//! the two thresholds leave the stage alone, so noise around a single
//! threshold cannot double count.

use repbot_core::{CounterConfig, JointAngle, Stage};
use serde::{Deserialize, Serialize};

/// Per-exercise counting state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExerciseState {
    /// Current hysteresis stage
    pub stage: Stage,
    /// Reps completed since the last reset
    pub rep_count: u32,
}

/// Outcome of feeding one frame to a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterEvent {
    /// Angle was faulted; nothing changed
    Skipped,
    /// Stage may have changed, no rep completed
    Observed,
    /// This frame completed a rep
    RepCompleted(u32),
}

/// Hysteresis counter for one exercise
#[derive(Debug, Clone)]
pub struct RepCounter {
    config: CounterConfig,
    state: ExerciseState,
}

impl RepCounter {
    /// Fresh counter in `Stage::None` with zero reps
    pub fn new(config: CounterConfig) -> Self {
        Self {
            config,
            state: ExerciseState::default(),
        }
    }

    /// Thresholds and angle this counter watches
    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    /// Stage and rep count as one value
    pub fn state(&self) -> ExerciseState {
        self.state
    }

    /// Current stage
    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    /// Reps completed since the last reset
    pub fn rep_count(&self) -> u32 {
        self.state.rep_count
    }

    /// Feed a computed joint angle; faulted angles are skipped
    pub fn observe(&mut self, angle: &JointAngle) -> CounterEvent {
        match angle.value() {
            Some(degrees) => self.observe_degrees(degrees),
            None => CounterEvent::Skipped,
        }
    }

    /// Feed a raw angle in degrees
    pub fn observe_degrees(&mut self, degrees: f32) -> CounterEvent {
        let extended = self.config.extended();

        if degrees > self.config.high_threshold {
            self.state.stage = extended;
            return CounterEvent::Observed;
        }

        if degrees < self.config.low_threshold && self.state.stage == extended {
            self.state.stage = self.config.counts_on;
            self.state.rep_count += 1;
            return CounterEvent::RepCompleted(self.state.rep_count);
        }

        CounterEvent::Observed
    }

    /// Back to `Stage::None` with zero reps
    pub fn reset(&mut self) {
        self.state = ExerciseState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use repbot_core::{AngleFault, AngleId, PoseLandmark};

    fn bicep() -> RepCounter {
        RepCounter::new(CounterConfig::new(AngleId::LeftElbow, 160.0, 30.0, Stage::Up))
    }

    fn squat() -> RepCounter {
        RepCounter::new(CounterConfig::new(AngleId::LeftKnee, 160.0, 90.0, Stage::Down))
    }

    fn feed(counter: &mut RepCounter, angles: &[f32]) {
        for &a in angles {
            counter.observe(&JointAngle::valid(a));
        }
    }

    #[test]
    fn test_bicep_curl_sequence() {
        let mut counter = bicep();
        feed(&mut counter, &[170.0, 170.0, 20.0, 20.0, 170.0]);

        assert_eq!(counter.rep_count(), 1);
        assert_eq!(counter.stage(), Stage::Down);
    }

    #[test]
    fn test_squat_sequence() {
        let mut counter = squat();
        feed(&mut counter, &[170.0, 170.0, 80.0, 80.0, 170.0, 170.0, 80.0]);

        assert_eq!(counter.rep_count(), 2);
        assert_eq!(counter.stage(), Stage::Down);
    }

    #[test]
    fn test_low_without_arming_does_not_count() {
        let mut counter = bicep();
        feed(&mut counter, &[20.0, 20.0, 100.0, 20.0]);

        assert_eq!(counter.rep_count(), 0);
        assert_eq!(counter.stage(), Stage::None);
    }

    #[test]
    fn test_dead_zone_keeps_stage() {
        let mut counter = bicep();
        feed(&mut counter, &[170.0, 100.0, 159.0, 31.0]);
        assert_eq!(counter.stage(), Stage::Down);
        assert_eq!(counter.rep_count(), 0);

        // Chatter around the low threshold counts once
        feed(&mut counter, &[29.0, 31.0, 29.0, 31.0, 29.0]);
        assert_eq!(counter.rep_count(), 1);
        assert_eq!(counter.stage(), Stage::Up);
    }

    #[test]
    fn test_event_reporting() {
        let mut counter = bicep();
        assert_eq!(counter.observe_degrees(170.0), CounterEvent::Observed);
        assert_eq!(counter.observe_degrees(20.0), CounterEvent::RepCompleted(1));
        assert_eq!(counter.observe_degrees(20.0), CounterEvent::Observed);
    }

    #[test]
    fn test_invalid_angle_skipped() {
        let mut counter = bicep();
        feed(&mut counter, &[170.0]);

        let missing = JointAngle::invalid(AngleFault::MissingLandmark(PoseLandmark::LeftWrist));
        assert_eq!(counter.observe(&missing), CounterEvent::Skipped);
        assert_eq!(
            counter.observe(&JointAngle::invalid(AngleFault::DegenerateGeometry)),
            CounterEvent::Skipped
        );

        assert_eq!(counter.stage(), Stage::Down);
        assert_eq!(counter.rep_count(), 0);

        feed(&mut counter, &[20.0]);
        assert_eq!(counter.rep_count(), 1);
    }

    #[test]
    fn test_reset() {
        let mut counter = squat();
        feed(&mut counter, &[170.0, 80.0]);
        assert_eq!(counter.rep_count(), 1);

        counter.reset();
        assert_eq!(counter.state(), ExerciseState::default());
    }

    proptest! {
        #[test]
        fn prop_count_monotone_and_bounded(angles in prop::collection::vec(0.0f32..180.0, 0..200)) {
            let mut counter = bicep();
            let mut previous = 0;
            let mut low_frames = 0;

            for a in angles {
                if a < 30.0 {
                    low_frames += 1;
                }
                counter.observe_degrees(a);
                prop_assert!(counter.rep_count() >= previous);
                prop_assert!(counter.rep_count() <= previous + 1);
                previous = counter.rep_count();
            }

            prop_assert!(counter.rep_count() <= low_frames);
        }
    }
}
