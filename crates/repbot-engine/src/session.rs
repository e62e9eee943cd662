//! Session aggregator - owns all per-session state
//!
//! Per-frame pipeline:
//! 1. Resolve the active exercise
//! 2. Extract joint angles
//! 3. Build the feature vector and push it to the rolling history
//! 4. Feed the active exercise's rep counter
//! 5. Classify form
//! 6. Record accuracy and the assessment
//!
//! Steps 4-6 run under one write guard, so a stats reader sees every field
//! from the same frame.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use repbot_core::{
    AngleExtractor, AngleSet, ExerciseCatalog, ExerciseDef, FeatureBuilder, FeatureVector,
    LandmarkSet, PoseProvider, RepbotError, RepbotResult, RollingHistory, Stage,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    CounterEvent, EngineConfig, ExerciseState, FeatureScaler, FormAssessment, FormClassifier,
    RepCounter, TrainedFormClassifier,
};

const INITIAL_FEEDBACK: &str = "Ready";

/// Serializable view of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Mean landmark visibility of the last frame, percent
    pub accuracy: f32,
    /// Feedback of the last assessment
    pub feedback: String,
    /// Verdict of the last assessment
    pub form_correct: bool,
    /// Confidence of the last assessment, percent
    pub form_confidence: f32,
    /// Rep count per exercise key
    pub counters: BTreeMap<String, u32>,
    /// Hysteresis stage per exercise key
    pub stages: BTreeMap<String, Stage>,
    /// Exercise key to display name
    pub available_exercises: BTreeMap<String, String>,
    /// Exercise named by the last update
    pub current_exercise: Option<String>,
    /// Frames processed since the last full reset
    pub frames: u64,
}

impl Snapshot {
    /// Serialize the snapshot as JSON
    pub fn to_json(&self) -> RepbotResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Mutable session state, guarded as one unit
struct SessionState {
    /// Indexed by catalog position; `None` for exercises without a counter
    counters: Vec<Option<RepCounter>>,
    history: RollingHistory,
    classifier: FormClassifier,
    last_assessment: Option<FormAssessment>,
    accuracy: f32,
    current_exercise: Option<String>,
    frames: u64,
}

impl SessionState {
    fn exercise_state(&self, idx: usize) -> ExerciseState {
        self.counters[idx]
            .as_ref()
            .map(|c| c.state())
            .unwrap_or_default()
    }

    fn reset_all(&mut self) {
        for counter in self.counters.iter_mut().flatten() {
            counter.reset();
        }
        self.history.clear();
        self.frames = 0;
    }
}

/// Exercise session: rep counters, rolling history and the latest assessment
pub struct SessionAggregator {
    catalog: ExerciseCatalog,
    extractor: AngleExtractor,
    builder: FeatureBuilder,
    state: RwLock<SessionState>,
}

impl SessionAggregator {
    /// Validate `config` and build an idle session
    pub fn new(config: EngineConfig) -> RepbotResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let counters = config
            .catalog
            .iter()
            .map(|e| e.counter.map(RepCounter::new))
            .collect();

        info!(
            exercises = config.catalog.len(),
            history = config.history_capacity,
            "exercise session created"
        );

        SessionAggregator {
            catalog: config.catalog,
            extractor: AngleExtractor::new(),
            builder: FeatureBuilder::new(),
            state: RwLock::new(SessionState {
                counters,
                history: RollingHistory::new(config.history_capacity),
                classifier: FormClassifier::new(),
                last_assessment: None,
                accuracy: 0.0,
                current_exercise: None,
                frames: 0,
            }),
        }
    }

    /// Replace the form classifier before the session is shared
    pub fn with_classifier(mut self, classifier: FormClassifier) -> Self {
        self.state.get_mut().classifier = classifier;
        self
    }

    /// Install or remove the trained classifier collaborators
    pub fn set_model(
        &self,
        model: Option<Arc<dyn TrainedFormClassifier>>,
        scaler: Option<Arc<dyn FeatureScaler>>,
    ) {
        let mut state = self.state.write();
        state.classifier.set_model(model, scaler);
        info!(model = state.classifier.has_model(), "form model updated");
    }

    /// Exercises this session knows
    pub fn catalog(&self) -> &ExerciseCatalog {
        &self.catalog
    }

    fn resolve(&self, key: &str) -> RepbotResult<(usize, &ExerciseDef)> {
        self.catalog
            .position(key)
            .and_then(|idx| self.catalog.get_index(idx).map(|e| (idx, e)))
            .ok_or_else(|| RepbotError::UnknownExercise(key.to_string()))
    }

    /// Process one frame for `active_exercise`.
    ///
    /// Only an unknown exercise is an error; bad frames degrade to an
    /// "insufficient data" assessment.
    pub fn update(
        &self,
        landmarks: Option<&LandmarkSet>,
        active_exercise: &str,
    ) -> RepbotResult<FormAssessment> {
        let (idx, exercise) = self.resolve(active_exercise)?;

        // Pure per-frame work stays outside the lock
        let frame = landmarks.map(|set| {
            let angles = self.extractor.extract_all(set);
            let features = self.builder.build(set, &angles);
            let accuracy = set.mean_visibility().map_or(0.0, |v| v * 100.0);
            (angles, features, accuracy)
        });

        let mut guard = self.state.write();
        let state = &mut *guard;

        // Stage the counter step and the assessment before touching the
        // session, so every field below is committed from the same frame
        let (assessment, staged_counter) = match &frame {
            None => (FormAssessment::insufficient_data(), None),
            Some((angles, features, _)) => {
                let mut counter = state.counters[idx].clone();
                let rep_count = match counter.as_mut() {
                    Some(counter) => {
                        observe(counter, angles, &exercise.key);
                        counter.rep_count()
                    }
                    None => 0,
                };

                let rule_fault = exercise
                    .form_rule
                    .as_ref()
                    .and_then(|rule| angles.get(rule.angle).fault());
                let assessment = match rule_fault {
                    Some(fault) => {
                        debug!(exercise = %exercise.key, %fault, "form angle unavailable");
                        FormAssessment::insufficient_data()
                    }
                    None => state
                        .classifier
                        .analyze_frame(features, angles, exercise, rep_count),
                };
                (assessment, Some(counter))
            }
        };

        state.frames += 1;
        state.current_exercise = Some(exercise.key.clone());
        match frame {
            None => state.accuracy = 0.0,
            Some((_, features, accuracy)) => {
                state.accuracy = accuracy;
                state.history.push(features);
            }
        }
        if let Some(counter) = staged_counter {
            state.counters[idx] = counter;
        }
        state.last_assessment = Some(assessment.clone());
        Ok(assessment)
    }

    /// Pull one frame from `provider` and process it
    pub fn process_next<P: PoseProvider + ?Sized>(
        &self,
        provider: &mut P,
        active_exercise: &str,
    ) -> RepbotResult<FormAssessment> {
        let detection = provider.next_detection();
        self.update(detection.landmarks(), active_exercise)
    }

    /// Consistent view of the session
    pub fn get_stats(&self) -> Snapshot {
        let state = self.state.read();

        let mut counters = BTreeMap::new();
        let mut stages = BTreeMap::new();
        let mut available_exercises = BTreeMap::new();
        for (idx, exercise) in self.catalog.iter().enumerate() {
            let ex = state.exercise_state(idx);
            counters.insert(exercise.key.clone(), ex.rep_count);
            stages.insert(exercise.key.clone(), ex.stage);
            available_exercises.insert(exercise.key.clone(), exercise.display_name.clone());
        }

        let (feedback, form_correct, form_confidence) = match &state.last_assessment {
            Some(a) => (a.feedback.clone(), a.form_correct, a.confidence),
            None => (INITIAL_FEEDBACK.to_string(), true, 0.0),
        };

        Snapshot {
            accuracy: round2(state.accuracy),
            feedback,
            form_correct,
            form_confidence: round2(form_confidence),
            counters,
            stages,
            available_exercises,
            current_exercise: state.current_exercise.clone(),
            frames: state.frames,
        }
    }

    /// Stage and rep count for one exercise
    pub fn exercise_state(&self, key: &str) -> RepbotResult<ExerciseState> {
        let (idx, _) = self.resolve(key)?;
        Ok(self.state.read().exercise_state(idx))
    }

    /// Assessment of the most recent frame, if any
    pub fn last_assessment(&self) -> Option<FormAssessment> {
        self.state.read().last_assessment.clone()
    }

    /// Rolling history, oldest first
    pub fn recent_features(&self) -> Vec<FeatureVector> {
        self.state.read().history.to_vec()
    }

    /// Frames currently held in the rolling history
    pub fn history_len(&self) -> usize {
        self.state.read().history.len()
    }

    /// Zero one exercise, or every exercise plus the history when `None`
    pub fn reset(&self, exercise: Option<&str>) -> RepbotResult<()> {
        let target = exercise.map(|key| self.resolve(key)).transpose()?;
        let mut state = self.state.write();
        apply_reset(&mut state, target);
        Ok(())
    }

    /// Like [`reset`](Self::reset) but gives up after `timeout`.
    ///
    /// Returns `Ok(false)` if the session lock could not be taken in time.
    pub fn try_reset(&self, exercise: Option<&str>, timeout: Duration) -> RepbotResult<bool> {
        let target = exercise.map(|key| self.resolve(key)).transpose()?;
        match self.state.try_write_for(timeout) {
            Some(mut state) => {
                apply_reset(&mut state, target);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for SessionAggregator {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}

fn apply_reset(state: &mut SessionState, target: Option<(usize, &ExerciseDef)>) {
    match target {
        Some((idx, exercise)) => {
            if let Some(counter) = state.counters[idx].as_mut() {
                counter.reset();
            }
            info!(exercise = %exercise.key, "exercise reset");
        }
        None => {
            state.reset_all();
            info!("session reset");
        }
    }
}

fn observe(counter: &mut RepCounter, angles: &AngleSet, exercise: &str) {
    let angle = angles.get(counter.config().angle);
    match counter.observe(&angle) {
        CounterEvent::RepCompleted(reps) => debug!(exercise, reps, "rep completed"),
        CounterEvent::Skipped => {
            if let Some(fault) = angle.fault() {
                debug!(exercise, %fault, "counter frame skipped");
            }
        }
        CounterEvent::Observed => {}
    }
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use repbot_core::{Landmark, PoseDetection, PoseLandmark};

    /// Left arm with the elbow at `degrees`
    fn arm_frame(degrees: f32) -> LandmarkSet {
        let rad = degrees.to_radians();
        LandmarkSet::new()
            .with(PoseLandmark::LeftShoulder, Landmark::planar(0.5, 0.2))
            .with(PoseLandmark::LeftElbow, Landmark::planar(0.5, 0.4))
            .with(
                PoseLandmark::LeftWrist,
                Landmark::planar(0.5 + 0.2 * rad.sin(), 0.4 - 0.2 * rad.cos()),
            )
    }

    #[test]
    fn test_initial_snapshot() {
        let session = SessionAggregator::default();
        let stats = session.get_stats();

        assert_eq!(stats.accuracy, 0.0);
        assert_eq!(stats.feedback, "Ready");
        assert!(stats.form_correct);
        assert_eq!(stats.form_confidence, 0.0);
        assert_eq!(stats.counters.len(), 10);
        assert!(stats.counters.values().all(|&c| c == 0));
        assert_eq!(stats.available_exercises["LATERAL_RAISE"], "Lateral Raise");
        assert_eq!(stats.current_exercise, None);
    }

    #[test]
    fn test_unknown_exercise() {
        let session = SessionAggregator::default();
        let result = session.update(Some(&arm_frame(170.0)), "JUMPING_JACK");
        assert!(matches!(result, Err(RepbotError::UnknownExercise(name)) if name == "JUMPING_JACK"));

        // Nothing was touched
        assert_eq!(session.get_stats().frames, 0);
        assert!(session.update(Some(&arm_frame(170.0)), "BICEP_CURL").is_ok());
        assert!(session.reset(Some("JUMPING_JACK")).is_err());
    }

    #[test]
    fn test_counts_curl_reps() {
        let session = SessionAggregator::default();
        for degrees in [170.0, 170.0, 20.0, 20.0, 170.0] {
            session.update(Some(&arm_frame(degrees)), "BICEP_CURL").unwrap();
        }

        let state = session.exercise_state("BICEP_CURL").unwrap();
        assert_eq!(state.rep_count, 1);
        assert_eq!(state.stage, Stage::Down);

        let stats = session.get_stats();
        assert_eq!(stats.counters["BICEP_CURL"], 1);
        assert_eq!(stats.stages["BICEP_CURL"], Stage::Down);
        assert_eq!(stats.current_exercise.as_deref(), Some("BICEP_CURL"));
        assert_eq!(stats.frames, 5);
        assert_eq!(session.history_len(), 5);
    }

    #[test]
    fn test_only_active_counter_moves() {
        let session = SessionAggregator::default();
        for degrees in [170.0, 20.0] {
            session.update(Some(&arm_frame(degrees)), "BICEP_CURL").unwrap();
        }
        for degrees in [170.0, 20.0] {
            session.update(Some(&arm_frame(degrees)), "LATERAL_RAISE").unwrap();
        }

        let stats = session.get_stats();
        assert_eq!(stats.counters["BICEP_CURL"], 1);
        assert_eq!(stats.counters["SQUAT"], 0);
    }

    #[test]
    fn test_accuracy_from_visibility() {
        let session = SessionAggregator::default();
        let frame = LandmarkSet::new()
            .with(PoseLandmark::Nose, Landmark::new(0.5, 0.1, 0.0, 1.0))
            .with(PoseLandmark::LeftHip, Landmark::new(0.4, 0.6, 0.0, 0.5))
            .with(PoseLandmark::RightHip, Landmark::new(0.6, 0.6, 0.0, 0.0));

        session.update(Some(&frame), "PLANK").unwrap();
        assert_eq!(session.get_stats().accuracy, 50.0);

        session.update(None, "PLANK").unwrap();
        assert_eq!(session.get_stats().accuracy, 0.0);

        session.update(Some(&LandmarkSet::new()), "PLANK").unwrap();
        assert_eq!(session.get_stats().accuracy, 0.0);
    }

    #[test]
    fn test_no_detection_keeps_counters() {
        let session = SessionAggregator::default();
        session.update(Some(&arm_frame(170.0)), "BICEP_CURL").unwrap();

        let assessment = session.update(None, "BICEP_CURL").unwrap();
        assert_eq!(assessment, FormAssessment::insufficient_data());

        let state = session.exercise_state("BICEP_CURL").unwrap();
        assert_eq!(state.stage, Stage::Down);
        assert_eq!(session.history_len(), 1);

        session.update(Some(&arm_frame(20.0)), "BICEP_CURL").unwrap();
        assert_eq!(session.exercise_state("BICEP_CURL").unwrap().rep_count, 1);
    }

    #[test]
    fn test_missing_joint_is_no_data_for_that_angle() {
        let session = SessionAggregator::default();
        session.update(Some(&arm_frame(170.0)), "BICEP_CURL").unwrap();

        let mut frame = arm_frame(20.0);
        frame.remove(PoseLandmark::LeftWrist);
        let assessment = session.update(Some(&frame), "BICEP_CURL").unwrap();

        assert_eq!(assessment.feedback, "Insufficient pose data");
        let state = session.exercise_state("BICEP_CURL").unwrap();
        assert_eq!(state.stage, Stage::Down);
        assert_eq!(state.rep_count, 0);
    }

    #[test]
    fn test_rule_feedback_reaches_snapshot() {
        let session = SessionAggregator::default();
        let assessment = session.update(Some(&arm_frame(10.0)), "BICEP_CURL").unwrap();

        assert!(!assessment.form_correct);
        let stats = session.get_stats();
        assert!(!stats.form_correct);
        assert_eq!(stats.form_confidence, 40.0);
        assert_eq!(stats.feedback, "Keep elbow stable, maintain proper range of motion");
    }

    #[test]
    fn test_reset_single_exercise() {
        let session = SessionAggregator::default();
        for degrees in [170.0, 20.0] {
            session.update(Some(&arm_frame(degrees)), "BICEP_CURL").unwrap();
        }
        let before = session.get_stats();
        assert_eq!(before.counters["BICEP_CURL"], 1);

        session.reset(Some("SQUAT")).unwrap();
        let after = session.get_stats();
        assert_eq!(after.counters["SQUAT"], 0);
        assert_eq!(after.stages["SQUAT"], Stage::None);
        assert_eq!(after.counters["BICEP_CURL"], 1);
        assert_eq!(after.stages["BICEP_CURL"], Stage::Up);
        assert_eq!(after.available_exercises, before.available_exercises);

        session.reset(Some("BICEP_CURL")).unwrap();
        let after = session.get_stats();
        assert_eq!(after.counters["BICEP_CURL"], 0);
        assert_eq!(after.stages["BICEP_CURL"], Stage::None);
        assert_eq!(session.history_len(), 2);
    }

    #[test]
    fn test_reset_all_clears_history() {
        let session = SessionAggregator::default();
        for degrees in [170.0, 20.0] {
            session.update(Some(&arm_frame(degrees)), "BICEP_CURL").unwrap();
        }

        session.reset(None).unwrap();
        let stats = session.get_stats();
        assert!(stats.counters.values().all(|&c| c == 0));
        assert_eq!(stats.frames, 0);
        assert_eq!(session.history_len(), 0);
        assert!(session.recent_features().is_empty());
    }

    #[test]
    fn test_try_reset() {
        let session = SessionAggregator::default();
        session.update(Some(&arm_frame(170.0)), "BICEP_CURL").unwrap();

        assert!(session.try_reset(None, Duration::from_millis(10)).unwrap());
        assert_eq!(session.history_len(), 0);

        let _reader = session.state.read();
        assert!(!session.try_reset(None, Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn test_history_bounded() {
        let config = EngineConfig {
            history_capacity: 4,
            ..EngineConfig::default()
        };
        let session = SessionAggregator::new(config).unwrap();
        for _ in 0..10 {
            session.update(Some(&arm_frame(90.0)), "BICEP_CURL").unwrap();
        }
        assert_eq!(session.history_len(), 4);
    }

    #[test]
    fn test_process_next() {
        struct Alternating(bool);

        impl PoseProvider for Alternating {
            fn next_detection(&mut self) -> PoseDetection {
                self.0 = !self.0;
                if self.0 {
                    PoseDetection::Detected(arm_frame(170.0))
                } else {
                    PoseDetection::NoDetection
                }
            }
        }

        let session = SessionAggregator::default();
        let mut provider = Alternating(false);

        let first = session.process_next(&mut provider, "BICEP_CURL").unwrap();
        assert_ne!(first.feedback, "Insufficient pose data");
        let second = session.process_next(&mut provider, "BICEP_CURL").unwrap();
        assert_eq!(second.feedback, "Insufficient pose data");
        assert_eq!(session.get_stats().frames, 2);
    }

    #[test]
    fn test_snapshot_json() {
        let session = SessionAggregator::default();
        let json = session.get_stats().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["feedback"], "Ready");
        assert_eq!(value["counters"]["SQUAT"], 0);
        assert_eq!(value["stages"]["SQUAT"], "none");
        assert_eq!(value["available_exercises"]["PUSH_UP"], "Push Up");
    }
}
