//! End-to-end session harness
//!
//! Drives a full session from synthetic rep scripts:
//! - Scripted angle sequences per exercise
//! - Optional capture noise and dropouts
//! - Strategy and rep tallies for invariant checks

use repbot_core::{CounterConfig, PoseProvider, RepbotError, RepbotResult, Stage};
use repbot_engine::{init_logging, EngineConfig, SessionAggregator, Snapshot, Strategy};
use tracing::debug;

use crate::provider::{NoiseConfig, NoisyProvider, ScriptedProvider};

// ============================================================================
// REP SCRIPTS
// ============================================================================

/// Frames held at each end of the range of motion
const HOLD_FRAMES: usize = 3;

/// Angle sequence performing `reps` clean repetitions for `config`.
///
/// Each rep holds well past both thresholds and passes through the dead
/// zone on the way. The script ends extended.
pub fn rep_script(config: &CounterConfig, reps: u32) -> Vec<f32> {
    let extended = (config.high_threshold + 180.0) / 2.0;
    let contracted = config.low_threshold / 2.0;
    let span = config.high_threshold - config.low_threshold;
    let upper = config.high_threshold - span / 3.0;
    let lower = config.low_threshold + span / 3.0;

    let mut script = Vec::new();
    for _ in 0..reps {
        script.extend(std::iter::repeat(extended).take(HOLD_FRAMES));
        script.extend([upper, lower]);
        script.extend(std::iter::repeat(contracted).take(HOLD_FRAMES));
        script.extend([lower, upper]);
    }
    script.push(extended);
    script
}

// ============================================================================
// HARNESS
// ============================================================================

/// Configuration for a harness run
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Catalog key of the exercise to perform
    pub exercise: String,
    /// Repetitions in the script
    pub reps: u32,
    /// `None` replays the script untouched
    pub noise: Option<NoiseConfig>,
    /// Seed for the noise generator
    pub seed: u64,
    /// Engine under test
    pub engine: EngineConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            exercise: "BICEP_CURL".to_string(),
            reps: 10,
            noise: Some(NoiseConfig::default()),
            seed: 42,
            engine: EngineConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Three clean curls
    pub fn minimal() -> Self {
        Self {
            reps: 3,
            noise: None,
            ..Default::default()
        }
    }

    /// Ten curls with typical capture noise
    pub fn standard() -> Self {
        Self::default()
    }

    /// Poor capture conditions
    pub fn degraded() -> Self {
        Self {
            reps: 20,
            noise: Some(NoiseConfig::poor()),
            ..Default::default()
        }
    }

    /// Drive a different exercise
    pub fn with_exercise(mut self, exercise: &str) -> Self {
        self.exercise = exercise.to_string();
        self
    }
}

/// Outcome of a harness run
#[derive(Clone, Debug)]
pub struct HarnessResult {
    /// Reps the script performs
    pub expected_reps: u32,
    /// Reps the session counted
    pub counted_reps: u32,
    /// Final stage of the driven exercise
    pub stage: Stage,
    /// Frames processed
    pub frames: u64,
    /// Frames assessed as insufficient data
    pub no_data_frames: u64,
    /// Frames assessed by rule
    pub rule_frames: u64,
    /// Frames assessed by the model
    pub model_frames: u64,
    /// Frames with incorrect form
    pub incorrect_frames: u64,
    /// Session snapshot after the last frame
    pub snapshot: Snapshot,
}

impl HarnessResult {
    /// Every scripted rep was counted
    pub fn passed(&self) -> bool {
        self.counted_reps == self.expected_reps
    }

    /// Hysteresis can lose reps to missing frames but never invent them
    pub fn never_over_counts(&self) -> bool {
        self.counted_reps <= self.expected_reps
    }
}

/// Session driven by a rep script
pub struct SessionHarness {
    config: HarnessConfig,
    counter: CounterConfig,
    session: SessionAggregator,
}

impl SessionHarness {
    /// Build a session for `config` and install its logging
    pub fn new(config: HarnessConfig) -> RepbotResult<Self> {
        let exercise = config
            .engine
            .catalog
            .get(&config.exercise)
            .ok_or_else(|| RepbotError::UnknownExercise(config.exercise.clone()))?;
        let counter = exercise.counter.ok_or_else(|| {
            RepbotError::InvalidConfig(format!("{}: no rep counter to drive", exercise.key))
        })?;
        let session = SessionAggregator::new(config.engine.clone())?;

        if init_logging(&config.engine.logging) {
            debug!(level = %config.engine.logging.level, "harness logging installed");
        }

        Ok(Self {
            config,
            counter,
            session,
        })
    }

    /// Session under test
    pub fn session(&self) -> &SessionAggregator {
        &self.session
    }

    /// Play the whole script through the session
    pub fn run(&mut self) -> RepbotResult<HarnessResult> {
        let script = rep_script(&self.counter, self.config.reps);
        let scripted = ScriptedProvider::from_angles(self.counter.angle, &script);
        let mut provider: Box<dyn PoseProvider> = match &self.config.noise {
            Some(noise) => Box::new(NoisyProvider::with_seed(scripted, noise.clone(), self.config.seed)),
            None => Box::new(scripted),
        };

        let mut result = HarnessResult {
            expected_reps: self.config.reps,
            counted_reps: 0,
            stage: Stage::None,
            frames: 0,
            no_data_frames: 0,
            rule_frames: 0,
            model_frames: 0,
            incorrect_frames: 0,
            snapshot: self.session.get_stats(),
        };

        for _ in 0..script.len() {
            let assessment = self.session.process_next(provider.as_mut(), &self.config.exercise)?;
            match assessment.strategy {
                Strategy::NoData => result.no_data_frames += 1,
                Strategy::RuleBased => result.rule_frames += 1,
                Strategy::ModelBased => result.model_frames += 1,
            }
            if !assessment.form_correct {
                result.incorrect_frames += 1;
            }
        }

        let state = self.session.exercise_state(&self.config.exercise)?;
        result.counted_reps = state.rep_count;
        result.stage = state.stage;
        result.snapshot = self.session.get_stats();
        result.frames = result.snapshot.frames;

        debug!(
            exercise = %self.config.exercise,
            expected = result.expected_reps,
            counted = result.counted_reps,
            no_data = result.no_data_frames,
            "harness run finished"
        );
        Ok(result)
    }
}

// ============================================================================
// TESTS
// ============================================================================
