//! Exercise catalog - one declarative table for counting and form rules
//!
//! Every threshold the engine uses lives here: rep counter hysteresis bands,
//! form tolerance bands and feedback text. Nothing else hard-codes an angle.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AngleId, RepbotError, RepbotResult};

/// Phase of a repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    None,
    Up,
    Down,
}

impl Stage {
    /// The opposite phase; `None` has no opposite
    pub fn opposite(self) -> Stage {
        match self {
            Stage::Up => Stage::Down,
            Stage::Down => Stage::Up,
            Stage::None => Stage::None,
        }
    }

    /// Lowercase stage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::None => "none",
            Stage::Up => "up",
            Stage::Down => "down",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hysteresis band for one exercise's rep counter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Angle driving the counter
    pub angle: AngleId,
    /// Degrees above which the counter arms
    pub high_threshold: f32,
    /// Degrees below which an armed counter completes a rep
    pub low_threshold: f32,
    /// Stage entered when a rep completes
    pub counts_on: Stage,
}

impl CounterConfig {
    /// Counter on `angle` with the given thresholds
    pub fn new(angle: AngleId, high_threshold: f32, low_threshold: f32, counts_on: Stage) -> Self {
        Self {
            angle,
            high_threshold,
            low_threshold,
            counts_on,
        }
    }

    /// Stage entered above the high threshold
    pub fn extended(&self) -> Stage {
        self.counts_on.opposite()
    }

    fn validate(&self, key: &str) -> RepbotResult<()> {
        if self.counts_on == Stage::None {
            return Err(RepbotError::InvalidConfig(format!(
                "{key}: counter must count on up or down"
            )));
        }
        if !(self.low_threshold < self.high_threshold) {
            return Err(RepbotError::InvalidConfig(format!(
                "{key}: low threshold {} must be below high threshold {}",
                self.low_threshold, self.high_threshold
            )));
        }
        Ok(())
    }
}

/// Tolerance band for rule-based form checks (bounds are exclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRule {
    /// Angle the band applies to
    pub angle: AngleId,
    #[serde(default)]
    pub min: Option<f32>,
    #[serde(default)]
    pub max: Option<f32>,
    /// Confidence reported when the angle is outside the band
    pub violation_confidence: f32,
    /// Corrective message when the angle is outside the band
    pub violation_feedback: String,
}

impl FormRule {
    /// Whether `degrees` lies strictly inside the band
    pub fn is_satisfied(&self, degrees: f32) -> bool {
        self.min.map_or(true, |min| degrees > min) && self.max.map_or(true, |max| degrees < max)
    }

    fn validate(&self, key: &str) -> RepbotResult<()> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if !(min < max) {
                return Err(RepbotError::InvalidConfig(format!(
                    "{key}: form band min {min} must be below max {max}"
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.violation_confidence) {
            return Err(RepbotError::InvalidConfig(format!(
                "{key}: violation confidence must be within [0, 100]"
            )));
        }
        Ok(())
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDef {
    /// Catalog key, e.g. `BICEP_CURL`
    pub key: String,
    /// Human-readable name
    pub display_name: String,
    #[serde(default)]
    pub counter: Option<CounterConfig>,
    #[serde(default)]
    pub form_rule: Option<FormRule>,
    /// Coaching tips shown when the form is off
    #[serde(default)]
    pub tips: Vec<String>,
}

impl ExerciseDef {
    /// Exercise with no counter, rule or tips
    pub fn new(key: &str, display_name: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            counter: None,
            form_rule: None,
            tips: Vec::new(),
        }
    }

    /// Attach a rep counter
    pub fn with_counter(mut self, counter: CounterConfig) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Attach a form tolerance band
    pub fn with_rule(
        mut self,
        angle: AngleId,
        min: Option<f32>,
        max: Option<f32>,
        violation_confidence: f32,
        violation_feedback: &str,
    ) -> Self {
        self.form_rule = Some(FormRule {
            angle,
            min,
            max,
            violation_confidence,
            violation_feedback: violation_feedback.to_string(),
        });
        self
    }

    /// Replace the coaching tips
    pub fn with_tips(mut self, tips: &[&str]) -> Self {
        self.tips = tips.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Ordered set of known exercises
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseCatalog {
    exercises: Vec<ExerciseDef>,
}

impl ExerciseCatalog {
    /// Validated catalog from `exercises`
    pub fn new(exercises: Vec<ExerciseDef>) -> RepbotResult<Self> {
        let catalog = Self { exercises };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The ten exercises offered by the coaching app
    pub fn standard() -> Self {
        use AngleId::*;
        let exercises = vec![
            ExerciseDef::new("BICEP_CURL", "Bicep Curl")
                .with_counter(CounterConfig::new(LeftElbow, 160.0, 30.0, Stage::Up))
                .with_rule(
                    LeftElbow,
                    Some(30.0),
                    Some(160.0),
                    40.0,
                    "Keep elbow stable, maintain proper range of motion",
                )
                .with_tips(&[
                    "Keep your elbow close to your body",
                    "Control the weight, don't swing",
                    "Full range of motion - extend and contract fully",
                ]),
            ExerciseDef::new("SQUAT", "Squat")
                .with_counter(CounterConfig::new(LeftKnee, 160.0, 90.0, Stage::Down))
                .with_rule(
                    LeftKnee,
                    Some(90.0),
                    Some(160.0),
                    45.0,
                    "Go deeper, thighs should be parallel to ground",
                )
                .with_tips(&[
                    "Keep your back straight",
                    "Go deeper - thighs parallel to ground",
                    "Push through your heels when standing",
                ]),
            ExerciseDef::new("PUSH_UP", "Push Up").with_tips(&[
                "Keep your body in a straight line",
                "Lower your chest to the ground",
                "Push up with control",
            ]),
            ExerciseDef::new("LUNGE", "Lunge"),
            ExerciseDef::new("PLANK", "Plank"),
            ExerciseDef::new("DEADLIFT", "Deadlift"),
            ExerciseDef::new("SHOULDER_PRESS", "Shoulder Press"),
            ExerciseDef::new("LATERAL_RAISE", "Lateral Raise")
                .with_counter(CounterConfig::new(LateralRaise, 160.0, 30.0, Stage::Up))
                .with_rule(
                    LateralRaise,
                    None,
                    Some(90.0),
                    45.0,
                    "Raise arms with control, stop at shoulder height",
                )
                .with_tips(&[
                    "Lead with your elbows",
                    "Stop at shoulder height",
                    "Lower slowly, don't drop the weight",
                ]),
            ExerciseDef::new("CRUNCH", "Crunch"),
            ExerciseDef::new("BURPEE", "Burpee"),
        ];
        Self { exercises }
    }

    /// Only the exercises with a rep counter
    pub fn strength_only() -> Self {
        let exercises = Self::standard()
            .exercises
            .into_iter()
            .filter(|e| e.counter.is_some())
            .collect();
        Self { exercises }
    }

    /// Exercise by key
    pub fn get(&self, key: &str) -> Option<&ExerciseDef> {
        self.exercises.iter().find(|e| e.key == key)
    }

    /// Whether `key` is in the catalog
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Catalog position of `key`
    pub fn position(&self, key: &str) -> Option<usize> {
        self.exercises.iter().position(|e| e.key == key)
    }

    /// Exercise at catalog position `idx`
    pub fn get_index(&self, idx: usize) -> Option<&ExerciseDef> {
        self.exercises.get(idx)
    }

    /// Exercises in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &ExerciseDef> {
        self.exercises.iter()
    }

    /// Keys in catalog order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.exercises.iter().map(|e| e.key.as_str())
    }

    /// Number of exercises
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Reject empty catalogs, duplicate keys and inconsistent thresholds
    pub fn validate(&self) -> RepbotResult<()> {
        if self.exercises.is_empty() {
            return Err(RepbotError::InvalidConfig("exercise catalog is empty".into()));
        }

        let mut seen = HashSet::new();
        for exercise in &self.exercises {
            if !seen.insert(exercise.key.as_str()) {
                return Err(RepbotError::InvalidConfig(format!(
                    "duplicate exercise key {}",
                    exercise.key
                )));
            }
            if let Some(counter) = &exercise.counter {
                counter.validate(&exercise.key)?;
            }
            if let Some(rule) = &exercise.form_rule {
                rule.validate(&exercise.key)?;
            }
        }
        Ok(())
    }
}

impl Default for ExerciseCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
