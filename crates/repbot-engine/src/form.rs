//! Form classification
//!
//! Two strategies:
//! - Rule-based: tolerance band from the exercise catalog, always available
//! - Model-based: an injected trained classifier plus its feature scaler
//!
//! The model is tried first when both collaborators are installed. Any
//! failure on that path is logged and the same frame is classified by rule.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use repbot_core::{AngleId, AngleSet, ExerciseDef, FeatureVector, RepbotError, RepbotResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::feedback::{DeterministicFeedback, FeedbackSelector};

/// Error type returned by external collaborators
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Angles fed to the trained classifier, in order
pub const MODEL_INPUT_ANGLES: [AngleId; 2] = [AngleId::LeftElbow, AngleId::LeftKnee];

/// Feedback when a frame cannot be assessed
pub const INSUFFICIENT_DATA_FEEDBACK: &str = "Insufficient pose data";
/// Feedback for a rule-based pass
pub const RULE_CORRECT_FEEDBACK: &str = "Correct Form";
/// Feedback for a model-based pass
pub const MODEL_CORRECT_FEEDBACK: &str = "Correct Form - Keep it up!";
/// Fallback tip when an exercise has none
pub const GENERIC_TIP: &str = "Focus on proper form and control";

const RULE_CORRECT_CONFIDENCE: f32 = 85.0;

/// Pre-trained binary form classifier (label 1 = correct form)
pub trait TrainedFormClassifier: Send + Sync {
    fn predict(&self, features: [f32; 2]) -> Result<u8, CollaboratorError>;
    fn predict_proba(&self, features: [f32; 2]) -> Result<Vec<f32>, CollaboratorError>;
}

/// Scaler the classifier was trained behind
pub trait FeatureScaler: Send + Sync {
    fn transform(&self, raw: [f32; 2]) -> Result<Vec<f32>, CollaboratorError>;
}

/// Which path produced an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    RuleBased,
    ModelBased,
    NoData,
}

/// Per-frame form verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormAssessment {
    /// Verdict for this frame
    pub form_correct: bool,
    /// Percent, `[0, 100]`
    pub confidence: f32,
    /// Message shown to the user
    pub feedback: String,
    /// `confidence / 100`
    pub score: f32,
    /// Path that produced the verdict
    pub strategy: Strategy,
}

impl FormAssessment {
    /// Build an assessment; confidence is clamped to `[0, 100]`
    pub fn new(form_correct: bool, confidence: f32, feedback: impl Into<String>, strategy: Strategy) -> Self {
        let confidence = confidence.clamp(0.0, 100.0);
        Self {
            form_correct,
            confidence,
            feedback: feedback.into(),
            score: confidence / 100.0,
            strategy,
        }
    }

    /// The "no usable pose" verdict
    pub fn insufficient_data() -> Self {
        Self::new(false, 0.0, INSUFFICIENT_DATA_FEEDBACK, Strategy::NoData)
    }
}

/// Form classifier with an optional trained model
pub struct FormClassifier {
    model: Option<Arc<dyn TrainedFormClassifier>>,
    scaler: Option<Arc<dyn FeatureScaler>>,
    feedback: Box<dyn FeedbackSelector>,
}

impl FormClassifier {
    /// Rule-based only, deterministic feedback
    pub fn new() -> Self {
        Self {
            model: None,
            scaler: None,
            feedback: Box::new(DeterministicFeedback),
        }
    }

    /// Install a trained classifier and its scaler
    pub fn with_model(
        mut self,
        model: Arc<dyn TrainedFormClassifier>,
        scaler: Arc<dyn FeatureScaler>,
    ) -> Self {
        self.set_model(Some(model), Some(scaler));
        self
    }

    /// Replace the tip selector
    pub fn with_feedback(mut self, feedback: Box<dyn FeedbackSelector>) -> Self {
        self.feedback = feedback;
        self
    }

    /// Install or remove collaborators; the model is used only when both are present
    pub fn set_model(
        &mut self,
        model: Option<Arc<dyn TrainedFormClassifier>>,
        scaler: Option<Arc<dyn FeatureScaler>>,
    ) {
        self.model = model;
        self.scaler = scaler;
    }

    /// Whether both collaborators are installed
    pub fn has_model(&self) -> bool {
        self.model.is_some() && self.scaler.is_some()
    }

    /// Assess one frame from its feature vector alone. Never fails.
    ///
    /// The angle block is trusted as-is; use [`analyze_frame`](Self::analyze_frame)
    /// when the per-angle faults are known.
    pub fn analyze(
        &mut self,
        features: Option<&FeatureVector>,
        exercise: &ExerciseDef,
        rep_count: u32,
    ) -> FormAssessment {
        let Some(features) = features.filter(|f| f.angles().is_some()) else {
            return FormAssessment::insufficient_data();
        };
        self.assess(features, None, exercise, rep_count)
    }

    /// Assess one frame, keeping faulted angles away from the model.
    ///
    /// A faulted model input sends the frame to the rule table.
    pub fn analyze_frame(
        &mut self,
        features: &FeatureVector,
        angles: &AngleSet,
        exercise: &ExerciseDef,
        rep_count: u32,
    ) -> FormAssessment {
        if features.angles().is_none() {
            return FormAssessment::insufficient_data();
        }
        self.assess(features, Some(angles), exercise, rep_count)
    }

    fn assess(
        &mut self,
        features: &FeatureVector,
        angles: Option<&AngleSet>,
        exercise: &ExerciseDef,
        rep_count: u32,
    ) -> FormAssessment {
        if self.has_model() {
            // Collaborators are opaque; a panic counts as a model failure
            let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
                self.model_assessment(features, angles, exercise, rep_count)
            }))
            .unwrap_or_else(|_| Err(failure("collaborator panicked")));

            match attempt {
                Ok(assessment) => return assessment,
                Err(e) => warn!(exercise = %exercise.key, error = %e, "falling back to rule-based form check"),
            }
        }

        Self::rule_assessment(features, exercise)
    }

    /// Tolerance-band check from the catalog
    pub fn rule_assessment(features: &FeatureVector, exercise: &ExerciseDef) -> FormAssessment {
        let Some(rule) = &exercise.form_rule else {
            return FormAssessment::new(true, RULE_CORRECT_CONFIDENCE, RULE_CORRECT_FEEDBACK, Strategy::RuleBased);
        };
        let Some(degrees) = features.angle(rule.angle) else {
            return FormAssessment::insufficient_data();
        };

        if rule.is_satisfied(degrees) {
            FormAssessment::new(true, RULE_CORRECT_CONFIDENCE, RULE_CORRECT_FEEDBACK, Strategy::RuleBased)
        } else {
            FormAssessment::new(
                false,
                rule.violation_confidence,
                rule.violation_feedback.clone(),
                Strategy::RuleBased,
            )
        }
    }

    fn model_assessment(
        &mut self,
        features: &FeatureVector,
        angles: Option<&AngleSet>,
        exercise: &ExerciseDef,
        rep_count: u32,
    ) -> RepbotResult<FormAssessment> {
        let (form_correct, confidence) = self.predict(features, angles)?;
        debug!(exercise = %exercise.key, form_correct, confidence, "model prediction");

        let feedback = if form_correct {
            MODEL_CORRECT_FEEDBACK.to_string()
        } else {
            self.feedback
                .select(&exercise.key, rep_count, &exercise.tips)
                .unwrap_or(GENERIC_TIP)
                .to_string()
        };

        Ok(FormAssessment::new(form_correct, confidence, feedback, Strategy::ModelBased))
    }

    /// `(form_correct, confidence)` from the collaborators, validating their output
    fn predict(&self, features: &FeatureVector, angles: Option<&AngleSet>) -> RepbotResult<(bool, f32)> {
        let (Some(model), Some(scaler)) = (&self.model, &self.scaler) else {
            return Err(failure("model or scaler not installed"));
        };

        if let Some(angles) = angles {
            for id in MODEL_INPUT_ANGLES {
                if let Some(fault) = angles.get(id).fault() {
                    return Err(failure(format!("model input {id:?} unavailable: {fault}")));
                }
            }
        }

        let mut raw = [0.0f32; 2];
        for (slot, id) in raw.iter_mut().zip(MODEL_INPUT_ANGLES) {
            *slot = features.angle(id).ok_or_else(|| failure("feature vector too short"))?;
        }

        let scaled = scaler
            .transform(raw)
            .map_err(|e| failure(format!("scaler error: {e}")))?;
        let scaled: [f32; 2] = scaled
            .as_slice()
            .try_into()
            .map_err(|_| failure(format!("scaler returned {} values, expected 2", scaled.len())))?;
        if !scaled.iter().all(|v| v.is_finite()) {
            return Err(failure("scaler returned non-finite values"));
        }

        let label = model
            .predict(scaled)
            .map_err(|e| failure(format!("predict error: {e}")))?;
        if label > 1 {
            return Err(failure(format!("unexpected label {label}")));
        }

        let proba = model
            .predict_proba(scaled)
            .map_err(|e| failure(format!("predict_proba error: {e}")))?;
        if proba.len() != 2 || !proba.iter().all(|p| p.is_finite() && (0.0..=1.0).contains(p)) {
            return Err(failure(format!("malformed probabilities {proba:?}")));
        }

        Ok((label == 1, proba[label as usize] * 100.0))
    }
}

impl Default for FormClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn failure(msg: impl Into<String>) -> RepbotError {
    RepbotError::ClassifierFailure(msg.into())
}
