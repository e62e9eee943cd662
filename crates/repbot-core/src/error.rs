//! Error types for the RepBot engine
//!
//! Per-frame geometry problems are not errors: they travel on
//! [`JointAngle`](crate::JointAngle) as an [`AngleFault`](crate::AngleFault).
//! Only caller input and configuration problems become a `RepbotError`.

use thiserror::Error;

/// Core RepBot errors
#[derive(Error, Debug)]
pub enum RepbotError {
    // Caller errors
    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    // Collaborator errors (absorbed by the classifier, never returned from update)
    #[error("Classifier failure: {0}")]
    ClassifierFailure(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type for RepBot operations
pub type RepbotResult<T> = Result<T, RepbotError>;
