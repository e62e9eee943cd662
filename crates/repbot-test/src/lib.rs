//! RepBot Test Harness - Frame simulation and end-to-end validation
//!
//! This crate provides:
//! - Synthetic 33-landmark body poses with chosen joint angles
//! - Scripted and noisy pose providers
//! - Stand-in trained classifier and scaler collaborators
//! - A session harness driving whole workouts

pub mod body;
pub mod collaborators;
pub mod integration;
pub mod provider;

pub use body::*;
pub use collaborators::*;
pub use integration::*;
pub use provider::*;
