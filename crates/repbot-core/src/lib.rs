//! RepBot Core - Fundamental types for exercise analysis
//!
//! This crate defines the per-frame data model shared by the engine:
//! - Landmarks and the pose provider capability
//! - Joint angles and their fault kinds
//! - Feature vectors and the rolling frame history
//! - The declarative exercise catalog
//! - Error types

pub mod angle;
pub mod error;
pub mod exercise;
pub mod features;
pub mod history;
pub mod landmark;

pub use angle::*;
pub use error::*;
pub use exercise::*;
pub use features::*;
pub use history::*;
pub use landmark::*;
