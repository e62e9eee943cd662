//! RepBot Engine - rep counting and form analysis
//!
//! This crate turns landmark frames into session statistics:
//! - Hysteresis rep counters, one per exercise
//! - Form classification (rule table, optional trained model)
//! - Coaching tip selection
//! - The session aggregator with its consistent snapshots
//! - Engine configuration and logging bootstrap

pub mod config;
pub mod counter;
pub mod feedback;
pub mod form;
pub mod logging;
pub mod session;

pub use config::*;
pub use counter::*;
pub use feedback::*;
pub use form::*;
pub use logging::*;
pub use session::*;
