//! Stand-in form model collaborators
//!
//! Reference implementations of the trained classifier and scaler
//! interfaces, plus deliberately broken ones for fallback tests.

use std::sync::atomic::{AtomicU64, Ordering};

use repbot_engine::{CollaboratorError, FeatureScaler, TrainedFormClassifier};
use thiserror::Error;

/// Errors raised by the stand-in collaborators
#[derive(Error, Debug)]
pub enum StandInError {
    #[error("model artifact not loaded")]
    NotLoaded,

    #[error("scaler range is empty for feature {0}")]
    EmptyRange(usize),
}

/// Min-max scaling to `[0, 1]` per feature, as fitted offline
#[derive(Clone, Debug)]
pub struct MinMaxScaler {
    /// Per-feature minimum seen at fit time
    pub min: [f32; 2],
    /// Per-feature maximum seen at fit time
    pub max: [f32; 2],
}

impl MinMaxScaler {
    /// Both features are angles in degrees
    pub fn degrees() -> Self {
        Self {
            min: [0.0, 0.0],
            max: [180.0, 180.0],
        }
    }
}

impl FeatureScaler for MinMaxScaler {
    fn transform(&self, raw: [f32; 2]) -> Result<Vec<f32>, CollaboratorError> {
        let mut scaled = Vec::with_capacity(2);
        for i in 0..2 {
            let range = self.max[i] - self.min[i];
            if range <= 0.0 {
                return Err(Box::new(StandInError::EmptyRange(i)));
            }
            scaled.push((raw[i] - self.min[i]) / range);
        }
        Ok(scaled)
    }
}

/// Labels a frame correct when the scaled first feature sits inside a band.
///
/// Probability grows with distance from the nearest band edge.
#[derive(Clone, Debug)]
pub struct BandModel {
    /// Lower band edge, scaled units
    pub low: f32,
    /// Upper band edge, scaled units
    pub high: f32,
}

impl BandModel {
    /// Bicep curl band (30-160 degrees) in min-max scaled units
    pub fn bicep_curl() -> Self {
        Self {
            low: 30.0 / 180.0,
            high: 160.0 / 180.0,
        }
    }

    fn p_correct(&self, x: f32) -> f32 {
        let margin = (x - self.low).min(self.high - x);
        (0.5 + margin * 2.0).clamp(0.0, 1.0)
    }
}

impl TrainedFormClassifier for BandModel {
    fn predict(&self, features: [f32; 2]) -> Result<u8, CollaboratorError> {
        Ok(u8::from(self.p_correct(features[0]) > 0.5))
    }

    fn predict_proba(&self, features: [f32; 2]) -> Result<Vec<f32>, CollaboratorError> {
        let p = self.p_correct(features[0]);
        Ok(vec![1.0 - p, p])
    }
}

/// Always errors, counting how often it was asked
#[derive(Debug, Default)]
pub struct FailingModel {
    calls: AtomicU64,
}

impl FailingModel {
    /// Number of predict calls so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl TrainedFormClassifier for FailingModel {
    fn predict(&self, _features: [f32; 2]) -> Result<u8, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(Box::new(StandInError::NotLoaded))
    }

    fn predict_proba(&self, _features: [f32; 2]) -> Result<Vec<f32>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(Box::new(StandInError::NotLoaded))
    }
}

/// Returns a probability vector of the wrong shape
#[derive(Clone, Debug, Default)]
pub struct MalformedModel;

impl TrainedFormClassifier for MalformedModel {
    fn predict(&self, _features: [f32; 2]) -> Result<u8, CollaboratorError> {
        Ok(1)
    }

    fn predict_proba(&self, _features: [f32; 2]) -> Result<Vec<f32>, CollaboratorError> {
        Ok(vec![0.2, 0.3, 0.5])
    }
}

/// Panics on every call, like a corrupted model artifact
#[derive(Clone, Debug, Default)]
pub struct PanickingModel;

impl TrainedFormClassifier for PanickingModel {
    fn predict(&self, _features: [f32; 2]) -> Result<u8, CollaboratorError> {
        panic!("model artifact corrupted")
    }

    fn predict_proba(&self, _features: [f32; 2]) -> Result<Vec<f32>, CollaboratorError> {
        panic!("model artifact corrupted")
    }
}
