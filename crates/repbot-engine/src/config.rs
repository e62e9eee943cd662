//! Engine configuration

use repbot_core::{ExerciseCatalog, RepbotError, RepbotResult, HISTORY_CAPACITY};
use serde::{Deserialize, Serialize};

use crate::logging::LoggingConfig;

/// Engine configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frames kept in the rolling feature history
    pub history_capacity: usize,
    /// Known exercises with their thresholds
    pub catalog: ExerciseCatalog,
    /// Subscriber settings; the host passes them to [`init_logging`](crate::init_logging)
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            history_capacity: HISTORY_CAPACITY,
            catalog: ExerciseCatalog::standard(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Only exercises that are rep-counted (curl, squat, lateral raise)
    pub fn strength_only() -> Self {
        EngineConfig {
            catalog: ExerciseCatalog::strength_only(),
            ..EngineConfig::default()
        }
    }

    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json(json: &str) -> RepbotResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check capacity and catalog consistency
    pub fn validate(&self) -> RepbotResult<()> {
        if self.history_capacity == 0 {
            return Err(RepbotError::InvalidConfig(
                "history capacity must be at least 1".into(),
            ));
        }
        self.catalog.validate()
    }
}
