//! Engine configuration, loaded once at startup.
//!
//! Configuration is plain JSON. Every field has a default, so an empty object
//! is a valid configuration:
//!
//! ```
//! use ember_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "actor_capacity": 100, "seed": 7 }"#).unwrap();
//! assert_eq!(config.actor_capacity, 100);
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.log_filter, "info");
//! ```

use std::path::Path;

use ember_core::strand::DEFAULT_STACK_WORDS;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Largest actor pool the engine will create.
pub const MAX_ACTOR_CAPACITY: usize = 1 << 20;

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Requested actor pool size. Rounded up to a power of two, minimum 32.
    pub actor_capacity: usize,
    /// Stack size, in machine words, of the fiber that sequences stages.
    pub director_stack_words: usize,
    /// Seed for the per-stage random number generators.
    pub seed: u64,
    /// `tracing` filter directive used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            actor_capacity: 256,
            director_stack_words: DEFAULT_STACK_WORDS,
            seed: 0,
            log_filter: "info".to_owned(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    /// Check the values against the engine's limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.actor_capacity > MAX_ACTOR_CAPACITY {
            return Err(ConfigError::Invalid {
                field: "actor_capacity",
                reason: format!("{} exceeds the maximum of {MAX_ACTOR_CAPACITY}", self.actor_capacity),
            });
        }
        if self.director_stack_words == 0 {
            return Err(ConfigError::Invalid {
                field: "director_stack_words",
                reason: "must be positive".to_owned(),
            });
        }
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.log_filter) {
            return Err(ConfigError::Invalid {
                field: "log_filter",
                reason: e.to_string(),
            });
        }
        Ok(())
    }
}
