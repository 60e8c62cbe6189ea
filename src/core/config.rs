/// Engine configuration loaded from RON.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::expr::{Evaluator, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LEN};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Runtime limits and the entry point for a session.
///
/// Every field has a default, so a config file only needs the values it
/// overrides:
///
/// ```ron
/// (
///     entry: "start",
///     max_auto_steps: 64,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Step a session starts at.
    pub entry: String,
    /// Consecutive steps a session may pass through without player input.
    pub max_auto_steps: usize,
    pub max_expr_len: usize,
    pub max_expr_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entry: "start".to_string(),
            max_auto_steps: 256,
            max_expr_len: DEFAULT_MAX_LEN,
            max_expr_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Load a config from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a config from a RON string.
    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    /// Expression evaluator bounded by this config's limits.
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.max_expr_len, self.max_expr_depth)
    }
}
