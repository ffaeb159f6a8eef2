//! Engine configuration, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::oracle::{OracleConfig, TypeHierarchy, TypeOracle};
use crate::{RecastError, Result};

/// How rules that match the same node are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TieBreak {
    /// First-registered rule wins
    #[default]
    RegistrationOrder,
    /// Higher priority first; registration order among equal priorities
    Priority,
}

/// Rewrite engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on fixpoint passes
    pub max_passes: usize,
    /// Upper bound on successive rewrites at one tree position within a pass
    pub max_rewrites_per_node: usize,
    pub tie_break: TieBreak,
    /// Keep evaluating later rules after a winner to report ambiguous matches
    pub detect_ambiguity: bool,
    /// Depth of the anti-recursion callee walk
    pub recursion_depth: usize,
    /// Worker threads for batch rewriting
    pub workers: usize,
    pub oracle: OracleConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_passes: 10,
            max_rewrites_per_node: 16,
            tie_break: TieBreak::RegistrationOrder,
            detect_ambiguity: false,
            recursion_depth: 2,
            workers: 4,
            oracle: OracleConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_passes == 0 {
            return Err(RecastError::Config("max_passes must be at least 1".into()));
        }
        if self.max_rewrites_per_node == 0 {
            return Err(RecastError::Config(
                "max_rewrites_per_node must be at least 1".into(),
            ));
        }
        if self.workers == 0 {
            return Err(RecastError::Config("workers must be at least 1".into()));
        }
        if !(1..=4).contains(&self.recursion_depth) {
            return Err(RecastError::Config(format!(
                "recursion_depth must be between 1 and 4, got {}",
                self.recursion_depth
            )));
        }
        Ok(())
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_ambiguity_detection(mut self, enabled: bool) -> Self {
        self.detect_ambiguity = enabled;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Build an oracle over `hierarchy` using the configured family roots
    pub fn build_oracle(&self, hierarchy: TypeHierarchy) -> TypeOracle {
        TypeOracle::new(hierarchy, &self.oracle)
    }
}
