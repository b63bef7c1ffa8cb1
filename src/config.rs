use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::materials::MaterialConfig;
use crate::orchestrator::{CheckpointTable, EngineSettings};
use crate::stages::{GenerationTable, StageConfig};
use crate::style::StyleWeights;

/// Environment variable that overrides the checkpoint layout
pub const CHECKPOINTS_ENV: &str = "DRAFTLINE_CHECKPOINTS";

/// Pipeline configuration, loaded from a JSON file
///
/// Every field has a default, so an empty object is a valid file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stages that wait for the author: `"standard"`, `"extended"` or a list
    pub checkpoints: CheckpointTable,
    /// Limit on each backend call, in seconds
    pub backend_timeout_secs: u64,
    pub materials: MaterialConfig,
    pub style: StyleWeights,
    /// Sampling settings per model-backed stage
    pub stages: GenerationTable,
    /// Characters of the final article given to the illustration stage
    pub illustration_excerpt_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            checkpoints: CheckpointTable::standard(),
            backend_timeout_secs: 120,
            materials: MaterialConfig::default(),
            style: StyleWeights::default(),
            stages: GenerationTable::default(),
            illustration_excerpt_chars: 2000,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load from `path` if given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_checkpoint_override(std::env::var(CHECKPOINTS_ENV).ok().as_deref())?;
        Ok(config)
    }

    /// Replace the checkpoint layout with a named one
    pub fn apply_checkpoint_override(&mut self, layout: Option<&str>) -> Result<()> {
        let Some(layout) = layout.filter(|l| !l.trim().is_empty()) else {
            return Ok(());
        };
        self.checkpoints = layout
            .parse()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Invalid {}", CHECKPOINTS_ENV))?;
        info!("Checkpoint layout {} from {}", self.checkpoints, CHECKPOINTS_ENV);
        Ok(())
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// Build the orchestrator settings, compiling the material denylist
    pub fn engine_settings(&self) -> Result<EngineSettings> {
        let mut stages = StageConfig::new(
            self.stages.clone(),
            self.materials.clone(),
            self.style.clone(),
        )
        .context("Invalid material noise pattern")?;
        stages.illustration_excerpt_chars = self.illustration_excerpt_chars;

        Ok(EngineSettings {
            checkpoints: self.checkpoints.clone(),
            backend_timeout: self.backend_timeout(),
            stages,
        })
    }
}
