//! Engine configuration
//!
//! Stored as camelCase JSON. Every field has a default, so a partial file
//! (or no file at all) is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{canvas, catalog, execution};
use crate::error::{Result, WorkflowError};

/// Simulated execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutionConfig {
    /// Chance that a node succeeds, in [0, 1]
    pub success_probability: f64,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    /// Success-rate points lost per failed node
    pub failure_penalty: f64,
    /// Finished runs kept on the store
    pub max_history: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            success_probability: execution::SUCCESS_PROBABILITY,
            min_duration_ms: execution::MIN_DURATION_MS,
            max_duration_ms: execution::MAX_DURATION_MS,
            failure_penalty: execution::FAILURE_PENALTY,
            max_history: execution::MAX_HISTORY,
        }
    }
}

/// Canvas zoom bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_zoom: canvas::MIN_ZOOM,
            max_zoom: canvas::MAX_ZOOM,
            zoom_step: canvas::ZOOM_STEP,
        }
    }
}

/// Tool browser settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogConfig {
    /// Maximum tools shown for a search
    pub max_results: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_results: catalog::MAX_RESULTS,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub execution: ExecutionConfig,
    pub canvas: CanvasConfig,
    pub catalog: CatalogConfig,
}

impl EngineConfig {
    /// Load configuration from a JSON file
    ///
    /// A missing file yields the defaults.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !fs::try_exists(path).await? {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Save configuration as pretty JSON, creating parent directories
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check that the values are usable
    pub fn validate(&self) -> Result<()> {
        let e = &self.execution;
        if !(0.0..=1.0).contains(&e.success_probability) {
            return Err(WorkflowError::Config(format!(
                "successProbability must be within [0, 1], got {}",
                e.success_probability
            )));
        }
        if e.min_duration_ms > e.max_duration_ms {
            return Err(WorkflowError::Config(format!(
                "minDurationMs ({}) exceeds maxDurationMs ({})",
                e.min_duration_ms, e.max_duration_ms
            )));
        }
        if e.failure_penalty < 0.0 {
            return Err(WorkflowError::Config(
                "failurePenalty must not be negative".to_string(),
            ));
        }

        let c = &self.canvas;
        if c.min_zoom <= 0.0 || c.min_zoom > c.max_zoom {
            return Err(WorkflowError::Config(format!(
                "zoom bounds must satisfy 0 < minZoom <= maxZoom, got {}..{}",
                c.min_zoom, c.max_zoom
            )));
        }
        if c.zoom_step <= 0.0 {
            return Err(WorkflowError::Config(
                "zoomStep must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
