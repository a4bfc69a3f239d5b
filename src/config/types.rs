//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/framescribe/) and project (.framescribe/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::planning;
use crate::export::ExportFormat;
use crate::oracle::OracleConfig;
use crate::types::{DetailLevel, FrameError, Result, TreatmentMode};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Captioning oracle settings
    pub oracle: OracleConfig,

    /// Run defaults
    pub pipeline: PipelineConfig,

    /// Result export settings
    pub export: ExportConfig,

    /// Prompt store settings
    pub prompts: PromptsConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `FrameError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.oracle.temperature) {
            return Err(FrameError::Config(format!(
                "Oracle temperature must be between 0.0 and 2.0, got {}",
                self.oracle.temperature
            )));
        }

        if self.oracle.timeout_secs == 0 {
            return Err(FrameError::Config(
                "Oracle timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.oracle.max_tokens == 0 {
            return Err(FrameError::Config(
                "Oracle max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.sequence_length == 0 {
            return Err(FrameError::Config(
                "Pipeline sequence_length must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: TreatmentMode,

    pub detail: DetailLevel,

    /// Images per window in sequential mode
    pub sequence_length: usize,

    /// Images shared by consecutive windows
    pub overlap: usize,

    /// Where composites are written (defaults to `<source>/composites`)
    pub composite_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: TreatmentMode::Independent,
            detail: DetailLevel::Low,
            sequence_length: planning::DEFAULT_SEQUENCE_LENGTH,
            overlap: planning::DEFAULT_OVERLAP,
            composite_dir: None,
        }
    }
}

// =============================================================================
// Export Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,

    /// Directory export files are written to
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            output_dir: PathBuf::from("."),
        }
    }
}

// =============================================================================
// Prompt Store Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Prompt file (defaults to `prompts.toml` in the global config directory)
    pub file: Option<PathBuf>,
}
