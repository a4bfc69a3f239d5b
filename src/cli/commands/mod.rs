//! CLI command implementations.
//!
//! Each command resolves its settings from the loaded [`Config`] with the
//! command-line overrides applied on top.

pub mod config;
pub mod describe;
pub mod estimate;
pub mod plan;
pub mod prompts;

use std::path::PathBuf;

use crate::config::{Config, ConfigLoader};
use crate::pipeline::RunOptions;
use crate::prompts::PromptStore;
use crate::types::{DetailLevel, FrameError, Result, TreatmentMode};

/// Run settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    /// Source directory; falls back to the last one used
    pub source: Option<PathBuf>,
    pub mode: Option<TreatmentMode>,
    pub detail: Option<DetailLevel>,
    pub sequence_length: Option<usize>,
    pub overlap: Option<usize>,
    /// Literal prompt text
    pub prompt: Option<String>,
    /// Name of a saved prompt
    pub prompt_name: Option<String>,
}

impl RunOverrides {
    /// Source directory from the arguments or the remembered state
    pub fn resolve_source(&self) -> Result<PathBuf> {
        if let Some(source) = &self.source {
            return Ok(source.clone());
        }
        ConfigLoader::load_state().last_source.ok_or_else(|| {
            FrameError::Config(
                "No source directory given and none remembered from a previous run".to_string(),
            )
        })
    }

    /// Prompt text from `--prompt` or a saved prompt named by `--prompt-name`
    pub fn resolve_prompt(&self, config: &Config) -> Result<String> {
        if let Some(text) = &self.prompt {
            if text.trim().is_empty() {
                return Err(FrameError::Prompt("Prompt text is empty".to_string()));
            }
            return Ok(text.clone());
        }
        if let Some(name) = &self.prompt_name {
            let store = PromptStore::open(ConfigLoader::prompts_path(config)?)?;
            return Ok(store.require(name)?.to_string());
        }
        Err(FrameError::Prompt(
            "No prompt given; use --prompt or --prompt-name".to_string(),
        ))
    }

    /// Run options with overrides applied over the configured pipeline defaults
    pub fn run_options(&self, config: &Config, prompt: String) -> RunOptions {
        let pipeline = &config.pipeline;
        RunOptions {
            mode: self.mode.unwrap_or(pipeline.mode),
            detail: self.detail.unwrap_or(pipeline.detail),
            sequence_length: self.sequence_length.unwrap_or(pipeline.sequence_length),
            overlap: self.overlap.unwrap_or(pipeline.overlap),
            prompt,
        }
    }
}
