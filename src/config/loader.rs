//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/framescribe/config.toml)
//! 3. Project config (.framescribe/config.toml)
//! 4. Legacy `OPENAI_MODEL` / `OPENAI_MAX_TOKENS`
//! 5. Environment variables (FRAMESCRIBE_* prefix, `__` between keys)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde_json::{Map, Value, json};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::state::LastState;
use super::types::Config;
use crate::types::{FrameError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → legacy env → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Merge global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        // Merge project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        figment = figment.merge(Serialized::defaults(Self::legacy_overrides(
            env::var("OPENAI_MODEL").ok(),
            env::var("OPENAI_MAX_TOKENS").ok(),
        )));

        // e.g. FRAMESCRIBE_ORACLE__MAX_TOKENS -> oracle.max_tokens
        figment = figment.merge(Env::prefixed("FRAMESCRIBE_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| FrameError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| FrameError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides from the environment variables earlier releases read directly.
    /// An unparsable max tokens value is ignored with a warning.
    fn legacy_overrides(model: Option<String>, max_tokens: Option<String>) -> Value {
        let mut oracle = Map::new();

        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            oracle.insert("model".to_string(), json!(model.trim()));
        }

        if let Some(raw) = max_tokens {
            match raw.trim().parse::<u32>() {
                Ok(value) if value > 0 => {
                    oracle.insert("max_tokens".to_string(), json!(value));
                }
                _ => warn!(
                    "Invalid OPENAI_MAX_TOKENS value '{}', keeping configured max_tokens",
                    raw
                ),
            }
        }

        if oracle.is_empty() {
            json!({})
        } else {
            json!({ "oracle": oracle })
        }
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/framescribe/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("framescribe"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".framescribe")
    }

    /// Prompt file configured in `config`, or the global default
    pub fn prompts_path(config: &Config) -> Result<PathBuf> {
        if let Some(file) = &config.prompts.file {
            return Ok(file.clone());
        }
        Self::global_dir()
            .map(|dir| dir.join("prompts.toml"))
            .ok_or_else(|| FrameError::Config("Cannot determine prompt file path".to_string()))
    }

    /// Get path to the state file remembering the last source directory
    pub fn state_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("state.toml"))
    }

    pub fn load_state() -> LastState {
        Self::state_path()
            .map(|path| LastState::load_from(&path))
            .unwrap_or_default()
    }

    pub fn save_state(state: &LastState) -> Result<()> {
        let path = Self::state_path()
            .ok_or_else(|| FrameError::Config("Cannot determine state file path".to_string()))?;
        state.save_to(&path)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());

        if let Some(state) = Self::state_path() {
            let exists = if state.exists() { "✓" } else { "✗" };
            println!("  State:   {} {}", exists, state.display());
        }
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!("{}", toml::to_string_pretty(&config)?);
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            FrameError::Config("Cannot determine global config directory".to_string())
        })?;

        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_global_config())?;
            info!("Created global config: {}", config_path.display());
        } else {
            info!("Global config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Initialize project configuration in `root`
    pub fn init_project(root: &Path, force: bool) -> Result<PathBuf> {
        let project_dir = root.join(Self::project_dir());
        fs::create_dir_all(&project_dir)?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_project_config())?;
            info!("Created project config: {}", config_path.display());
        } else {
            info!("Project config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Generate default global config content (TOML)
    fn default_global_config() -> String {
        r#"# framescribe Global Configuration
# User-wide defaults. Project settings in .framescribe/config.toml override these.
# The API key is read from OPENAI_API_KEY unless set here.

[oracle]
provider = "openai"
model = "gpt-4o"
max_tokens = 100
timeout_secs = 120
temperature = 0.2

[pipeline]
mode = "independent"
detail = "low"
sequence_length = 3
overlap = 1

[export]
format = "json"
output_dir = "."
"#
        .to_string()
    }

    /// Generate default project config content (TOML)
    fn default_project_config() -> String {
        r#"# framescribe Project Configuration
# Project-specific settings that override global defaults.

[pipeline]
mode = "sequential"
detail = "low"
sequence_length = 3
overlap = 1
composite_dir = "composites"

[export]
format = "markdown"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportFormat;
    use crate::types::TreatmentMode;
    use tempfile::TempDir;

    #[test]
    fn test_default_templates_parse() {
        let dir = TempDir::new().unwrap();

        let global = dir.path().join("global.toml");
        fs::write(&global, ConfigLoader::default_global_config()).unwrap();
        let config = ConfigLoader::load_from_file(&global).unwrap();
        assert_eq!(config.oracle.max_tokens, 100);

        let project = ConfigLoader::init_project(dir.path(), false).unwrap();
        let config = ConfigLoader::load_from_file(&project).unwrap();
        assert_eq!(config.pipeline.mode, TreatmentMode::Sequential);
        assert_eq!(config.export.format, ExportFormat::Markdown);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[oracle]\ntemperature = 3.0\n").unwrap();
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_legacy_overrides() {
        let value = ConfigLoader::legacy_overrides(Some("gpt-4o-mini".into()), Some("250".into()));
        assert_eq!(value["oracle"]["model"], "gpt-4o-mini");
        assert_eq!(value["oracle"]["max_tokens"], 250);

        let value = ConfigLoader::legacy_overrides(None, Some("lots".into()));
        assert!(value.get("oracle").is_none());
    }

    #[test]
    fn test_legacy_overrides_merge_over_defaults() {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Serialized::defaults(ConfigLoader::legacy_overrides(
                None,
                Some("64".into()),
            )))
            .extract()
            .unwrap();
        assert_eq!(config.oracle.max_tokens, 64);
        assert_eq!(config.oracle.model, "gpt-4o");
    }

    #[test]
    fn test_prompts_path_prefers_config() {
        let mut config = Config::default();
        config.prompts.file = Some(PathBuf::from("/tmp/my-prompts.toml"));
        assert_eq!(
            ConfigLoader::prompts_path(&config).unwrap(),
            PathBuf::from("/tmp/my-prompts.toml")
        );
    }
}
