//! Captioning Oracle Abstraction
//!
//! Defines the [`CaptionOracle`] trait: one user turn made of a text prompt
//! followed by images in order, answered with free text.
//!
//! The oracle reports failures as [`FrameError::Oracle`] carrying an
//! [`ErrorCategory`]. Retries are not attempted at this layer.

mod openai;
#[cfg(test)]
pub(crate) mod scripted;
mod timeout;

pub use openai::OpenAiOracle;
pub use timeout::with_timeout;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{network, oracle as oracle_constants};
use crate::types::{DetailLevel, FrameError, Result};

// Re-export error types used by implementations
pub use crate::types::{ErrorCategory, ErrorClassifier, OracleError};

// =============================================================================
// Requests
// =============================================================================

/// One image, already encoded as a `data:` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data_url: String,
    pub detail: DetailLevel,
}

/// Prompt and images for a single oracle call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionRequest {
    pub prompt: String,
    pub images: Vec<EncodedImage>,
}

// =============================================================================
// Oracle Configuration
// =============================================================================

/// Configuration for captioning oracles
///
/// The API key is never serialized and is redacted in debug output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Oracle type: "openai"
    pub provider: String,
    pub model: String,
    /// API base URL (for OpenAI-compatible endpoints)
    pub api_base: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Completion length for one description
    pub max_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: oracle_constants::DEFAULT_MODEL.to_string(),
            api_base: None,
            api_key: None,
            max_tokens: oracle_constants::DEFAULT_MAX_TOKENS,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: oracle_constants::DEFAULT_TEMPERATURE,
        }
    }
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Oracle Trait
// =============================================================================

#[async_trait]
pub trait CaptionOracle: Send + Sync {
    /// Describe the images in `request`. Returns the raw response text.
    async fn caption(&self, request: &CaptionRequest) -> Result<String>;

    /// Oracle name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Completion length requested per call
    fn max_tokens(&self) -> u32;
}

pub type SharedOracle = Arc<dyn CaptionOracle>;

/// Create a shared oracle from configuration
pub fn create_oracle(config: &OracleConfig) -> Result<SharedOracle> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiOracle::new(config.clone())?)),
        _ => Err(FrameError::Config(format!(
            "Unknown oracle provider: {}. Supported: openai",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = OracleConfig {
            api_key: Some("sk-secret".to_string()),
            ..OracleConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = OracleConfig {
            api_key: Some("sk-secret".to_string()),
            ..OracleConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_factory_names_oracle() {
        let config = OracleConfig {
            api_key: Some("sk-test".to_string()),
            model: "gpt-4o-mini".to_string(),
            ..OracleConfig::default()
        };
        let oracle = create_oracle(&config).unwrap();
        assert_eq!(oracle.name(), "openai");
        assert_eq!(oracle.model(), "gpt-4o-mini");
        assert_eq!(oracle.max_tokens(), 100);
    }

    #[test]
    fn test_unknown_provider() {
        let config = OracleConfig {
            provider: "carrier-pigeon".to_string(),
            ..OracleConfig::default()
        };
        assert!(matches!(
            create_oracle(&config),
            Err(FrameError::Config(_))
        ));
    }
}
