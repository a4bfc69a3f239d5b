//! OpenAI Captioning Oracle
//!
//! Sends one multimodal user message to an OpenAI-compatible Chat Completions
//! endpoint: a text part with the prompt, then one `image_url` part per image.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{CaptionOracle, CaptionRequest, ErrorCategory, ErrorClassifier, OracleConfig, OracleError};
use crate::constants::{network, oracle as oracle_constants};
use crate::types::{FrameError, Result};

const PROVIDER: &str = "openai";

/// OpenAI oracle with secure API key handling
pub struct OpenAiOracle {
    /// Never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiOracle")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiOracle {
    pub fn new(config: OracleConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                FrameError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .unwrap_or_else(|| oracle_constants::DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| FrameError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_request(&self, request: &CaptionRequest) -> ChatCompletionRequest {
        let mut content = Vec::with_capacity(request.images.len() + 1);
        content.push(ContentPart::Text {
            text: request.prompt.clone(),
        });
        content.extend(request.images.iter().map(|image| ContentPart::ImageUrl {
            image_url: ImageUrlDetail {
                url: image.data_url.clone(),
                detail: image.detail.as_api_str().to_string(),
            },
        }));

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl CaptionOracle for OpenAiOracle {
    async fn caption(&self, request: &CaptionRequest) -> Result<String> {
        info!(
            "Captioning with OpenAI (model: {}, images: {})",
            self.model,
            request.images.len()
        );

        let start_time = Instant::now();
        let body = self.build_request(request);
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::with_provider(ErrorCategory::Timeout, e.to_string(), PROVIDER)
                } else if e.is_connect() {
                    OracleError::with_provider(ErrorCategory::Network, e.to_string(), PROVIDER)
                } else {
                    ErrorClassifier::classify(&format!("OpenAI request failed: {}", e), PROVIDER)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("OpenAI API error ({}): {}", status, body),
                PROVIDER,
            )
            .into());
        }

        let response_body: ChatCompletionResponse = response.json().await.map_err(|e| {
            OracleError::with_provider(
                ErrorCategory::ParseError,
                format!("Failed to parse OpenAI response: {}", e),
                PROVIDER,
            )
        })?;

        debug!(
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            prompt_tokens = response_body.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens = response_body.usage.as_ref().map(|u| u.completion_tokens),
            "Received response from OpenAI"
        );

        response_body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                OracleError::with_provider(
                    ErrorCategory::ParseError,
                    "No content in OpenAI response",
                    PROVIDER,
                )
                .into()
            })
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrlDetail },
}

#[derive(Debug, Serialize)]
struct ImageUrlDetail {
    url: String,
    detail: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::EncodedImage;
    use crate::types::DetailLevel;

    fn oracle() -> OpenAiOracle {
        OpenAiOracle::new(OracleConfig {
            api_key: Some("sk-test".to_string()),
            api_base: Some("http://localhost:9/v1/".to_string()),
            ..OracleConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_request_shape() {
        let request = CaptionRequest {
            prompt: "Describe the scene.".to_string(),
            images: vec![
                EncodedImage {
                    data_url: "data:image/png;base64,AAAA".to_string(),
                    detail: DetailLevel::High,
                },
                EncodedImage {
                    data_url: "data:image/jpeg;base64,BBBB".to_string(),
                    detail: DetailLevel::High,
                },
            ],
        };

        let json = serde_json::to_value(oracle().build_request(&request)).unwrap();
        let content = &json["messages"][0]["content"];

        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 100);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "Describe the scene.");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["detail"], "high");
        assert_eq!(
            content[2]["image_url"]["url"],
            "data:image/jpeg;base64,BBBB"
        );
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        assert_eq!(oracle().api_base, "http://localhost:9/v1");
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", oracle());
        assert!(!debug.contains("sk-test"));
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"choices":[{"message":{"content":"  A cat.  "}}],"usage":{"prompt_tokens":90,"completion_tokens":4}}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("  A cat.  "));
        assert_eq!(parsed.usage.unwrap().prompt_tokens, 90);
    }
}
