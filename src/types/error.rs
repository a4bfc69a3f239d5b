//! Unified Error Type System
//!
//! Centralized error types for the captioning pipeline.
//!
//! ## Propagation
//!
//! - **Fatal** (`SourceUnavailable`, `InvalidStride`): abort the run, no partial result
//! - **Unit-local** (`Composition`, `Oracle`, `Timeout`): recorded on a single
//!   `DescriptionRecord`, the batch continues
//! - **Ambient** (`Io`, `Config`, `Prompt`, `Export`): raised by collaborators
//!   outside a run

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Categories for oracle failures, used for logging and failure records
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rate limited by the oracle
    RateLimit,
    /// Authentication failed
    Auth,
    /// Network/connectivity issues
    Network,
    /// Temporary server issues
    Transient,
    /// Invalid request (payload too large, bad image, ...)
    BadRequest,
    /// Response could not be parsed or carried no text
    ParseError,
    /// Request exceeded the configured timeout
    Timeout,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// =============================================================================
// Oracle Error
// =============================================================================

/// Oracle error with category and provider context
#[derive(Debug, Clone)]
pub struct OracleError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for OracleError {}

impl OracleError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
        }
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw oracle failures onto an [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from the transport layer
    pub fn classify(message: &str, provider: &str) -> OracleError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit") || lower.contains("too many requests") {
            return OracleError::with_provider(ErrorCategory::RateLimit, message, provider);
        }

        if lower.contains("timed out") || lower.contains("timeout") {
            return OracleError::with_provider(ErrorCategory::Timeout, message, provider);
        }

        if lower.contains("unauthorized") || lower.contains("api key") {
            return OracleError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("connection") || lower.contains("dns") || lower.contains("network") {
            return OracleError::with_provider(ErrorCategory::Network, message, provider);
        }

        if lower.contains("decod") || lower.contains("json") || lower.contains("parse") {
            return OracleError::with_provider(ErrorCategory::ParseError, message, provider);
        }

        OracleError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> OracleError {
        match status {
            429 => OracleError::with_provider(ErrorCategory::RateLimit, message, provider),
            401 | 403 => OracleError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 413 | 422 => {
                OracleError::with_provider(ErrorCategory::BadRequest, message, provider)
            }
            408 => OracleError::with_provider(ErrorCategory::Timeout, message, provider),
            500 | 502 | 503 | 504 => {
                OracleError::with_provider(ErrorCategory::Transient, message, provider)
            }
            _ => OracleError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum FrameError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlDecode(#[from] toml::de::Error),

    #[error("TOML error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("Image read failed for {path}: {reason}")]
    ImageRead { path: PathBuf, reason: String },

    // -------------------------------------------------------------------------
    // Fatal Run Errors
    // -------------------------------------------------------------------------
    #[error("Source unavailable: {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error(
        "Invalid stride: sequence length {sequence_length} with overlap {overlap} does not advance"
    )]
    InvalidStride { sequence_length: usize, overlap: usize },

    // -------------------------------------------------------------------------
    // Unit-Local Errors
    // -------------------------------------------------------------------------
    #[error("Composition failed for {path}: {reason}")]
    Composition { path: PathBuf, reason: String },

    #[error("Oracle error: {0}")]
    Oracle(OracleError),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Collaborator Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl From<OracleError> for FrameError {
    fn from(err: OracleError) -> Self {
        FrameError::Oracle(err)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl FrameError {
    pub fn source_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn image_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ImageRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn composition(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Composition {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an oracle error with category
    pub fn oracle(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self::Oracle(OracleError::new(category, message))
    }

    /// Errors that abort a whole run instead of a single unit
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::InvalidStride { .. }
        )
    }

    /// Category used when this error is recorded against a unit of work
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Oracle(e) => e.category,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Json(_) => ErrorCategory::ParseError,
            Self::Io(_) | Self::ImageRead { .. } => ErrorCategory::BadRequest,
            _ => ErrorCategory::Unknown,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
