//! Description Dispatcher
//!
//! Turns one unit of work into one [`DescriptionRecord`]. Every failure
//! inside a unit (unreadable image, composite error, oracle error, timeout,
//! empty response) is captured on the record so the batch keeps going.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::composite::CompositeBuilder;
use crate::oracle::{CaptionRequest, EncodedImage, SharedOracle, with_timeout};
use crate::types::{
    DescriptionRecord, DetailLevel, ErrorCategory, FailureStage, FrameError, Result, UnitFailure,
    UnitOfWork, Window,
};

pub struct DescriptionDispatcher {
    oracle: SharedOracle,
    composites: CompositeBuilder,
    prompt: String,
    detail: DetailLevel,
    timeout: Duration,
}

impl DescriptionDispatcher {
    pub fn new(
        oracle: SharedOracle,
        composites: CompositeBuilder,
        prompt: impl Into<String>,
        detail: DetailLevel,
        timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            composites,
            prompt: prompt.into(),
            detail,
            timeout,
        }
    }

    /// Ask the oracle to describe every image of `unit` in one call.
    ///
    /// Returns the trimmed description. An empty answer is a parse error.
    pub async fn describe(
        &self,
        unit: &UnitOfWork,
        prompt: &str,
        detail: DetailLevel,
    ) -> Result<String> {
        let mut images = Vec::with_capacity(unit.assets().len());
        for asset in unit.assets() {
            images.push(EncodedImage {
                data_url: encode_data_url(asset.path()).await?,
                detail,
            });
        }

        let request = CaptionRequest {
            prompt: prompt.to_string(),
            images,
        };

        let text = with_timeout(
            self.timeout,
            self.oracle.caption(&request),
            &format!("caption {}", unit.label()),
        )
        .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(FrameError::oracle(
                ErrorCategory::ParseError,
                "oracle returned an empty description",
            ));
        }
        Ok(text.to_string())
    }

    /// Process one unit, never failing the batch
    pub async fn dispatch(&self, unit: &UnitOfWork) -> DescriptionRecord {
        let members = unit.names();

        let subject = match unit {
            UnitOfWork::Single { asset, .. } => asset.path().to_path_buf(),
            UnitOfWork::Window(window) => match self.composite(window).await {
                Ok(path) => path,
                Err(e) => {
                    warn!(unit = %unit.label(), error = %e, "Composite failed, skipping oracle call");
                    let subject = window
                        .assets
                        .first()
                        .map(|a| a.path().to_path_buf())
                        .unwrap_or_default();
                    return DescriptionRecord::failed(
                        subject,
                        members,
                        UnitFailure::from_error(FailureStage::Composition, &e),
                    );
                }
            },
        };

        match self.describe(unit, &self.prompt, self.detail).await {
            Ok(text) => {
                debug!(unit = %unit.label(), chars = text.len(), "Described");
                DescriptionRecord::succeeded(subject, members, text)
            }
            Err(e) => {
                warn!(
                    unit = %unit.label(),
                    category = %e.category(),
                    error = %e,
                    "Description failed"
                );
                DescriptionRecord::failed(
                    subject,
                    members,
                    UnitFailure::from_error(FailureStage::Dispatch, &e),
                )
            }
        }
    }

    async fn composite(&self, window: &Window) -> Result<PathBuf> {
        let builder = self.composites.clone();
        let index = window.index;
        let paths = window.paths();
        let first = paths.first().cloned().unwrap_or_default();

        tokio::task::spawn_blocking(move || builder.build(index, &paths))
            .await
            .map_err(|e| FrameError::composition(first, e))?
    }
}

/// Read an image and encode it as a `data:` URL
pub async fn encode_data_url(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(format!(
        "data:{};base64,{}",
        mime_type(path),
        STANDARD.encode(bytes)
    ))
}

fn mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}
