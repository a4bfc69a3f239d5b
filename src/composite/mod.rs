//! Composite Builder
//!
//! Stacks the members of a window vertically into one PNG, kept as an audit
//! artifact of what the oracle was shown for that window.

use image::{ImageFormat, RgbaImage, imageops};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::types::{FrameError, Result};

#[derive(Debug, Clone)]
pub struct CompositeBuilder {
    output_dir: PathBuf,
}

impl CompositeBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Build the composite for window `window_index`.
    ///
    /// A single path is returned unchanged. Two or more images are stacked
    /// top to bottom on a canvas of (widest width, summed heights), left-aligned.
    pub fn build(&self, window_index: usize, paths: &[PathBuf]) -> Result<PathBuf> {
        let first = paths
            .first()
            .ok_or_else(|| FrameError::composition(&self.output_dir, "empty window"))?;
        if paths.len() == 1 {
            return Ok(first.clone());
        }

        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            let img = image::open(path).map_err(|e| FrameError::composition(path, e))?;
            images.push(img.to_rgba8());
        }

        let width = images.iter().map(|img| img.width()).max().unwrap_or(0);
        let height = images
            .iter()
            .try_fold(0u32, |acc, img| acc.checked_add(img.height()))
            .ok_or_else(|| FrameError::composition(first, "composite height overflow"))?;

        let mut canvas = RgbaImage::new(width, height);
        let mut y = 0i64;
        for img in &images {
            imageops::overlay(&mut canvas, img, 0, y);
            y += i64::from(img.height());
        }

        fs::create_dir_all(&self.output_dir)
            .map_err(|e| FrameError::composition(&self.output_dir, e))?;

        let target = self.output_dir.join(composite_name(window_index, paths));
        canvas
            .save_with_format(&target, ImageFormat::Png)
            .map_err(|e| FrameError::composition(&target, e))?;

        debug!(
            window = window_index,
            members = paths.len(),
            width,
            height,
            path = %target.display(),
            "Composite written"
        );

        Ok(target)
    }
}

/// Deterministic artifact name from window index and first/last member stems
fn composite_name(window_index: usize, paths: &[PathBuf]) -> String {
    let stem = |p: Option<&PathBuf>| {
        p.and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    format!(
        "composite_{:04}_{}_{}.png",
        window_index,
        stem(paths.first()),
        stem(paths.last())
    )
}
