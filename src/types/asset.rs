//! Image assets, the ordered sequence they form, and windows over it.

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::types::{FrameError, Result};

/// One image file in the source directory.
///
/// Pixel dimensions are read on first use and cached for the rest of the run.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    path: PathBuf,
    name: String,
    dimensions: OnceLock<(u32, u32)>,
}

impl ImageAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            dimensions: OnceLock::new(),
        }
    }

    /// Create an asset whose dimensions are already known
    pub fn with_dimensions(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        let asset = Self::new(path);
        let _ = asset.dimensions.set((width, height));
        asset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name, unique within the source directory
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pixel (width, height), read from the image header on first call
    pub fn dimensions(&self) -> Result<(u32, u32)> {
        if let Some(dims) = self.dimensions.get() {
            return Ok(*dims);
        }
        let dims = image::image_dimensions(&self.path)
            .map_err(|e| FrameError::image_read(&self.path, e))?;
        Ok(*self.dimensions.get_or_init(|| dims))
    }
}

impl PartialEq for ImageAsset {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for ImageAsset {}

impl fmt::Display for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Ordered assets for one run. Index positions are authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSequence(Vec<ImageAsset>);

impl AssetSequence {
    pub fn new(assets: Vec<ImageAsset>) -> Self {
        Self(assets)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageAsset> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageAsset> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ImageAsset] {
        &self.0
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(ImageAsset::name).collect()
    }
}

impl<'a> IntoIterator for &'a AssetSequence {
    type Item = &'a ImageAsset;
    type IntoIter = std::slice::Iter<'a, ImageAsset>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<ImageAsset> for AssetSequence {
    fn from_iter<I: IntoIterator<Item = ImageAsset>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Contiguous run of assets dispatched as a single unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Ordinal of this window in the plan
    pub index: usize,
    /// Index of the first member in the asset sequence
    pub start: usize,
    pub assets: Vec<ImageAsset>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Exclusive end index in the asset sequence
    pub fn end(&self) -> usize {
        self.start + self.assets.len()
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.assets.iter().map(|a| a.path().to_path_buf()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_name_from_path() {
        let asset = ImageAsset::new("/tmp/shots/frame_001.png");
        assert_eq!(asset.name(), "frame_001.png");
        assert_eq!(asset.to_string(), "frame_001.png");
    }

    #[test]
    fn test_known_dimensions_skip_disk() {
        let asset = ImageAsset::with_dimensions("/does/not/exist.jpg", 640, 480);
        assert_eq!(asset.dimensions().unwrap(), (640, 480));
    }

    #[test]
    fn test_missing_image_dimensions_error() {
        let asset = ImageAsset::new("/does/not/exist.jpg");
        let err = asset.dimensions().unwrap_err();
        assert!(matches!(err, FrameError::ImageRead { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_window_range() {
        let window = Window {
            index: 1,
            start: 2,
            assets: vec![ImageAsset::new("c.jpg"), ImageAsset::new("d.jpg")],
        };
        assert_eq!(window.range(), 2..4);
        assert_eq!(window.names(), vec!["c.jpg", "d.jpg"]);
    }
}
