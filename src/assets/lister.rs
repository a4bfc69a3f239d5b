use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::constants::planning::IMAGE_EXTENSIONS;
use crate::types::{AssetSequence, FrameError, ImageAsset, Result};

/// Enumerates image assets directly inside a source directory.
///
/// Listing is non-recursive and ignores `.gitignore`/hidden-file rules so a
/// directory always yields the same files. The result is sorted by file name.
pub struct AssetLister {
    extensions: Vec<String>,
}

impl Default for AssetLister {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLister {
    pub fn new() -> Self {
        Self {
            extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn list<P: AsRef<Path>>(&self, source: P) -> Result<AssetSequence> {
        let source = source.as_ref();

        let metadata = std::fs::metadata(source)
            .map_err(|e| FrameError::source_unavailable(source, e))?;
        if !metadata.is_dir() {
            return Err(FrameError::source_unavailable(source, "not a directory"));
        }

        let walker = WalkBuilder::new(source)
            .standard_filters(false)
            .max_depth(Some(1))
            .follow_links(false)
            .build();

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| FrameError::source_unavailable(source, e))?;
            if entry.depth() == 0 {
                continue;
            }

            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file || !self.accepts(entry.path()) {
                continue;
            }

            paths.push(entry.into_path());
        }

        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        tracing::debug!(source = %source.display(), count = paths.len(), "Listed image assets");

        Ok(paths.into_iter().map(ImageAsset::new).collect())
    }

    fn accepts(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| self.extensions.iter().any(|ext| name.ends_with(ext.as_str())))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_lists_sorted_images_only() {
        let dir = TempDir::new().unwrap();
        for name in ["c.jpg", "a.png", "b.jpg", "notes.txt", "d.JPG", "e.jpeg"] {
            touch(dir.path(), name);
        }

        let assets = AssetLister::new().list(dir.path()).unwrap();
        assert_eq!(assets.names(), vec!["a.png", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_non_recursive() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "top.jpg");
        fs::create_dir(dir.path().join("nested.jpg")).unwrap();
        touch(&dir.path().join("nested.jpg"), "inner.jpg");

        let assets = AssetLister::new().list(dir.path()).unwrap();
        assert_eq!(assets.names(), vec!["top.jpg"]);
    }

    #[test]
    fn test_hidden_and_ignored_files_are_listed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.png\n").unwrap();
        touch(dir.path(), ".hidden.jpg");
        touch(dir.path(), "shot.png");

        let assets = AssetLister::new().list(dir.path()).unwrap();
        assert_eq!(assets.names(), vec![".hidden.jpg", "shot.png"]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let assets = AssetLister::new().list(dir.path()).unwrap();
        assert!(assets.is_empty());
    }

    #[test]
    fn test_missing_source_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = AssetLister::new()
            .list(dir.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, FrameError::SourceUnavailable { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_file_source_is_unavailable() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.jpg");
        let err = AssetLister::new().list(dir.path().join("a.jpg")).unwrap_err();
        assert!(matches!(err, FrameError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_repeated_listing_is_identical() {
        let dir = TempDir::new().unwrap();
        for name in ["z.png", "m.jpg", "a.jpg"] {
            touch(dir.path(), name);
        }
        let lister = AssetLister::new();
        assert_eq!(
            lister.list(dir.path()).unwrap(),
            lister.list(dir.path()).unwrap()
        );
    }
}
