//! Prompt Store
//!
//! Named prompts kept in a TOML file:
//!
//! ```toml
//! [prompts]
//! "Describe the scene" = "Describe the scene. Mention any visible text."
//! ```
//!
//! A prompt saved without a name is named after its text up to the first `.`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::{FrameError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct PromptFile {
    #[serde(default)]
    prompts: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct PromptStore {
    path: PathBuf,
    prompts: BTreeMap<String, String>,
}

impl PromptStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let prompts = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str::<PromptFile>(&content)?.prompts
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), count = prompts.len(), "Loaded prompts");
        Ok(Self { path, prompts })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prompt names in sorted order
    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prompts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.prompts.get(name).map(String::as_str)
    }

    /// Look up a prompt, failing with the known names when missing
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.prompts.keys().map(String::as_str).collect();
            FrameError::Prompt(format!(
                "Unknown prompt '{}'. Known prompts: {}",
                name,
                if known.is_empty() {
                    "(none)".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })
    }

    /// Save `text` under `name`, or under a name derived from the text.
    /// Returns the name used. Overwrites an existing prompt of that name.
    pub fn save(&mut self, name: Option<&str>, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FrameError::Prompt("Prompt text is empty".to_string()));
        }

        let name = match name {
            Some(name) => name.trim().to_string(),
            None => derive_name(text),
        };
        if name.is_empty() {
            return Err(FrameError::Prompt(
                "Cannot derive a prompt name, provide one explicitly".to_string(),
            ));
        }

        self.prompts.insert(name.clone(), text.to_string());
        self.persist()?;
        Ok(name)
    }

    /// Remove a prompt. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        let existed = self.prompts.remove(name).is_some();
        if existed {
            self.persist()?;
        }
        Ok(existed)
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = PromptFile {
            prompts: self.prompts.clone(),
        };
        fs::write(&self.path, toml::to_string_pretty(&file)?)?;
        Ok(())
    }
}

/// Name for an unnamed prompt: its text up to the first `.`
pub fn derive_name(text: &str) -> String {
    text.split('.').next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_derive_name() {
        assert_eq!(derive_name("Describe the scene. Be brief."), "Describe the scene");
        assert_eq!(derive_name("No period"), "No period");
        assert_eq!(derive_name(". leading"), "");
    }

    #[test]
    fn test_save_get_remove_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/prompts.toml");

        let mut store = PromptStore::open(&path).unwrap();
        assert!(store.is_empty());

        let name = store.save(None, "List the objects. Keep it short.").unwrap();
        assert_eq!(name, "List the objects");
        store.save(Some("ocr"), "Transcribe any text.").unwrap();

        let reopened = PromptStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("ocr"), Some("Transcribe any text."));
        let names: Vec<&str> = reopened.list().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["List the objects", "ocr"]);

        let mut store = reopened;
        assert!(store.remove("ocr").unwrap());
        assert!(!store.remove("ocr").unwrap());
        assert_eq!(PromptStore::open(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_unnameable_prompt() {
        let dir = TempDir::new().unwrap();
        let mut store = PromptStore::open(dir.path().join("p.toml")).unwrap();
        assert!(store.save(None, ". starts with a period").is_err());
        assert!(store.save(Some("x"), "   ").is_err());
    }

    #[test]
    fn test_require_lists_known_names() {
        let dir = TempDir::new().unwrap();
        let mut store = PromptStore::open(dir.path().join("p.toml")).unwrap();
        store.save(Some("a"), "Alpha.").unwrap();

        let err = store.require("b").unwrap_err();
        assert!(err.to_string().contains("Known prompts: a"));
    }
}
