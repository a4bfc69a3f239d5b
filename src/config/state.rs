use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::types::Result;

/// Values remembered between invocations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastState {
    /// Source directory of the most recent `describe` run
    pub last_source: Option<PathBuf>,
}

impl LastState {
    /// Load state from `path`. Missing or unreadable state is empty.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        toml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable state file");
            Self::default()
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_and_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        assert_eq!(LastState::load_from(&path), LastState::default());

        let state = LastState {
            last_source: Some(PathBuf::from("/shots")),
        };
        state.save_to(&path).unwrap();
        assert_eq!(LastState::load_from(&path), state);
    }

    #[test]
    fn test_corrupt_state_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        fs::write(&path, "last_source = [").unwrap();
        assert_eq!(LastState::load_from(&path), LastState::default());
    }
}
