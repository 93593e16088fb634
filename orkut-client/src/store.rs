use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use orkut_types::Profile;

use crate::smart_save::PendingWrite;

/// Everything SmartSave keeps on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalState {
    /// Shadow copy of the signed-in user's profile, with local edits applied
    #[serde(default)]
    pub profile: Option<Profile>,
    /// Writes the server has not acknowledged yet, oldest first
    #[serde(default)]
    pub queue: Vec<PendingWrite>,
}

/// JSON file holding the local state.
///
/// Writes go to a temporary file that is renamed over the real one, so a crash
/// mid-write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct LocalStore {
    file_path: PathBuf,
}

impl LocalStore {
    /// Store at the default location, `~/.orkut/smartsave.json`
    pub fn new() -> Result<Self> {
        Ok(Self::at(crate::config::default_store_path()?))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Load the saved state.
    ///
    /// A missing file yields an empty state. A file that cannot be parsed is
    /// logged and replaced by an empty state rather than failing startup.
    pub fn load(&self) -> Result<LocalState> {
        let content = match fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No local state at {}, starting fresh", self.file_path.display());
                return Ok(LocalState::default());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read local state from {}", self.file_path.display())
                })
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                log::warn!(
                    "Local state at {} is corrupted ({}), starting fresh",
                    self.file_path.display(),
                    e
                );
                Ok(LocalState::default())
            }
        }
    }

    pub fn save(&self, state: &LocalState) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).context("Failed to create local state directory")?;
        }

        let json = serde_json::to_string_pretty(state).context("Failed to serialize local state")?;

        let temp_path = self.file_path.with_extension("tmp");
        let mut file =
            fs::File::create(&temp_path).context("Failed to create temporary state file")?;
        file.write_all(json.as_bytes())
            .context("Failed to write local state")?;
        file.sync_all()
            .context("Failed to sync local state to disk")?;
        drop(file);

        fs::rename(&temp_path, &self.file_path)
            .context("Failed to rename temporary state file")?;

        log::debug!(
            "Saved local state ({} pending) to {}",
            state.queue.len(),
            self.file_path.display()
        );
        Ok(())
    }
}
