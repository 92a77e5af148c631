//! Last-successful-pull checkpoints
//!
//! A small JSON file under the local root's private directory records when
//! each target last finished a pull with zero errors. The Recommender and
//! the trash planner read these checkpoints; an unreadable file degrades to
//! "no checkpoints" because they are advisory, never load-bearing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::scanner::PRIVATE_PREFIX;

/// Persisted checkpoint data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetState {
    /// Unix timestamp of the last error-free pull, per target
    #[serde(default)]
    pub last_successful_pull: BTreeMap<String, i64>,
}

/// Reader/writer for the checkpoint file
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store rooted at `<local_root>/.apsync/state.json`
    #[must_use]
    pub fn open(local_root: &Path) -> Self {
        Self {
            path: local_root.join(PRIVATE_PREFIX).join("state.json"),
        }
    }

    /// Path of the state file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current state; missing or corrupt files yield the default
    #[must_use]
    pub fn load(&self) -> TargetState {
        let Ok(data) = fs::read(&self.path) else {
            return TargetState::default();
        };

        match serde_json::from_slice(&data) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable state file");
                TargetState::default()
            }
        }
    }

    /// Checkpoint for one target, if any
    #[must_use]
    pub fn last_pull(&self, target: &str) -> Option<i64> {
        self.load().last_successful_pull.get(target).copied()
    }

    /// Record an error-free pull for a target
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be written.
    pub fn mark_pulled(&self, target: &str, timestamp: i64) -> Result<()> {
        let mut state = self.load();
        state
            .last_successful_pull
            .insert(target.to_string(), timestamp);
        self.save(&state)
    }

    fn save(&self, state: &TargetState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(state).map_err(std::io::Error::other)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
