//! Persistent state file
//!
//! The engine keeps state in memory; this module stores it as TOML between
//! runs, together with a format version and a serial that increases every
//! time the recorded content changes.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reconcile::{State, StateSnapshot};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Format version written by this build
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("State file version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// On-disk state document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,

    /// Increases by one on every save that changes recorded content
    #[serde(default)]
    pub serial: u64,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    #[serde(flatten)]
    pub snapshot: StateSnapshot,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            last_updated: Utc::now(),
            snapshot: StateSnapshot::default(),
        }
    }
}

impl StateFile {
    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let file: StateFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if file.version > STATE_VERSION {
            return Err(StateFileError::UnsupportedVersion {
                found: file.version,
                supported: STATE_VERSION,
            }
            .into());
        }

        log::debug!(
            "Loaded state serial {} from {}",
            file.serial,
            path.display()
        );
        Ok(file)
    }

    /// Save state to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create state directory: {}", dir.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize state")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state serial {} to {}", self.serial, path.display());
        Ok(())
    }

    /// Live engine state built from this file
    pub fn to_state(&self) -> State {
        State::from_snapshot(self.snapshot.clone())
    }

    /// Take over the content of `state`; returns whether anything changed
    pub fn update_from(&mut self, state: &State) -> bool {
        let snapshot = state.snapshot();
        if snapshot == self.snapshot {
            return false;
        }
        self.snapshot = snapshot;
        self.serial += 1;
        self.version = STATE_VERSION;
        self.touch();
        true
    }

    /// Update the last_updated timestamp
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}
