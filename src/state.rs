//! Sync state - the fast-lookup index used for diffing
//!
//! A JSON file mapping asset keys (`category/repo/name`) to the content hash
//! last synced for that key. Loaded when the engine starts, mutated only
//! after successful fetches, written back once per apply run. An unreadable
//! or unparseable file is treated as fresh state: the next run re-fetches
//! everything, which is redundant but never loses data.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Durable record of what was last synced
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncState {
    /// Completion time of the last apply run
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,

    /// Completion time of the last local organize pass
    #[serde(default)]
    pub last_organize: Option<DateTime<Utc>>,

    /// Asset key -> content hash last synced
    #[serde(default)]
    pub assets: BTreeMap<String, String>,
}

impl SyncState {
    /// Load state from a file. Missing or corrupt files yield fresh state.
    pub fn load(path: &Path) -> SyncState {
        if !path.exists() {
            debug!("No sync state at {}, starting fresh", path.display());
            return SyncState::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        "Sync state at {} is unreadable ({}); starting fresh",
                        path.display(),
                        e
                    );
                    SyncState::default()
                }
            },
            Err(e) => {
                warn!(
                    "Could not read sync state at {} ({}); starting fresh",
                    path.display(),
                    e
                );
                SyncState::default()
            }
        }
    }

    /// Persist state. Called once per apply run, after all fetches.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory: {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize sync state")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write sync state: {:?}", path))?;

        debug!("Sync state saved to {}", path.display());
        Ok(())
    }

    /// Hash recorded for an asset key, if any
    pub fn stored_sha(&self, key: &str) -> Option<&str> {
        self.assets.get(key).map(String::as_str)
    }

    /// Record a successful sync of one asset
    pub fn record(&mut self, key: impl Into<String>, sha: impl Into<String>) {
        self.assets.insert(key.into(), sha.into());
    }
}
