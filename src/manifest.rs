//! Asset manifests - the durable source of truth for what exists locally
//!
//! Each synced category owns one `manifest.json` under its directory. The
//! master manifest aggregates every category manifest and is always rebuilt
//! from the files on disk, never from in-memory state, so it self-heals
//! after a partially failed run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::category::AssetCategory;

/// One row of a category manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    /// Destination file name
    pub filename: String,
    /// Repository the asset came from
    pub source_repo: String,
    /// Path within the source repository
    pub source_path: String,
    /// Content hash at sync time
    pub sha: String,
    /// Size in bytes
    pub size: u64,
    /// When the asset was last synced
    pub synced_at: DateTime<Utc>,
    /// Download URL, or the extracted-content sentinel
    pub download_url: String,
}

/// On-disk shape of a category manifest
#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    generated: DateTime<Utc>,
    count: usize,
    assets: BTreeMap<String, ManifestEntry>,
}

/// Registry of synced assets for one category
#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    pub entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Path of a category's manifest under the repos directory
    pub fn path_for(repos_dir: &Path, category: AssetCategory) -> PathBuf {
        repos_dir.join(category.as_str()).join("manifest.json")
    }

    /// Load a category manifest. Missing or corrupt files yield an empty
    /// manifest that repopulates on the next sync.
    pub fn load(repos_dir: &Path, category: AssetCategory) -> Manifest {
        let path = Self::path_for(repos_dir, category);
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<ManifestFile>(&content) {
                Ok(file) => file.assets,
                Err(e) => {
                    warn!(
                        "Manifest at {} is unreadable ({}); starting empty",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        Manifest { path, entries }
    }

    /// Add or replace an entry
    pub fn add(&mut self, entry: ManifestEntry) {
        self.entries.insert(entry.filename.clone(), entry);
    }

    pub fn get(&self, filename: &str) -> Option<&ManifestEntry> {
        self.entries.get(filename)
    }

    /// Write the manifest back to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create manifest directory: {:?}", parent))?;
        }

        let file = ManifestFile {
            generated: Utc::now(),
            count: self.entries.len(),
            assets: self.entries.clone(),
        };

        let content =
            serde_json::to_string_pretty(&file).context("Failed to serialize manifest")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write manifest: {:?}", self.path))?;

        debug!("Manifest saved: {}", self.path.display());
        Ok(())
    }
}

/// Per-category slice of the master manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub count: usize,
    /// Repository -> file names in this category
    pub repos: BTreeMap<String, Vec<String>>,
}

/// Aggregated view over all category manifests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterManifest {
    pub generated: DateTime<Utc>,
    pub organization: String,
    /// Category name -> summary
    pub types: BTreeMap<String, TypeSummary>,
    /// Repository -> category name -> file names
    pub by_repo: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub total_assets: u64,
}

impl MasterManifest {
    pub fn path_for(repos_dir: &Path) -> PathBuf {
        repos_dir.join("manifest.json")
    }

    /// Rebuild the master manifest by reading every category manifest from
    /// disk. Nothing in-memory is trusted: a crash that left a category
    /// manifest stale is reflected as-is and heals on the next sync.
    pub fn rebuild(repos_dir: &Path, organization: &str) -> MasterManifest {
        let mut types = BTreeMap::new();
        let mut by_repo: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
        let mut total_assets = 0u64;

        for category in AssetCategory::ALL {
            if !category.is_synced() {
                continue;
            }

            let manifest = Manifest::load(repos_dir, category);
            if manifest.entries.is_empty() {
                continue;
            }

            let mut repos: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for entry in manifest.entries.values() {
                repos
                    .entry(entry.source_repo.clone())
                    .or_default()
                    .push(entry.filename.clone());

                by_repo
                    .entry(entry.source_repo.clone())
                    .or_default()
                    .entry(category.as_str().to_string())
                    .or_default()
                    .push(entry.filename.clone());

                total_assets += 1;
            }

            types.insert(
                category.as_str().to_string(),
                TypeSummary {
                    count: manifest.entries.len(),
                    repos,
                },
            );
        }

        MasterManifest {
            generated: Utc::now(),
            organization: organization.to_string(),
            types,
            by_repo,
            total_assets,
        }
    }

    /// Load a previously written master manifest, if readable
    pub fn load(repos_dir: &Path) -> Option<MasterManifest> {
        let path = Self::path_for(repos_dir);
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn save(&self, repos_dir: &Path) -> Result<()> {
        let path = Self::path_for(repos_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create manifest directory: {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize master manifest")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write master manifest: {:?}", path))?;

        debug!("Master manifest saved: {}", path.display());
        Ok(())
    }
}
