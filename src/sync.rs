//! Sync Engine - drives the scan / classify / diff / fetch / record pipeline
//!
//! A run walks the organization's repositories through a fixed sequence:
//! scan remote listings into candidate descriptors, classify each candidate
//! (rules first, default policy as fallback), diff against the sync state,
//! then either report the plan (dry run) or fetch what changed and record
//! it. State is written once per run, after all fetches, and the master
//! manifest is rebuilt from disk at the end - a crash mid-run just leaves
//! unrecorded assets to be retried next time.

use crate::asset::{AssetContent, AssetDescriptor};
use crate::category::AssetCategory;
use crate::classify::{default_category, ext_of, CONTENT_SNIFF_MAX_BYTES, TEXT_EXTS};
use crate::config::Config;
use crate::extract::extract_banners;
use crate::manifest::{Manifest, ManifestEntry, MasterManifest};
use crate::rules::{Candidate, RuleSet};
use crate::source::{EntryKind, RemoteEntry, RemoteSource};
use crate::state::SyncState;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Root files treated as READMEs for banner extraction
const README_NAMES: &[&str] = &["readme.md", "readme.txt", "readme"];

/// Supplies pixel dimensions for remote entries. Directory listings carry
/// no dimension data, so the default lookup answers nothing and
/// dimension-gated rules fail closed during remote scans. Hosts that keep
/// image metadata elsewhere can plug in a real lookup.
pub trait DimensionLookup: Send + Sync {
    fn dimensions(&self, repo: &str, entry: &RemoteEntry) -> Option<(u32, u32)>;
}

/// Default lookup: no dimension information available
pub struct NoDimensions;

impl DimensionLookup for NoDimensions {
    fn dimensions(&self, _repo: &str, _entry: &RemoteEntry) -> Option<(u32, u32)> {
        None
    }
}

/// Result of scanning repositories for candidate assets
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Classified candidates (category already assigned, `other` dropped)
    pub assets: Vec<AssetDescriptor>,
    /// Repositories successfully scanned
    pub repos_scanned: usize,
    /// Per-repository scan failures; the run continues without them
    pub errors: Vec<ScanError>,
}

/// One repository that could not be scanned
#[derive(Debug)]
pub struct ScanError {
    pub repo: String,
    pub message: String,
}

/// Whether an asset is new locally or replaces an older version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    New,
    Update,
}

/// One asset the diff decided to sync
#[derive(Debug)]
pub struct SyncAction {
    pub descriptor: AssetDescriptor,
    pub kind: ActionKind,
}

/// Assets that need syncing, in scan order
#[derive(Debug, Default)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }
}

/// One asset that failed to fetch; retried naturally on the next run
#[derive(Debug)]
pub struct SyncFailure {
    pub key: String,
    pub error: String,
}

/// Results from an apply run
#[derive(Debug, Default)]
pub struct SyncSummary {
    /// Asset keys written this run
    pub synced: Vec<String>,
    /// Assets that failed; state and manifests untouched for these
    pub failed: Vec<SyncFailure>,
    pub duration: Duration,
}

/// The main sync engine
pub struct SyncEngine {
    config: Arc<Config>,
    source: Arc<dyn RemoteSource>,
    rules: RuleSet,
    dimensions: Arc<dyn DimensionLookup>,
}

impl SyncEngine {
    pub fn new(config: Config, source: Arc<dyn RemoteSource>) -> Self {
        let rules = config.rule_set();
        Self {
            config: Arc::new(config),
            source,
            rules,
            dimensions: Arc::new(NoDimensions),
        }
    }

    /// Replace the dimension lookup collaborator
    pub fn with_dimensions(mut self, dimensions: Arc<dyn DimensionLookup>) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// SCAN + CLASSIFY: enumerate repositories (or one named repository) and
    /// collect classified candidate descriptors. Repository-level failures
    /// are collected, not fatal.
    pub async fn scan(&self, only_repo: Option<&str>) -> Result<ScanOutcome> {
        let repo_names: Vec<String> = match only_repo {
            Some(name) => vec![name.to_string()],
            None => self
                .source
                .list_repositories(&self.config.organization)
                .await
                .context("Failed to list organization repositories")?
                .into_iter()
                .map(|repo| repo.name)
                .collect(),
        };

        info!("Scanning {} repositories", repo_names.len());

        let mut outcome = ScanOutcome::default();

        for repo in repo_names {
            if self.config.is_repo_excluded(&repo) {
                debug!("Skipping excluded repository: {}", repo);
                continue;
            }

            match self.scan_repo(&repo).await {
                Ok(assets) => {
                    debug!("{}: {} candidate(s)", repo, assets.len());
                    outcome.assets.extend(assets);
                    outcome.repos_scanned += 1;
                }
                Err(e) => {
                    warn!("Failed to scan {}: {:#}", repo, e);
                    outcome.errors.push(ScanError {
                        repo,
                        message: format!("{:#}", e),
                    });
                }
            }
        }

        Ok(outcome)
    }

    /// Scan one repository: root entries, whitelisted asset directories,
    /// and README banner extraction.
    async fn scan_repo(&self, repo: &str) -> Result<Vec<AssetDescriptor>> {
        let root_entries = self.source.list_directory(repo, "").await?;

        let mut assets = Vec::new();
        let mut dirs_to_scan = Vec::new();
        let mut readme: Option<RemoteEntry> = None;

        for entry in root_entries {
            match entry.kind {
                EntryKind::Dir => {
                    let lower = entry.name.to_lowercase();
                    if self.config.sync.source_dirs.iter().any(|d| *d == lower) {
                        dirs_to_scan.push(entry);
                    }
                }
                EntryKind::File => {
                    if README_NAMES.contains(&entry.name.to_lowercase().as_str()) {
                        readme = Some(entry.clone());
                    }
                    if let Some(descriptor) = self.classify_entry(repo, &entry).await {
                        assets.push(descriptor);
                    }
                }
            }
        }

        if let Some(readme) = readme {
            assets.extend(self.extract_readme_banners(repo, &readme).await);
        }

        for dir in dirs_to_scan {
            match self.source.list_directory(repo, &dir.path).await {
                Ok(entries) => {
                    for entry in entries {
                        if entry.kind != EntryKind::File {
                            continue;
                        }
                        if let Some(descriptor) = self.classify_entry(repo, &entry).await {
                            assets.push(descriptor);
                        }
                    }
                }
                Err(e) => {
                    // One unreadable directory does not fail the repository
                    warn!("Failed to list {}/{}: {:#}", repo, dir.path, e);
                }
            }
        }

        Ok(assets)
    }

    /// Classify one remote file. Returns `None` for ignored files,
    /// unclassifiable files, and files without a usable download URL.
    async fn classify_entry(&self, repo: &str, entry: &RemoteEntry) -> Option<AssetDescriptor> {
        if self.rules.is_ignored(&entry.name) {
            return None;
        }

        // Content sniffing only for small text files; larger ones classify
        // by extension and name alone.
        let content = if self.should_sniff(entry) {
            match self.source.fetch_file(repo, &entry.path).await {
                Ok(text) => text,
                Err(e) => {
                    // Ambiguity: content predicates simply see no content
                    debug!("Could not sniff {}/{}: {:#}", repo, entry.path, e);
                    None
                }
            }
        } else {
            None
        };

        let candidate = Candidate {
            name: &entry.name,
            dimensions: self.dimensions.dimensions(repo, entry),
            content: content.as_deref(),
        };

        let category = self
            .rules
            .destination(&candidate)
            .unwrap_or_else(|| default_category(&entry.name, content.as_deref()));

        if !category.is_synced() {
            return None;
        }

        let download_url = match &entry.download_url {
            Some(url) => url.clone(),
            None => {
                warn!("{}/{} has no download URL; skipping", repo, entry.path);
                return None;
            }
        };

        Some(AssetDescriptor {
            repo: repo.to_string(),
            path: entry.path.clone(),
            name: entry.name.clone(),
            size: entry.size,
            sha: entry.sha.clone(),
            category,
            content: AssetContent::Remote { download_url },
        })
    }

    fn should_sniff(&self, entry: &RemoteEntry) -> bool {
        TEXT_EXTS.contains(&ext_of(&entry.name).as_str()) && entry.size <= CONTENT_SNIFF_MAX_BYTES
    }

    /// Harvest ASCII-art banners out of a repository README as synthetic
    /// descriptors carrying their content inline.
    async fn extract_readme_banners(
        &self,
        repo: &str,
        readme: &RemoteEntry,
    ) -> Vec<AssetDescriptor> {
        let text = match self.source.fetch_file(repo, &readme.path).await {
            Ok(Some(text)) => text,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to fetch {}/{}: {:#}", repo, readme.path, e);
                return Vec::new();
            }
        };

        extract_banners(&text)
            .into_iter()
            .map(|banner| AssetDescriptor {
                repo: repo.to_string(),
                path: format!("{}#{}", readme.path, banner.name),
                name: banner.name.clone(),
                size: banner.content.len() as u64,
                // Tied to the README revision: a README change re-syncs its banners
                sha: format!("{}_{}", readme.sha, banner.name),
                category: AssetCategory::Banners,
                content: AssetContent::Extracted {
                    text: banner.content,
                },
            })
            .collect()
    }

    /// DIFF: decide which candidates need syncing. Pure with respect to
    /// remote state - dry runs and apply runs see identical plans.
    pub fn plan(&self, assets: &[AssetDescriptor], state: &SyncState) -> SyncPlan {
        let repos_dir = self.config.repos_dir();
        let mut plan = SyncPlan::default();

        for descriptor in assets {
            let local = descriptor.local_path(&repos_dir);
            let key = descriptor.key();

            let kind = if !local.exists() {
                ActionKind::New
            } else if state.stored_sha(&key) != Some(descriptor.sha.as_str()) {
                ActionKind::Update
            } else {
                continue; // unchanged: no fetch, no manifest touch
            };

            plan.actions.push(SyncAction {
                descriptor: descriptor.clone(),
                kind,
            });
        }

        plan
    }

    /// FETCH + RECORD: retrieve every planned asset, then persist state and
    /// manifests once and rebuild the master manifest from disk.
    ///
    /// Fetches run in parallel up to `sync.max_parallel`; all state and
    /// manifest mutation happens in this single collector task. A failed
    /// asset is reported and left unrecorded so the next run retries it.
    pub async fn apply(&self, plan: SyncPlan, state: &mut SyncState) -> Result<SyncSummary> {
        let start = Instant::now();
        let mut summary = SyncSummary::default();

        if plan.is_empty() {
            summary.duration = start.elapsed();
            return Ok(summary);
        }

        let repos_dir = self.config.repos_dir();
        let fetch_timeout = Duration::from_secs(self.config.sync.timeout);
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.sync.max_parallel));

        let mut futures = FuturesUnordered::new();

        for action in plan.actions {
            let semaphore = semaphore.clone();
            let source = self.source.clone();
            let local = action.descriptor.local_path(&repos_dir);

            futures.push(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                let result = fetch_one(source.as_ref(), &action.descriptor, &local, fetch_timeout)
                    .await;
                (action.descriptor, result)
            });
        }

        let mut manifests: HashMap<AssetCategory, Manifest> = HashMap::new();

        while let Some((descriptor, result)) = futures.next().await {
            let key = descriptor.key();
            match result {
                Ok(()) => {
                    state.record(&key, &descriptor.sha);

                    let manifest = manifests
                        .entry(descriptor.category)
                        .or_insert_with(|| Manifest::load(&repos_dir, descriptor.category));
                    manifest.add(ManifestEntry {
                        filename: descriptor.name.clone(),
                        source_repo: descriptor.repo.clone(),
                        source_path: descriptor.path.clone(),
                        sha: descriptor.sha.clone(),
                        size: descriptor.size,
                        synced_at: Utc::now(),
                        download_url: descriptor.locator().to_string(),
                    });

                    info!("Synced {}", key);
                    summary.synced.push(key);
                }
                Err(e) => {
                    error!("Failed to sync {}: {:#}", key, e);
                    summary.failed.push(SyncFailure {
                        key,
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        if !summary.synced.is_empty() {
            for manifest in manifests.values() {
                manifest.save()?;
            }

            state.last_sync = Some(Utc::now());
            state
                .save(&self.config.state_file())
                .context("Failed to persist sync state")?;

            // Always rebuilt from the category manifests on disk
            let master = MasterManifest::rebuild(&repos_dir, &self.config.organization);
            master.save(&repos_dir)?;
        }

        summary.duration = start.elapsed();

        info!(
            "Sync completed in {:.2}s: {} synced, {} failed",
            summary.duration.as_secs_f64(),
            summary.synced.len(),
            summary.failed.len()
        );

        Ok(summary)
    }
}

/// Fetch one asset into place: inline content is written directly, remote
/// content is downloaded via its locator.
async fn fetch_one(
    source: &dyn RemoteSource,
    descriptor: &AssetDescriptor,
    local: &std::path::Path,
    fetch_timeout: Duration,
) -> Result<()> {
    let bytes = match &descriptor.content {
        AssetContent::Extracted { text } => text.clone().into_bytes(),
        AssetContent::Remote { download_url } => {
            match timeout(fetch_timeout, source.download(download_url)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(anyhow!(
                        "Download timed out after {}s",
                        fetch_timeout.as_secs()
                    ))
                }
            }
        }
    };

    if let Some(parent) = local.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    tokio::fs::write(local, bytes)
        .await
        .with_context(|| format!("Failed to write {}", local.display()))?;

    Ok(())
}
