/// Common test utilities and helpers for AssetSentry tests
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use assetsentry::source::{EntryKind, RemoteEntry, RemoteRepo, RemoteSource};
use assetsentry::sync::DimensionLookup;
use assetsentry::Config;

/// In-memory remote source. Repositories, listings, file texts and raw
/// blobs are declared up front; the engine is then driven against them
/// deterministically and downloads are counted.
#[derive(Default)]
pub struct FixtureSource {
    repos: Vec<RemoteRepo>,
    /// (repo, directory path) -> entries
    listings: HashMap<(String, String), Vec<RemoteEntry>>,
    /// (repo, file path) -> decoded text content
    texts: HashMap<(String, String), String>,
    /// download URL -> raw bytes
    blobs: HashMap<String, Vec<u8>>,
    /// download URLs that fail
    failing: HashSet<String>,
    downloads: AtomicUsize,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_repo(&mut self, name: &str) {
        self.repos.push(RemoteRepo {
            name: name.to_string(),
            description: None,
            updated_at: None,
        });
        // Every known repo has a root listing, possibly empty
        self.listings
            .entry((name.to_string(), String::new()))
            .or_default();
    }

    /// Add a binary file; returns its download URL
    pub fn add_file(&mut self, repo: &str, dir: &str, name: &str, sha: &str, bytes: &[u8]) -> String {
        let path = join_path(dir, name);
        let url = format!("https://raw.test/{}/{}", repo, path);

        self.push_entry(
            repo,
            dir,
            RemoteEntry {
                name: name.to_string(),
                kind: EntryKind::File,
                size: bytes.len() as u64,
                sha: sha.to_string(),
                download_url: Some(url.clone()),
                path,
            },
        );
        self.blobs.insert(url.clone(), bytes.to_vec());
        url
    }

    /// Add a text file whose content the host can decode for sniffing
    pub fn add_text_file(&mut self, repo: &str, dir: &str, name: &str, sha: &str, text: &str) -> String {
        let url = self.add_file(repo, dir, name, sha, text.as_bytes());
        let path = join_path(dir, name);
        self.texts.insert((repo.to_string(), path), text.to_string());
        url
    }

    /// Add a root README with the given text
    pub fn add_readme(&mut self, repo: &str, sha: &str, text: &str) {
        self.add_text_file(repo, "", "README.md", sha, text);
    }

    /// Add a subdirectory entry to the repository root
    pub fn add_dir(&mut self, repo: &str, name: &str) {
        self.push_entry(
            repo,
            "",
            RemoteEntry {
                name: name.to_string(),
                kind: EntryKind::Dir,
                size: 0,
                sha: format!("dir-{}", name),
                download_url: None,
                path: name.to_string(),
            },
        );
        self.listings
            .entry((repo.to_string(), name.to_string()))
            .or_default();
    }

    /// Add a repository whose listings always fail
    pub fn add_broken_repo(&mut self, name: &str) {
        self.repos.push(RemoteRepo {
            name: name.to_string(),
            description: None,
            updated_at: None,
        });
    }

    /// Make a download URL fail
    pub fn fail_url(&mut self, url: &str) {
        self.failing.insert(url.to_string());
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn push_entry(&mut self, repo: &str, dir: &str, entry: RemoteEntry) {
        self.listings
            .entry((repo.to_string(), dir.to_string()))
            .or_default()
            .push(entry);
    }
}

fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

#[async_trait]
impl RemoteSource for FixtureSource {
    async fn list_repositories(&self, _org: &str) -> Result<Vec<RemoteRepo>> {
        Ok(self.repos.clone())
    }

    async fn list_directory(&self, repo: &str, path: &str) -> Result<Vec<RemoteEntry>> {
        self.listings
            .get(&(repo.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("404: {}/{}", repo, path))
    }

    async fn fetch_file(&self, repo: &str, path: &str) -> Result<Option<String>> {
        Ok(self.texts.get(&(repo.to_string(), path.to_string())).cloned())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        if self.failing.contains(url) {
            return Err(anyhow!("503 Service Unavailable: {}", url));
        }
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("404: {}", url))
    }
}

/// Dimension lookup answering from a `repo/name -> (w, h)` table
#[derive(Default)]
pub struct FixtureDimensions(pub HashMap<String, (u32, u32)>);

impl FixtureDimensions {
    pub fn with(mut self, repo: &str, name: &str, width: u32, height: u32) -> Self {
        self.0.insert(format!("{}/{}", repo, name), (width, height));
        self
    }
}

impl DimensionLookup for FixtureDimensions {
    fn dimensions(&self, repo: &str, entry: &RemoteEntry) -> Option<(u32, u32)> {
        self.0.get(&format!("{}/{}", repo, entry.name)).copied()
    }
}

/// Config rooted in a temp directory, pointing at the fixture organization
pub fn test_config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.organization = "haKC-ai".to_string();
    config.assets_dir = temp.path().to_string_lossy().to_string();
    config
}
