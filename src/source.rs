//! Remote source abstraction and the GitHub implementation
//!
//! The sync engine talks to a [`RemoteSource`]: list an organization's
//! repositories, list a directory inside one, fetch decodable file content,
//! download raw bytes. Implement the trait to scan a different host; the
//! tests drive the engine with an in-memory implementation.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use std::env;
use std::process::Command;
use tracing::{debug, info, warn};

/// A repository as reported by the remote host
#[derive(Debug, Clone)]
pub struct RemoteRepo {
    pub name: String,
    pub description: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Directory entry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry of a remote directory listing
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    /// File or directory name
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Opaque content hash assigned by the host
    pub sha: String,
    /// Raw download URL, when the host provides one
    pub download_url: Option<String>,
    /// Path within the repository
    pub path: String,
}

/// Remote host the scanner enumerates and fetches from
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Repositories of an organization
    async fn list_repositories(&self, org: &str) -> Result<Vec<RemoteRepo>>;

    /// Entries of a directory (`path` empty for the repository root)
    async fn list_directory(&self, repo: &str, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Decoded text content of a file, `None` when the host cannot decode it
    async fn fetch_file(&self, repo: &str, path: &str) -> Result<Option<String>>;

    /// Raw bytes behind a download URL
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// GitHub authentication strategies
#[derive(Debug, Clone)]
pub enum AuthStrategy {
    /// Use GitHub CLI authentication
    GitHubCli,
    /// Use environment variable token
    EnvironmentToken,
    /// No credentials; public organizations only
    Anonymous,
}

/// GitHub-backed remote source
pub struct GitHubSource {
    client: Octocrab,
    http: reqwest::Client,
    org: String,
}

impl GitHubSource {
    /// Create a source for one organization, detecting authentication
    /// automatically: `gh` CLI first, then `GITHUB_TOKEN`, then anonymous.
    pub fn new(org: &str) -> Result<Self> {
        let (strategy, token) = Self::detect_authentication();

        info!("Using authentication strategy: {:?}", strategy);

        let client = match token {
            Some(token) => Octocrab::builder()
                .personal_token(token)
                .build()
                .context("Failed to create GitHub client")?,
            None => {
                warn!("No GitHub credentials found; proceeding unauthenticated (rate limits apply)");
                Octocrab::builder()
                    .build()
                    .context("Failed to create GitHub client")?
            }
        };

        let http = reqwest::Client::builder()
            .user_agent(concat!("assetsentry/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            http,
            org: org.to_string(),
        })
    }

    /// Detect and obtain GitHub authentication
    fn detect_authentication() -> (AuthStrategy, Option<String>) {
        if let Ok(token) = Self::try_github_cli() {
            (AuthStrategy::GitHubCli, Some(token))
        } else if let Ok(token) = Self::try_environment_token() {
            (AuthStrategy::EnvironmentToken, Some(token))
        } else {
            (AuthStrategy::Anonymous, None)
        }
    }

    /// Try to get token from GitHub CLI
    fn try_github_cli() -> Result<String> {
        debug!("Attempting GitHub CLI authentication");

        if !Self::is_command_available("gh") {
            return Err(anyhow!("GitHub CLI (gh) is not installed"));
        }

        let auth_status = Command::new("gh")
            .args(["auth", "status"])
            .output()
            .context("Failed to check GitHub CLI auth status")?;

        if !auth_status.status.success() {
            return Err(anyhow!(
                "GitHub CLI is not authenticated. Run: gh auth login"
            ));
        }

        let token_output = Command::new("gh")
            .args(["auth", "token"])
            .output()
            .context("Failed to get GitHub CLI token")?;

        if !token_output.status.success() {
            return Err(anyhow!(
                "Failed to retrieve token from GitHub CLI: {}",
                String::from_utf8_lossy(&token_output.stderr)
            ));
        }

        let token = String::from_utf8(token_output.stdout)
            .context("GitHub CLI token is not valid UTF-8")?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(anyhow!("GitHub CLI returned empty token"));
        }

        debug!("Successfully obtained token from GitHub CLI");
        Ok(token)
    }

    /// Try to get token from environment variable
    fn try_environment_token() -> Result<String> {
        debug!("Attempting environment variable authentication");

        let token =
            env::var("GITHUB_TOKEN").context("GITHUB_TOKEN environment variable not set")?;

        if token.is_empty() {
            return Err(anyhow!("GITHUB_TOKEN is empty"));
        }

        debug!("Successfully found GITHUB_TOKEN environment variable");
        Ok(token)
    }

    /// Check if a command is available in PATH
    fn is_command_available(command: &str) -> bool {
        Command::new("which")
            .arg(command)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn entry_from_content(item: octocrab::models::repos::Content) -> RemoteEntry {
        let kind = if item.r#type == "dir" {
            EntryKind::Dir
        } else {
            EntryKind::File
        };

        RemoteEntry {
            name: item.name,
            kind,
            size: item.size.max(0) as u64,
            sha: item.sha,
            download_url: item.download_url,
            path: item.path,
        }
    }
}

#[async_trait]
impl RemoteSource for GitHubSource {
    async fn list_repositories(&self, org: &str) -> Result<Vec<RemoteRepo>> {
        debug!("Fetching repositories for organization: {}", org);

        let mut repositories = Vec::new();
        let mut page = 1u8;

        loop {
            let page_repos = self
                .client
                .orgs(org)
                .list_repos()
                .per_page(100)
                .page(page)
                .send()
                .await
                .with_context(|| {
                    format!(
                        "Failed to fetch repositories for organization {} page {}",
                        org, page
                    )
                })?;

            let items = page_repos.items;
            if items.is_empty() {
                break;
            }

            repositories.extend(items.into_iter().map(|repo| RemoteRepo {
                name: repo.name,
                description: repo.description,
                updated_at: repo.updated_at,
            }));

            // GitHub API pagination limit for u8
            if page >= 255 {
                warn!("Reached maximum pagination limit (255 pages) for org: {}", org);
                break;
            }
            page += 1;
        }

        info!(
            "Found {} repositories for organization: {}",
            repositories.len(),
            org
        );
        Ok(repositories)
    }

    async fn list_directory(&self, repo: &str, path: &str) -> Result<Vec<RemoteEntry>> {
        debug!("Listing {}/{} at '{}'", self.org, repo, path);

        let repos = self.client.repos(self.org.as_str(), repo);
        let mut request = repos.get_content();
        if !path.is_empty() {
            request = request.path(path);
        }

        let contents = request
            .send()
            .await
            .with_context(|| format!("Failed to list {}/{} at '{}'", self.org, repo, path))?;

        Ok(contents
            .items
            .into_iter()
            .map(Self::entry_from_content)
            .collect())
    }

    async fn fetch_file(&self, repo: &str, path: &str) -> Result<Option<String>> {
        debug!("Fetching {}/{}:{}", self.org, repo, path);

        let contents = self
            .client
            .repos(self.org.as_str(), repo)
            .get_content()
            .path(path)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}/{}:{}", self.org, repo, path))?;

        let item = contents.items.into_iter().next();
        Ok(item.and_then(|content| content.decoded_content()))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?
            .error_for_status()
            .with_context(|| format!("Download of {} returned an error status", url))?;

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        Ok(bytes.to_vec())
    }
}
