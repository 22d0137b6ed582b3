use anyhow::{bail, Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use shellexpand;
use std::path::{Path, PathBuf};

use crate::category::AssetCategory;
use crate::rules::{AspectRatio, ContentPattern, Rule, RuleMatch, RuleSet};

/// Main configuration structure for AssetSentry
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// GitHub organization whose repositories are scanned
    pub organization: String,

    /// Root directory of the local asset mirror
    pub assets_dir: String,

    /// Classification rules, evaluated in ascending priority order
    #[serde(default = "default_rules")]
    pub rules: Vec<Rule>,

    /// File names (exact or `*.ext` glob) excluded before rule evaluation
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Remote scanning and fetching behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Watch mode configuration
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote scanning and fetching configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// Repository subdirectories scanned for assets (besides the root)
    #[serde(default = "default_source_dirs")]
    pub source_dirs: Vec<String>,

    /// Repositories never scanned
    #[serde(default)]
    pub exclude_repos: Vec<String>,

    /// The mirror's own repository; always skipped
    #[serde(default = "default_self_repo")]
    pub self_repo: String,

    /// Maximum parallel fetch operations
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Timeout for a single fetch in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Watch mode configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Interval between iterations
    #[serde(default = "default_interval")]
    pub interval: String, // "30m"
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_source_dirs() -> Vec<String> {
    [
        "media",
        "img",
        "images",
        "assets",
        "icons",
        "banner",
        "banners",
        "art",
        "screenshots",
        "docs",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_self_repo() -> String {
    "AssetSentry".to_string()
}
fn default_max_parallel() -> usize {
    4
}
fn default_timeout() -> u64 {
    120
}
fn default_interval() -> String {
    "30m".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

fn default_ignore() -> Vec<String> {
    [
        "README.md",
        "LICENSE",
        "manifest.json",
        ".sync_state.json",
        ".gitignore",
        "*.yml",
        "*.lock",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// The stock rule set: specific rules (square icons, art text) ahead of the
/// general extension buckets.
fn default_rules() -> Vec<Rule> {
    let exts = |list: &[&str]| Some(list.iter().map(|s| s.to_string()).collect());

    vec![
        Rule {
            priority: 1,
            destination: AssetCategory::Icons,
            matcher: RuleMatch {
                extensions: exts(&[".png", ".jpg", ".svg", ".ico"]),
                aspect_ratio: Some(AspectRatio::Square),
                max_dimension: Some(1024),
                ..Default::default()
            },
        },
        Rule {
            priority: 5,
            destination: AssetCategory::Banners,
            matcher: RuleMatch {
                extensions: exts(&[".txt", ".ans", ".asc", ".nfo"]),
                content_contains: Some(ContentPattern::AsciiArt),
                ..Default::default()
            },
        },
        Rule {
            priority: 10,
            destination: AssetCategory::Images,
            matcher: RuleMatch {
                extensions: exts(&[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"]),
                ..Default::default()
            },
        },
        Rule {
            priority: 15,
            destination: AssetCategory::Media,
            matcher: RuleMatch {
                extensions: exts(&[".mp4", ".webm", ".mov", ".m4v"]),
                ..Default::default()
            },
        },
        Rule {
            priority: 20,
            destination: AssetCategory::Slidedecks,
            matcher: RuleMatch {
                extensions: exts(&[".pdf"]),
                ..Default::default()
            },
        },
        Rule {
            priority: 25,
            destination: AssetCategory::Documents,
            matcher: RuleMatch {
                extensions: exts(&[".doc", ".docx", ".rtf"]),
                ..Default::default()
            },
        },
    ]
}

// Default implementations
impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_dirs: default_source_dirs(),
            exclude_repos: Vec::new(),
            self_repo: default_self_repo(),
            max_parallel: default_max_parallel(),
            timeout: default_timeout(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            color: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from the default location or create a default config
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let mut config = Self::default();

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }

            // Persist the portable form, run with the expanded one
            config.save(&config_path)?;
            config.expand_paths()?;

            tracing::info!("Created default configuration at: {:?}", config_path);
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.expand_paths()?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("assetsentry").join("config.yml"))
    }

    /// Expand environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.assets_dir = shellexpand::full(&self.assets_dir)
            .context("Failed to expand assets_dir path")?
            .into_owned();

        Ok(())
    }

    /// Reject configurations no scan could run against. Checked before any
    /// remote call is made.
    pub fn validate(&self) -> Result<()> {
        if self.organization.trim().is_empty() {
            bail!("Configuration error: 'organization' must not be empty");
        }
        if self.assets_dir.trim().is_empty() {
            bail!("Configuration error: 'assets_dir' must not be empty");
        }
        if self.sync.max_parallel == 0 {
            bail!("Configuration error: 'sync.max_parallel' must be at least 1");
        }
        Ok(())
    }

    /// Root of the local asset mirror
    pub fn assets_root(&self) -> PathBuf {
        PathBuf::from(&self.assets_dir)
    }

    /// Directory holding synced assets: `{assets_dir}/repos/{category}/{repo}/{file}`
    pub fn repos_dir(&self) -> PathBuf {
        self.assets_root().join("repos")
    }

    /// Sync state file location
    pub fn state_file(&self) -> PathBuf {
        self.assets_root().join(".sync_state.json")
    }

    /// Build the rule set from the configured rules and ignore list
    pub fn rule_set(&self) -> RuleSet {
        RuleSet::new(self.rules.clone(), self.ignore.clone())
    }

    /// True if a repository must not be scanned
    pub fn is_repo_excluded(&self, repo: &str) -> bool {
        repo == self.sync.self_repo || self.sync.exclude_repos.iter().any(|r| r == repo)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            organization: "MKSG-MugunthKumar".to_string(),
            assets_dir: "${HOME}/assets".to_string(),
            rules: default_rules(),
            ignore: default_ignore(),
            sync: SyncConfig::default(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
