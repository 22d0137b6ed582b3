//! Discovered asset records
//!
//! An [`AssetDescriptor`] is one candidate found during a remote scan. Its
//! byte content is reachable through exactly one of two channels, enforced by
//! the [`AssetContent`] tagged union: a fetch locator for ordinary files, or
//! inline text for banners harvested out of a README.

use crate::category::AssetCategory;
use std::path::{Path, PathBuf};

/// Locator recorded in manifests for assets with no download URL
pub const EXTRACTED_LOCATOR: &str = "(extracted from README)";

/// Where an asset's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetContent {
    /// Ordinary remote file, retrieved via its download URL
    Remote { download_url: String },
    /// Synthetic asset whose content was extracted at scan time
    Extracted { text: String },
}

/// One candidate asset discovered at scan time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Source repository name
    pub repo: String,
    /// Path within the source repository
    pub path: String,
    /// File name (also the destination file name)
    pub name: String,
    /// Size in bytes as reported by the source
    pub size: u64,
    /// Opaque content hash; equality is the only operation
    pub sha: String,
    /// Assigned category
    pub category: AssetCategory,
    /// Content channel
    pub content: AssetContent,
}

impl AssetDescriptor {
    /// Stable identity: `category/repo/name`. Primary key into the sync
    /// state and the category manifests.
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.category, self.repo, self.name)
    }

    /// Destination path under the mirror root: `repos/{category}/{repo}/{name}`
    pub fn local_path(&self, repos_dir: &Path) -> PathBuf {
        repos_dir
            .join(self.category.as_str())
            .join(&self.repo)
            .join(&self.name)
    }

    /// Locator string recorded in manifests
    pub fn locator(&self) -> &str {
        match &self.content {
            AssetContent::Remote { download_url } => download_url,
            AssetContent::Extracted { .. } => EXTRACTED_LOCATOR,
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self.content, AssetContent::Extracted { .. })
    }
}
