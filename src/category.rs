//! Asset categories - the closed set of semantic asset kinds
//!
//! Every discovered file resolves to exactly one category, which doubles as
//! the destination path segment under the local mirror. Matching on the enum
//! is exhaustive everywhere so adding a category is a compile-checked change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic asset categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    /// Raster and vector images
    Images,
    /// Video files
    Media,
    /// ASCII/ANSI art text files (standalone or README-extracted)
    Banners,
    /// Square imagery used as icons
    Icons,
    /// Presentation PDFs
    Slidedecks,
    /// Written documents
    Documents,
    /// Anything unclassified; never synced
    Other,
}

impl AssetCategory {
    /// All categories, in manifest/display order
    pub const ALL: [AssetCategory; 7] = [
        AssetCategory::Images,
        AssetCategory::Media,
        AssetCategory::Banners,
        AssetCategory::Icons,
        AssetCategory::Slidedecks,
        AssetCategory::Documents,
        AssetCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Images => "images",
            AssetCategory::Media => "media",
            AssetCategory::Banners => "banners",
            AssetCategory::Icons => "icons",
            AssetCategory::Slidedecks => "slidedecks",
            AssetCategory::Documents => "documents",
            AssetCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "images" => Some(AssetCategory::Images),
            "media" => Some(AssetCategory::Media),
            "banners" => Some(AssetCategory::Banners),
            "icons" => Some(AssetCategory::Icons),
            "slidedecks" => Some(AssetCategory::Slidedecks),
            "documents" => Some(AssetCategory::Documents),
            "other" => Some(AssetCategory::Other),
            _ => None,
        }
    }

    /// Categories that actually receive synced files
    pub fn is_synced(&self) -> bool {
        !matches!(self, AssetCategory::Other)
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
