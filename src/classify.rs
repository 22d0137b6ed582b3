//! Default content classification policy
//!
//! Applied when no explicit rule fires, e.g. while scanning remote
//! repositories where directory-based rules are looser than the local
//! organizer's. Checks run in a fixed order and the first hit wins.
//!
//! Extension tables live here as data so the policy can be enumerated by
//! tests rather than reverse-engineered out of branches.

use crate::category::AssetCategory;

/// Extensions that qualify a file whose stem contains "icon"
pub const ICON_EXTS: &[&str] = &[".png", ".jpg", ".svg", ".ico"];

/// Video container extensions
pub const VIDEO_EXTS: &[&str] = &[".mp4", ".webm", ".mov", ".m4v"];

/// Plain/art text extensions (the empty string covers extension-less files)
pub const TEXT_EXTS: &[&str] = &[".txt", ".ans", ".asc", ".nfo", ""];

/// Raster/vector image extensions
pub const IMAGE_EXTS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"];

/// File-name hints that a text file is a banner
pub const BANNER_NAME_HINTS: &[&str] = &["banner", "ascii", "logo"];

/// Block characters whose presence marks text content as a banner. A
/// narrower set than the extractor's art alphabet: for whole files, solid
/// block glyphs are the reliable signal.
pub const BLOCK_CHARS: &[char] = &['█', '▓', '▒', '░'];

/// Content is only fetched for sniffing when the file is at most this many
/// bytes. Larger text files classify by extension and name alone. One
/// ceiling governs both the remote scanner and the local rule engine.
pub const CONTENT_SNIFF_MAX_BYTES: u64 = 50_000;

/// Lowercased extension of a file name, with leading dot (empty if none)
pub fn ext_of(name: &str) -> String {
    match name.rfind('.') {
        // A leading dot is a hidden file, not an extension
        Some(idx) if idx > 0 => name[idx..].to_lowercase(),
        _ => String::new(),
    }
}

/// Lowercased stem (name without extension) of a file name
pub fn stem_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[..idx].to_lowercase(),
        _ => name.to_lowercase(),
    }
}

/// Classify a file by name and (optionally) content. Never fails: files
/// that fit nowhere land in [`AssetCategory::Other`].
pub fn default_category(name: &str, content: Option<&str>) -> AssetCategory {
    let ext = ext_of(name);
    let stem = stem_of(name);

    if stem.contains("icon") && ICON_EXTS.contains(&ext.as_str()) {
        return AssetCategory::Icons;
    }

    if VIDEO_EXTS.contains(&ext.as_str()) {
        return AssetCategory::Media;
    }

    if TEXT_EXTS.contains(&ext.as_str()) {
        if BANNER_NAME_HINTS.iter().any(|hint| stem.contains(hint)) {
            return AssetCategory::Banners;
        }
        if let Some(text) = content {
            if text.chars().any(|c| BLOCK_CHARS.contains(&c)) {
                return AssetCategory::Banners;
            }
        }
        // Text without banner evidence is not worth mirroring
        return AssetCategory::Other;
    }

    if IMAGE_EXTS.contains(&ext.as_str()) {
        return AssetCategory::Images;
    }

    if ext == ".pdf" {
        return AssetCategory::Slidedecks;
    }

    AssetCategory::Other
}
