//! Local organize pass - rule-driven filing of loose files
//!
//! Files dropped into the mirror root are run through the same ignore list
//! and rule set as remote candidates and moved into their destination
//! category directory. Dry run by default, like the remote sync.

use crate::classify::{ext_of, CONTENT_SNIFF_MAX_BYTES, TEXT_EXTS};
use crate::config::Config;
use crate::rules::{Candidate, ImageProbe, RuleSet};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// One planned or executed move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Files sitting in the mirror root (not in subdirectories), ignore list
/// already applied.
pub fn root_files(config: &Config, rules: &RuleSet) -> Result<Vec<PathBuf>> {
    let root = config.assets_root();
    let mut files = Vec::new();

    let entries = std::fs::read_dir(&root)
        .with_context(|| format!("Failed to read assets directory {}", root.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if rules.is_ignored(&name) {
            continue;
        }
        files.push(path);
    }

    files.sort();
    Ok(files)
}

/// Organize root files into category directories. With `apply` false only
/// the would-be moves are returned.
pub fn organize(
    config: &Config,
    rules: &RuleSet,
    probe: &dyn ImageProbe,
    apply: bool,
) -> Result<Vec<Move>> {
    let root = config.assets_root();
    let mut moves = Vec::new();

    for path in root_files(config, rules)? {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };

        // Content for the art predicate: only small text files are read
        let content = if is_sniffable(&name, &path) {
            std::fs::read(&path)
                .ok()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        } else {
            None
        };

        let candidate = Candidate {
            name: &name,
            dimensions: probe.dimensions(&path),
            content: content.as_deref(),
        };

        let destination = match rules.destination(&candidate) {
            Some(category) => category,
            None => {
                debug!("No rule matched {}", name);
                continue;
            }
        };

        let dest_path = root.join(destination.as_str()).join(&name);

        if apply {
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::rename(&path, &dest_path)
                .with_context(|| format!("Failed to move {} to {}", path.display(), dest_path.display()))?;
            info!("Moved {} -> {}/", name, destination);
        }

        moves.push(Move {
            from: path,
            to: dest_path,
        });
    }

    Ok(moves)
}

fn is_sniffable(name: &str, path: &std::path::Path) -> bool {
    if !TEXT_EXTS.contains(&ext_of(name).as_str()) {
        return false;
    }
    path.metadata()
        .map(|meta| meta.len() <= CONTENT_SNIFF_MAX_BYTES)
        .unwrap_or(false)
}
