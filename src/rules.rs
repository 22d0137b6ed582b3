//! Prioritized classification rules
//!
//! Rules are declared in the configuration file, sorted by ascending
//! priority, and evaluated first-match-wins: order specific rules before
//! general ones. All predicates inside one rule must hold (logical AND).
//! Predicates that need data the caller could not determine (image
//! dimensions, file content) evaluate false rather than erroring.

use crate::category::AssetCategory;
use crate::classify::{ext_of, stem_of};
use crate::extract::is_ascii_art;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Aspect-ratio classes a rule can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    /// Width/height within [0.9, 1.1]
    Square,
}

/// Content predicates a rule can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentPattern {
    /// ANSI escapes or art characters (see [`crate::extract::ART_CHARS`])
    AsciiArt,
}

/// Predicate set for one rule; absent fields always match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleMatch {
    /// Lowercased extension must be in this set (with leading dot)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,

    /// Required aspect-ratio class (raster images only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,

    /// Larger pixel dimension must not exceed this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dimension: Option<u32>,

    /// Lowercased stem must contain one of these substrings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<Vec<String>>,

    /// Content must match this pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_contains: Option<ContentPattern>,
}

/// One classification rule: ordered predicate plus destination category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Lower evaluates first
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// Category assigned when the predicate set holds
    pub destination: AssetCategory,

    /// Predicates, all of which must hold
    #[serde(default, rename = "match")]
    pub matcher: RuleMatch,
}

fn default_priority() -> u32 {
    99
}

/// Everything known about a candidate file at evaluation time. Dimensions
/// and content are optional: when absent, predicates that need them fail.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// File name (no directory components)
    pub name: &'a str,
    /// Pixel dimensions, if a probe could determine them
    pub dimensions: Option<(u32, u32)>,
    /// File content, if it was cheap to obtain
    pub content: Option<&'a str>,
}

impl<'a> Candidate<'a> {
    pub fn named(name: &'a str) -> Self {
        Self {
            name,
            dimensions: None,
            content: None,
        }
    }
}

/// An ordered rule list plus the ignore list that preempts it
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    ignore: Vec<String>,
}

impl RuleSet {
    pub fn new(mut rules: Vec<Rule>, ignore: Vec<String>) -> Self {
        // Stable sort keeps declaration order among equal priorities
        rules.sort_by_key(|rule| rule.priority);
        Self { rules, ignore }
    }

    /// Check the ignore list: exact file name or `*.ext` glob
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.iter().any(|pattern| {
            if pattern.contains('*') {
                let pattern_regex = pattern.replace('.', r"\.").replace('*', ".*");

                regex::Regex::new(&format!("^{}$", pattern_regex))
                    .map(|re| re.is_match(name))
                    .unwrap_or(false)
            } else {
                name == pattern
            }
        })
    }

    /// Destination category for a candidate, or `None` when ignored or no
    /// rule matches. "No match" is a normal outcome, not an error.
    pub fn destination(&self, candidate: &Candidate<'_>) -> Option<AssetCategory> {
        if self.is_ignored(candidate.name) {
            return None;
        }

        self.rules
            .iter()
            .find(|rule| rule_matches(rule, candidate))
            .map(|rule| rule.destination)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

fn rule_matches(rule: &Rule, candidate: &Candidate<'_>) -> bool {
    let matcher = &rule.matcher;
    let ext = ext_of(candidate.name);

    if let Some(extensions) = &matcher.extensions {
        if !extensions.iter().any(|e| e.to_lowercase() == ext) {
            return false;
        }
    }

    if let Some(AspectRatio::Square) = matcher.aspect_ratio {
        match candidate.dimensions {
            Some((w, h)) if is_square(w, h) => {}
            _ => return false,
        }
    }

    if let Some(ceiling) = matcher.max_dimension {
        match candidate.dimensions {
            Some((w, h)) if w.max(h) <= ceiling => {}
            _ => return false,
        }
    }

    if let Some(patterns) = &matcher.name_contains {
        let stem = stem_of(candidate.name);
        if !patterns.iter().any(|p| stem.contains(&p.to_lowercase())) {
            return false;
        }
    }

    if let Some(ContentPattern::AsciiArt) = matcher.content_contains {
        match candidate.content {
            Some(text) if is_ascii_art(text) => {}
            _ => return false,
        }
    }

    true
}

/// Square within a 10% tolerance band
fn is_square(width: u32, height: u32) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    let ratio = width as f64 / height as f64;
    (0.9..=1.1).contains(&ratio)
}

/// Supplies pixel dimensions for local raster files. Dimension-gated
/// predicates fail closed when a probe returns `None`.
pub trait ImageProbe: Send + Sync {
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)>;
}

/// Probe backed by the `sips` image tool (macOS). Any failure - missing
/// binary, undecodable file - yields `None`.
pub struct SipsProbe;

impl ImageProbe for SipsProbe {
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)> {
        let output = Command::new("sips")
            .args(["-g", "pixelWidth", "-g", "pixelHeight"])
            .arg(path)
            .output()
            .ok()?;

        if !output.status.success() {
            debug!("sips failed for {}", path.display());
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut width = None;
        let mut height = None;
        for line in stdout.lines() {
            let value = line.split_whitespace().last();
            if line.contains("pixelWidth") {
                width = value.and_then(|v| v.parse().ok());
            } else if line.contains("pixelHeight") {
                height = value.and_then(|v| v.parse().ok());
            }
        }

        width.zip(height)
    }
}

/// Probe that never answers; dimension-gated rules never match with it
pub struct NoProbe;

impl ImageProbe for NoProbe {
    fn dimensions(&self, _path: &Path) -> Option<(u32, u32)> {
        None
    }
}
