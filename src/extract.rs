//! Banner extraction from README text
//!
//! Finds fenced code blocks and keeps the ones that look like ASCII/ANSI art
//! rather than code samples. This is a heuristic, not a parser; the character
//! set and code-indicator list below are the entire definition of "art" and
//! are exported so tests can enumerate them.

use regex::Regex;

/// Characters that mark a text block as ASCII/Unicode art
pub const ART_CHARS: &str = "█▓▒░╔╗╚╝║═│─┌┐└┘├┤┬┴┼╭╮╯╰▀▄▌▐■□▪▫●○◆◇★☆";

/// ANSI escape sequence introducer
pub const ANSI_ESCAPE: &str = "\x1b[";

/// Substrings that mark a fenced block as a code sample, not art. A block
/// containing any of these is rejected even if it has qualifying characters.
pub const CODE_INDICATORS: &[&str] = &[
    "import ",
    "def ",
    "class ",
    "function ",
    "const ",
    "let ",
    "var ",
    "return ",
    "if (",
    "for (",
    "#!/",
    "pip ",
    "npm ",
    "git ",
    "python ",
    "$ ",
    "# Install",
    "brew ",
    "cargo ",
];

/// Blocks with this many characters or fewer (after trimming) are rejected
pub const MIN_BANNER_LEN: usize = 20;

/// Base file name for the first harvested banner; later ones get `_N` suffixes
pub const BANNER_BASE_NAME: &str = "readme_banner";

/// A banner harvested from README text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBanner {
    /// Synthetic file name (`readme_banner.txt`, `readme_banner_2.txt`, ...)
    pub name: String,
    /// Trimmed block content
    pub content: String,
}

/// True if the text contains an ANSI escape or any art character
pub fn is_ascii_art(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    text.contains(ANSI_ESCAPE) || text.chars().any(|c| ART_CHARS.contains(c))
}

/// Extract ASCII-art banners from fenced code blocks in README text.
///
/// Blocks are visited in document order; survivors are numbered from 1 and
/// named accordingly. Language tags on the fence are ignored.
pub fn extract_banners(readme: &str) -> Vec<ExtractedBanner> {
    // Non-greedy across lines so adjacent fences don't merge
    let fenced = match Regex::new(r"(?s)```[^\n]*\n(.*?)```") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut banners = Vec::new();

    for capture in fenced.captures_iter(readme) {
        let block = capture[1].trim();

        if block.chars().count() <= MIN_BANNER_LEN {
            continue;
        }
        if !is_ascii_art(block) {
            continue;
        }
        if CODE_INDICATORS
            .iter()
            .any(|indicator| block.contains(indicator))
        {
            continue;
        }

        let ordinal = banners.len() + 1;
        let name = if ordinal == 1 {
            format!("{}.txt", BANNER_BASE_NAME)
        } else {
            format!("{}_{}.txt", BANNER_BASE_NAME, ordinal)
        };

        banners.push(ExtractedBanner {
            name,
            content: block.to_string(),
        });
    }

    banners
}
