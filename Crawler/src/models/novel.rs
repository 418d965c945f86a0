// src/models/novel.rs

//! Normalized description of one ranked work.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Longest description kept on a record, in user-perceived characters.
pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// Appended to descriptions cut at [`DESCRIPTION_MAX_CHARS`].
pub const ELLIPSIS: &str = "...";

static AUTHOR_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:作者\s*[：:]?|author\s*[：:])\s*").expect("author label pattern")
});

/// Publication status as shown on the ranking pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NovelStatus {
    /// Still being published
    #[default]
    #[serde(rename = "连载", alias = "serialized")]
    Serialized,

    /// Finished
    #[serde(rename = "完结", alias = "completed")]
    Completed,
}

impl NovelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NovelStatus::Serialized => "连载",
            NovelStatus::Completed => "完结",
        }
    }
}

impl fmt::Display for NovelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a ranking snapshot.
///
/// Records are produced fresh on every crawl and carry no identity beyond
/// their position in the snapshot they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelRecord {
    /// 1-based position within the snapshot
    pub rank: u32,

    /// Work title, never empty
    pub title: String,

    /// Author name with any leading label removed
    #[serde(default)]
    pub author: String,

    /// Absolute cover image URL, or empty
    #[serde(default)]
    pub cover_url: String,

    /// Absolute URL of the work's page
    #[serde(default)]
    pub source_url: String,

    /// Blurb, at most 200 characters plus an ellipsis
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: NovelStatus,

    #[serde(default)]
    pub total_chapters: Option<u32>,
}

impl NovelRecord {
    /// Create a record with only rank and title set.
    pub fn new(rank: u32, title: impl Into<String>) -> Self {
        Self {
            rank,
            title: title.into(),
            author: String::new(),
            cover_url: String::new(),
            source_url: String::new(),
            description: String::new(),
            status: NovelStatus::default(),
            total_chapters: None,
        }
    }
}

/// Cut a description to [`DESCRIPTION_MAX_CHARS`] and mark the cut.
///
/// Counting is done on grapheme clusters so a cut never splits a character.
pub fn truncate_description(text: &str) -> String {
    let text = text.trim();
    let mut graphemes = text.grapheme_indices(true);
    match graphemes.nth(DESCRIPTION_MAX_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Strip a leading "作者：" / "author:" label from an author string.
pub fn clean_author(raw: &str) -> String {
    AUTHOR_LABEL.replace(raw, "").trim().to_string()
}
