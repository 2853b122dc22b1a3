//! Harvested content types.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A normalized text snippet and the candidate URL it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub text: String,
    pub source: String,
}

/// Unique content items gathered during one run.
///
/// Uniqueness is exact string equality after trimming. Items shorter than
/// the minimum length (in characters) are noise and never inserted. Items
/// keep their first-seen order and provenance.
#[derive(Debug, Clone)]
pub struct ResultSet {
    items: Vec<ContentItem>,
    seen: HashSet<String>,
    min_chars: usize,
}

impl ResultSet {
    /// Creates an empty set that rejects items shorter than `min_chars`.
    pub fn new(min_chars: usize) -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            min_chars,
        }
    }

    /// Inserts one snippet. Returns true if it was new and long enough.
    pub fn insert(&mut self, text: &str, source: &str) -> bool {
        let text = text.trim();
        if text.chars().count() < self.min_chars || self.seen.contains(text) {
            return false;
        }
        self.seen.insert(text.to_string());
        self.items.push(ContentItem {
            text: text.to_string(),
            source: source.to_string(),
        });
        true
    }

    /// Merges snippets from one candidate, returning how many were added.
    pub fn extend<I, S>(&mut self, texts: I, source: &str) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        texts
            .into_iter()
            .filter(|t| self.insert(t.as_ref(), source))
            .count()
    }

    /// Keeps at most `cap` items.
    pub fn truncate(&mut self, cap: usize) {
        if self.items.len() > cap {
            for dropped in self.items.drain(cap..) {
                self.seen.remove(&dropped.text);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.seen.contains(text.trim())
    }

    /// Returns the items.
    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    /// Returns the item texts.
    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|i| i.text.clone()).collect()
    }

    pub fn into_items(self) -> Vec<ContentItem> {
        self.items
    }
}

/// Removes duplicate strings, keeping the first occurrence. Idempotent.
pub fn dedup_texts<I, S>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    texts
        .into_iter()
        .map(Into::into)
        .filter(|t: &String| seen.insert(t.clone()))
        .collect()
}

/// A trending topic label, optionally hashtag-prefixed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrendLabel(String);

impl TrendLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_hashtag(&self) -> bool {
        self.0.starts_with('#')
    }

    /// The label without its leading `#`.
    pub fn tag(&self) -> &str {
        self.0.strip_prefix('#').unwrap_or(&self.0)
    }
}

impl std::fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A trend label paired with a URL that leads to its timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendTarget {
    pub label: String,
    pub url: String,
}

impl TrendTarget {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}
