//! Clause records produced by the segmenter.

use std::fmt;

use serde::{Deserialize, Serialize};

const PREAMBLE_ID: &str = "clause_preamble";

/// Stable, unique identifier for a clause.
///
/// `clause_preamble` for the text before the first numbered marker,
/// `clause_<n>` for numbered clauses, and `clause_<n>_<k>` (k >= 2) when an
/// ordinal repeats within one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClauseId(String);

impl ClauseId {
    pub fn preamble() -> Self {
        Self(PREAMBLE_ID.to_string())
    }

    /// Id for the `occurrence`-th clause carrying `ordinal` (1-based).
    pub fn numbered(ordinal: &str, occurrence: usize) -> Self {
        if occurrence <= 1 {
            Self(format!("clause_{ordinal}"))
        } else {
            Self(format!("clause_{ordinal}_{occurrence}"))
        }
    }

    pub fn is_preamble(&self) -> bool {
        self.0 == PREAMBLE_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClauseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How a clause was introduced in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseMarker {
    /// Text before the first top-level numeric marker.
    Preamble,
    /// A top-level `"<n>. "` marker; holds the digits as written.
    Ordinal(String),
}

/// A single addressable clause. Immutable once segmented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub id: ClauseId,
    pub marker: ClauseMarker,
    pub heading: String,
    pub content: String,
    /// 1-based source page.
    pub page: u32,
}

impl Clause {
    /// The `"<n>"` ordinal rendered before this clause, if numbered.
    pub fn ordinal(&self) -> Option<&str> {
        match &self.marker {
            ClauseMarker::Preamble => None,
            ClauseMarker::Ordinal(n) => Some(n),
        }
    }
}

/// One page of extracted text, as supplied by the extraction collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub text: String,
}

impl Page {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }
}

/// Cut `s` to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
