//! Clause segmentation for extracted contract text.
//!
//! Pages are normalised and concatenated, then split on top-level numeric
//! markers: a bare integer followed by a period and whitespace at a token
//! boundary (`"7. "`). Parenthesised sub-items such as `"(a) "` never split.
//! Text before the first marker becomes the preamble when it is long enough.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::clause::truncate_chars;
use crate::{Clause, ClauseId, ClauseMarker, Page};

/// Preamble text at or under this many characters is dropped.
pub const PREAMBLE_MIN_CHARS: usize = 50;
pub const PREAMBLE_MAX_CHARS: usize = 2000;
pub const CLAUSE_MAX_CHARS: usize = 1500;
pub const TRUNCATION_MARKER: &str = "...";

const HEADING_SCAN_CHARS: usize = 100;
const HEADING_FALLBACK_CHARS: usize = 80;

static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static TOP_LEVEL_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\.\s+").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("no text could be extracted from the document")]
    NoText,
}

/// Segmenter output: ordered clauses plus the normalised full text.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub clauses: Vec<Clause>,
    pub text: String,
}

/// Collapse space/tab runs and cap blank-line runs at one, then trim.
pub fn normalize_page(text: &str) -> String {
    let collapsed = SPACE_RUN.replace_all(text, " ");
    let capped = BLANK_RUN.replace_all(&collapsed, "\n\n");
    capped.trim().to_string()
}

/// Split extracted pages into clauses.
pub fn segment(pages: &[Page]) -> Result<Segmentation, SegmentError> {
    let mut full_text = String::new();
    // (byte offset where the page starts, page number)
    let mut boundaries: Vec<(usize, u32)> = Vec::with_capacity(pages.len());

    for page in pages {
        let normalized = normalize_page(&page.text);
        if normalized.is_empty() {
            warn!(page = page.page, "page is empty or unreadable, skipping");
            continue;
        }
        boundaries.push((full_text.len(), page.page));
        full_text.push_str(&normalized);
        full_text.push_str("\n\n");
    }

    if boundaries.is_empty() {
        return Err(SegmentError::NoText);
    }

    let page_at = |offset: usize| -> u32 {
        boundaries
            .iter()
            .take_while(|(start, _)| *start <= offset)
            .last()
            .map(|&(_, page)| page)
            .unwrap_or(1)
    };

    let markers: Vec<(usize, usize, &str)> = TOP_LEVEL_MARKER
        .captures_iter(&full_text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let ordinal = caps.get(1)?.as_str();
            Some((whole.start(), whole.end(), ordinal))
        })
        .collect();

    let mut clauses = Vec::new();

    if let Some(&(first_start, _, _)) = markers.first() {
        let preamble = full_text[..first_start].trim();
        if preamble.chars().count() > PREAMBLE_MIN_CHARS {
            clauses.push(Clause {
                id: ClauseId::preamble(),
                marker: ClauseMarker::Preamble,
                heading: "Preamble".to_string(),
                content: truncate_chars(preamble, PREAMBLE_MAX_CHARS).to_string(),
                page: page_at(first_start),
            });
        }
    }

    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for (i, &(start, body_start, ordinal)) in markers.iter().enumerate() {
        let body_end = markers
            .get(i + 1)
            .map(|&(next_start, _, _)| next_start)
            .unwrap_or(full_text.len());
        let body = full_text[body_start..body_end].trim();
        if body.is_empty() {
            continue;
        }

        let seen = occurrences.entry(ordinal).or_insert(0);
        *seen += 1;

        let content = cap_content(body);
        clauses.push(Clause {
            id: ClauseId::numbered(ordinal, *seen),
            marker: ClauseMarker::Ordinal(ordinal.to_string()),
            heading: derive_heading(&content),
            content,
            page: page_at(start),
        });
    }

    info!(clauses = clauses.len(), pages = boundaries.len(), "identified clauses");

    if clauses.is_empty() {
        warn!("no clauses detected, using entire document as a single clause");
        clauses.push(Clause {
            id: ClauseId::numbered("1", 1),
            marker: ClauseMarker::Ordinal("1".to_string()),
            heading: "Full Document".to_string(),
            content: cap_content(full_text.trim()),
            page: 1,
        });
    }

    Ok(Segmentation {
        clauses,
        text: full_text,
    })
}

/// Cap clause content, appending the truncation marker when cut.
fn cap_content(body: &str) -> String {
    let capped = truncate_chars(body, CLAUSE_MAX_CHARS);
    if capped.len() < body.len() {
        format!("{capped}{TRUNCATION_MARKER}")
    } else {
        capped.to_string()
    }
}

/// First sentence (up to a period or newline) within the first 100 chars,
/// else the first 80 chars with an ellipsis.
fn derive_heading(content: &str) -> String {
    for (n, (idx, ch)) in content.char_indices().enumerate() {
        if n > HEADING_SCAN_CHARS {
            break;
        }
        if n >= 1 && (ch == '.' || ch == '\n') {
            return content[..idx].trim().to_string();
        }
    }
    format!(
        "{}{TRUNCATION_MARKER}",
        truncate_chars(content, HEADING_FALLBACK_CHARS).trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(texts: &[&str]) -> Vec<Page> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Page::new(i as u32 + 1, *t))
            .collect()
    }

    const PREAMBLE: &str = "This Services Agreement is made between Acme Private Limited \
                            and Beta Consulting LLP on the first day of March.";

    #[test]
    fn normalizes_whitespace_within_lines_and_blank_runs() {
        let text = "  Alpha \t  beta\n\n\n\n gamma  ";
        assert_eq!(normalize_page(text), "Alpha beta\n\n gamma");
    }

    #[test]
    fn splits_preamble_and_numbered_clauses() {
        let text = format!(
            "{PREAMBLE}\n1. Term. This agreement runs for one year.\n\
             2. Payment. Fees are due monthly (a) in advance and (b) in INR."
        );
        let seg = segment(&pages(&[&text])).unwrap();
        let ids: Vec<&str> = seg.clauses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["clause_preamble", "clause_1", "clause_2"]);

        assert_eq!(seg.clauses[0].content, PREAMBLE);
        assert_eq!(seg.clauses[0].heading, "Preamble");
        assert_eq!(seg.clauses[1].heading, "Term");
        assert_eq!(seg.clauses[1].ordinal(), Some("1"));
        assert_eq!(
            seg.clauses[2].content,
            "Payment. Fees are due monthly (a) in advance and (b) in INR."
        );
    }

    #[test]
    fn short_preamble_is_dropped() {
        let seg = segment(&pages(&["Agreement\n1. Scope of work is defined."])).unwrap();
        assert_eq!(seg.clauses.len(), 1);
        assert_eq!(seg.clauses[0].id.as_str(), "clause_1");
    }

    #[test]
    fn first_marker_need_not_be_one() {
        let text = format!("{PREAMBLE}\n3. Confidentiality applies.\n4. Notices in writing.");
        let seg = segment(&pages(&[&text])).unwrap();
        assert_eq!(seg.clauses[0].id.as_str(), "clause_preamble");
        assert_eq!(seg.clauses[1].id.as_str(), "clause_3");
    }

    #[test]
    fn decimals_do_not_split() {
        let seg = segment(&pages(&["1. Interest accrues at 1.5 percent monthly."])).unwrap();
        assert_eq!(seg.clauses.len(), 1);
        assert_eq!(seg.clauses[0].content, "Interest accrues at 1.5 percent monthly.");
    }

    #[test]
    fn no_markers_yield_one_fallback_clause() {
        let seg = segment(&pages(&["A letter of intent with no numbering at all."])).unwrap();
        assert_eq!(seg.clauses.len(), 1);
        let clause = &seg.clauses[0];
        assert_eq!(clause.id.as_str(), "clause_1");
        assert_eq!(clause.heading, "Full Document");
        assert_eq!(clause.content, "A letter of intent with no numbering at all.");
        assert_eq!(clause.page, 1);
    }

    #[test]
    fn fallback_clause_is_capped() {
        let long = "word ".repeat(1000);
        let seg = segment(&pages(&[&long])).unwrap();
        assert_eq!(seg.clauses.len(), 1);
        assert_eq!(
            seg.clauses[0].content.chars().count(),
            CLAUSE_MAX_CHARS + TRUNCATION_MARKER.len()
        );
    }

    #[test]
    fn long_clause_gets_truncation_marker() {
        let text = format!("1. {}", "x".repeat(CLAUSE_MAX_CHARS + 10));
        let seg = segment(&pages(&[&text])).unwrap();
        let content = &seg.clauses[0].content;
        assert!(content.ends_with(TRUNCATION_MARKER));
        assert_eq!(content.chars().count(), CLAUSE_MAX_CHARS + 3);
    }

    #[test]
    fn long_preamble_is_capped_without_marker() {
        let text = format!("{}\n1. Body text.", "p".repeat(PREAMBLE_MAX_CHARS + 50));
        let seg = segment(&pages(&[&text])).unwrap();
        assert_eq!(seg.clauses[0].content.chars().count(), PREAMBLE_MAX_CHARS);
    }

    #[test]
    fn heading_falls_back_to_prefix() {
        let body = "a".repeat(120);
        let text = format!("1. {body}");
        let seg = segment(&pages(&[&text])).unwrap();
        assert_eq!(seg.clauses[0].heading, format!("{}...", "a".repeat(80)));
    }

    #[test]
    fn clauses_are_attributed_to_pages() {
        let seg = segment(&pages(&[
            "1. First clause text.",
            "   ",
            "2. Second clause text.\n3. Third clause text.",
        ]))
        .unwrap();
        let page_of: Vec<u32> = seg.clauses.iter().map(|c| c.page).collect();
        assert_eq!(page_of, vec![1, 3, 3]);
    }

    #[test]
    fn repeated_ordinals_get_unique_ids() {
        let seg = segment(&pages(&[
            "1. Definitions apply.\n2. Services.\n1. Schedule item one.",
        ]))
        .unwrap();
        let ids: Vec<&str> = seg.clauses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["clause_1", "clause_2", "clause_1_2"]);
    }

    #[test]
    fn all_empty_pages_is_an_error() {
        assert_eq!(segment(&pages(&["", " \n\t "])).unwrap_err(), SegmentError::NoText);
        assert_eq!(segment(&[]).unwrap_err(), SegmentError::NoText);
    }

    #[test]
    fn normalized_text_is_returned() {
        let seg = segment(&pages(&["1.   Alpha   beta", "2. Gamma"])).unwrap();
        assert_eq!(seg.text, "1. Alpha beta\n\n2. Gamma\n\n");
    }
}
