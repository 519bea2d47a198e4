//! Annotated-contract markup: tag vocabulary, stripping, and parsing of
//! previously rendered artifacts back into an [`AnnotatedDocument`].
//!
//! | Layer      | Form                                             |
//! |------------|--------------------------------------------------|
//! | placeholder| `{{CLAUSE_<id>}}content{{/CLAUSE_<id>}}`         |
//! | risk       | `-hr-content-hr-`, `-mr-…-mr-`, `-lr-…-lr-`       |
//! | citation   | `-ipc-<section>, <law>: <explanation>-ipc-`      |
//! | suggestion | `-sg-<text>-sg-`                                 |

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::annotate::{AnnotatedDocument, AnnotationState, ClauseSpan, Span};
use crate::{ClauseId, RiskLevel};

pub const SEPARATOR: &str = "---";
pub const CITATION_TAG: &str = "-ipc-";
pub const SUGGESTION_TAG: &str = "-sg-";
/// Citation fragment text for unresolved lookups.
pub const NOT_FOUND: &str = "not found";
pub(crate) const CLAUSE_GAP: &str = "\n\n";

const PLACEHOLDER_OPEN_PREFIX: &str = "{{CLAUSE_";
const PLACEHOLDER_SUFFIX: &str = "}}";

static ORDINAL_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\. ").unwrap());
static CLAUSE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\n\d+\. ").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("header separator line not found")]
    MissingSeparator,

    #[error("unterminated {tag} at byte {offset}")]
    UnterminatedTag { tag: String, offset: usize },

    #[error("unexpected text at byte {offset}")]
    UnexpectedText { offset: usize },

    #[error("clause {0} appears more than once")]
    DuplicateClause(ClauseId),
}

pub fn risk_tag(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => "-hr-",
        RiskLevel::Medium => "-mr-",
        RiskLevel::Low => "-lr-",
    }
}

fn risk_level_for_tag(s: &str) -> Option<RiskLevel> {
    RiskLevel::ALL
        .into_iter()
        .find(|level| s.starts_with(risk_tag(*level)))
}

pub fn header(title: &str) -> String {
    format!("# {title}\n\n*Generated by Nyaya*\n\n{SEPARATOR}\n\n")
}

pub fn open_placeholder(id: &ClauseId) -> String {
    format!("{PLACEHOLDER_OPEN_PREFIX}{id}{PLACEHOLDER_SUFFIX}")
}

pub fn close_placeholder(id: &ClauseId) -> String {
    format!("{{{{/CLAUSE_{id}{PLACEHOLDER_SUFFIX}")
}

pub(crate) fn write_wrapped(out: &mut String, tag: &str, inner: &str) {
    out.push_str(tag);
    out.push_str(inner);
    out.push_str(tag);
}

/// Remove every placeholder, tag, citation and suggestion, leaving the text
/// a reader would see in the unannotated contract.
///
/// Tags are only recognised where a layer can sit, so clause text that
/// happens to look like a tag (`24-hr-basis`) is kept.
pub fn strip(markup: &str) -> Result<String, MarkupError> {
    parse(markup).map(|doc| doc.plain_text())
}

/// Parse a rendered artifact back into a typed document.
///
/// Clause ids come from placeholders where present; otherwise they are
/// re-derived from the ordinal prefix the same way the segmenter assigns them.
pub fn parse(markup: &str) -> Result<AnnotatedDocument, MarkupError> {
    let separator = format!("\n{SEPARATOR}\n\n");
    let header_end = markup
        .find(&separator)
        .map(|i| i + separator.len())
        .ok_or(MarkupError::MissingSeparator)?;

    let offset_of = |s: &str| markup.len() - s.len();

    let mut spans = vec![Span::Text(markup[..header_end].to_string())];
    let mut seen: HashSet<ClauseId> = HashSet::new();
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut rest = &markup[header_end..];

    while !rest.is_empty() {
        let clause_start = offset_of(rest);
        let (ordinal, body) = match ORDINAL_PREFIX.captures(rest) {
            Some(caps) => {
                let whole = caps.get(0).map_or(0, |m| m.end());
                (Some(caps[1].to_string()), &rest[whole..])
            }
            None => (None, rest),
        };

        let parsed = parse_body(body, &offset_of)?;

        let derived = match &ordinal {
            Some(n) => {
                let seen_count = occurrences.entry(n.clone()).or_insert(0);
                *seen_count += 1;
                Some(ClauseId::numbered(n, *seen_count))
            }
            None if seen.is_empty() => Some(ClauseId::preamble()),
            None => None,
        };
        let id = parsed
            .explicit_id
            .or(derived)
            .ok_or(MarkupError::UnexpectedText {
                offset: clause_start,
            })?;
        if !seen.insert(id.clone()) {
            return Err(MarkupError::DuplicateClause(id));
        }

        spans.push(Span::Clause(ClauseSpan {
            id,
            ordinal,
            content: parsed.content.to_string(),
            state: parsed.state,
        }));

        rest = parsed.rest;
        if let Some(after_gap) = rest.strip_prefix(CLAUSE_GAP) {
            spans.push(Span::Text(CLAUSE_GAP.to_string()));
            rest = after_gap;
        } else if !rest.is_empty() {
            return Err(MarkupError::UnexpectedText {
                offset: offset_of(rest),
            });
        }
    }

    Ok(AnnotatedDocument::from_spans(spans))
}

struct ParsedBody<'a> {
    explicit_id: Option<ClauseId>,
    content: &'a str,
    state: AnnotationState,
    rest: &'a str,
}

fn parse_body<'a>(
    body: &'a str,
    offset_of: &dyn Fn(&str) -> usize,
) -> Result<ParsedBody<'a>, MarkupError> {
    // Placeholder pair: the clause was never annotated.
    if let Some(after_open) = body.strip_prefix(PLACEHOLDER_OPEN_PREFIX) {
        let id_end = after_open
            .find(PLACEHOLDER_SUFFIX)
            .ok_or_else(|| MarkupError::UnterminatedTag {
                tag: PLACEHOLDER_OPEN_PREFIX.to_string(),
                offset: offset_of(body),
            })?;
        let id = ClauseId::from(&after_open[..id_end]);
        let inner = &after_open[id_end + PLACEHOLDER_SUFFIX.len()..];
        let close = close_placeholder(&id);
        let end = inner
            .find(&close)
            .ok_or_else(|| MarkupError::UnterminatedTag {
                tag: close.clone(),
                offset: offset_of(body),
            })?;
        return Ok(ParsedBody {
            explicit_id: Some(id),
            content: &inner[..end],
            state: AnnotationState::Unannotated,
            rest: &inner[end + close.len()..],
        });
    }

    if let Some(level) = risk_level_for_tag(body) {
        let (content, state, rest) =
            parse_layers(body, level).ok_or_else(|| MarkupError::UnterminatedTag {
                tag: risk_tag(level).to_string(),
                offset: offset_of(body),
            })?;
        return Ok(ParsedBody {
            explicit_id: None,
            content,
            state,
            rest,
        });
    }

    // Untagged clause: runs to the next numbered clause or the end.
    let end = match CLAUSE_BOUNDARY.find(body) {
        Some(m) => m.start(),
        None => body.strip_suffix(CLAUSE_GAP).map_or(body.len(), str::len),
    };
    Ok(ParsedBody {
        explicit_id: None,
        content: &body[..end],
        state: AnnotationState::Plain,
        rest: &body[end..],
    })
}

/// Split a risk-tagged body into content, layer state and the remainder.
///
/// A closing tag only counts where the next layer or the end of the clause
/// follows it. Candidates are tried in order, so tag-like text inside the
/// content, citation or suggestion is carried through unchanged.
fn parse_layers(body: &str, level: RiskLevel) -> Option<(&str, AnnotationState, &str)> {
    let risk = risk_tag(level);
    for (content, after_risk) in closes(&body[risk.len()..], risk) {
        if at_clause_end(after_risk) {
            return Some((content, AnnotationState::Tagged { level }, after_risk));
        }
        let Some(cited) = after_risk.strip_prefix(CITATION_TAG) else {
            continue;
        };
        for (citation, after_citation) in closes(cited, CITATION_TAG) {
            if at_clause_end(after_citation) {
                let state = AnnotationState::Cited {
                    level,
                    citation: citation.to_string(),
                };
                return Some((content, state, after_citation));
            }
            let Some(suggested) = after_citation.strip_prefix(SUGGESTION_TAG) else {
                continue;
            };
            if let Some((suggestion, rest)) =
                closes(suggested, SUGGESTION_TAG).find(|(_, rest)| at_clause_end(rest))
            {
                let state = AnnotationState::Suggested {
                    level,
                    citation: citation.to_string(),
                    suggestion: suggestion.to_string(),
                };
                return Some((content, state, rest));
            }
        }
    }
    None
}

/// Every `(before, after)` split of `s` around an occurrence of `tag`.
fn closes<'a>(s: &'a str, tag: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    s.match_indices(tag)
        .map(move |(i, _)| (&s[..i], &s[i + tag.len()..]))
}

/// End of input, or the gap before the next numbered clause.
fn at_clause_end(rest: &str) -> bool {
    match rest.strip_prefix(CLAUSE_GAP) {
        Some(next) => next.is_empty() || ORDINAL_PREFIX.is_match(next),
        None => rest.is_empty(),
    }
}
