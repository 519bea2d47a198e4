//! The shared annotated document.
//!
//! The document is an ordered list of spans: plain text (title header,
//! separator, blank lines) and one span per clause. Each clause span walks a
//! one-way state machine:
//!
//! ```text
//! Unannotated ──risk(Some)──▶ Tagged ──citation──▶ Cited ──suggestion──▶ Suggested
//!      │
//!      └──risk(None)──▶ Plain
//! ```
//!
//! Every layer operation addresses exactly one span by clause id, so text that
//! recurs elsewhere in the document is never touched. Operations that would
//! skip or repeat a layer fail with [`AnnotationError`] and leave the document
//! unchanged. The markup text form is produced only by [`render`](AnnotatedDocument::render).

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::markup;
use crate::{Citation, Clause, ClauseId, RiskLevel};

/// One of the three ordered annotation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Risk,
    Citation,
    Suggestion,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Risk => "risk",
            Self::Citation => "citation",
            Self::Suggestion => "suggestion",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("clause {0} is not in the document")]
    UnknownClause(ClauseId),

    /// The predecessor layer is absent, so there is nothing to anchor to.
    #[error("{layer} anchor not found for {clause_id}")]
    AnchorNotFound { clause_id: ClauseId, layer: Layer },

    #[error("{layer} layer already applied to {clause_id}")]
    LayerAlreadyApplied { clause_id: ClauseId, layer: Layer },
}

impl AnnotationError {
    /// Anchor misses are expected for clauses without a qualifying signal.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::AnchorNotFound { .. })
    }
}

/// Annotation progress of a single clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationState {
    /// Still wrapped in its placeholder pair.
    Unannotated,
    /// Placeholder stripped; no qualifying signal, so no tag.
    Plain,
    Tagged {
        level: RiskLevel,
    },
    Cited {
        level: RiskLevel,
        citation: String,
    },
    Suggested {
        level: RiskLevel,
        citation: String,
        suggestion: String,
    },
}

impl AnnotationState {
    pub fn level(&self) -> Option<RiskLevel> {
        match self {
            Self::Unannotated | Self::Plain => None,
            Self::Tagged { level } | Self::Cited { level, .. } | Self::Suggested { level, .. } => {
                Some(*level)
            }
        }
    }

    pub fn has_layer(&self, layer: Layer) -> bool {
        match layer {
            Layer::Risk => self.level().is_some(),
            Layer::Citation => matches!(self, Self::Cited { .. } | Self::Suggested { .. }),
            Layer::Suggestion => matches!(self, Self::Suggested { .. }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseSpan {
    pub id: ClauseId,
    /// `Some("7")` renders as `"7. "` before the body; `None` for the preamble.
    pub ordinal: Option<String>,
    pub content: String,
    pub state: AnnotationState,
}

impl ClauseSpan {
    fn write_markup(&self, out: &mut String) {
        if let Some(ordinal) = &self.ordinal {
            out.push_str(ordinal);
            out.push_str(". ");
        }
        match &self.state {
            AnnotationState::Unannotated => {
                out.push_str(&markup::open_placeholder(&self.id));
                out.push_str(&self.content);
                out.push_str(&markup::close_placeholder(&self.id));
            }
            AnnotationState::Plain => out.push_str(&self.content),
            AnnotationState::Tagged { level } => {
                markup::write_wrapped(out, markup::risk_tag(*level), &self.content);
            }
            AnnotationState::Cited { level, citation } => {
                markup::write_wrapped(out, markup::risk_tag(*level), &self.content);
                markup::write_wrapped(out, markup::CITATION_TAG, citation);
            }
            AnnotationState::Suggested {
                level,
                citation,
                suggestion,
            } => {
                markup::write_wrapped(out, markup::risk_tag(*level), &self.content);
                markup::write_wrapped(out, markup::CITATION_TAG, citation);
                markup::write_wrapped(out, markup::SUGGESTION_TAG, suggestion);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Clause(ClauseSpan),
}

/// Ordered typed-span document with per-clause annotation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedDocument {
    spans: Vec<Span>,
    index: HashMap<ClauseId, usize>,
}

impl AnnotatedDocument {
    /// Initial render: header, separator, then every clause wrapped in its
    /// placeholder pair. Clause ids must be unique.
    pub fn new(title: &str, clauses: &[Clause]) -> Self {
        let mut spans = Vec::with_capacity(clauses.len() * 2 + 1);
        spans.push(Span::Text(markup::header(title)));
        for clause in clauses {
            spans.push(Span::Clause(ClauseSpan {
                id: clause.id.clone(),
                ordinal: clause.ordinal().map(str::to_string),
                content: clause.content.clone(),
                state: AnnotationState::Unannotated,
            }));
            spans.push(Span::Text(markup::CLAUSE_GAP.to_string()));
        }
        Self::from_spans(spans)
    }

    pub(crate) fn from_spans(spans: Vec<Span>) -> Self {
        let index = spans
            .iter()
            .enumerate()
            .filter_map(|(i, span)| match span {
                Span::Clause(c) => Some((c.id.clone(), i)),
                Span::Text(_) => None,
            })
            .collect();
        Self { spans, index }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn clause_count(&self) -> usize {
        self.index.len()
    }

    pub fn clause(&self, id: &ClauseId) -> Option<&ClauseSpan> {
        match self.spans.get(*self.index.get(id)?)? {
            Span::Clause(c) => Some(c),
            Span::Text(_) => None,
        }
    }

    pub fn state(&self, id: &ClauseId) -> Option<&AnnotationState> {
        self.clause(id).map(|c| &c.state)
    }

    /// Clause ids in document order.
    pub fn clause_ids(&self) -> impl Iterator<Item = &ClauseId> {
        self.spans.iter().filter_map(|span| match span {
            Span::Clause(c) => Some(&c.id),
            Span::Text(_) => None,
        })
    }

    /// Risk layer: tag with `level`, or strip the placeholder when `None`.
    pub fn apply_risk(
        &mut self,
        id: &ClauseId,
        level: Option<RiskLevel>,
    ) -> Result<(), AnnotationError> {
        let span = self.clause_mut(id)?;
        if span.state != AnnotationState::Unannotated {
            return Err(AnnotationError::LayerAlreadyApplied {
                clause_id: id.clone(),
                layer: Layer::Risk,
            });
        }
        span.state = match level {
            Some(level) => AnnotationState::Tagged { level },
            None => AnnotationState::Plain,
        };
        debug!(clause_id = %id, level = ?level, "risk layer applied");
        Ok(())
    }

    /// Citation layer, appended right after the risk close tag.
    ///
    /// Unresolved citations are written as the explicit not-found marker.
    pub fn apply_citation(
        &mut self,
        id: &ClauseId,
        citation: &Citation,
    ) -> Result<(), AnnotationError> {
        let span = self.clause_mut(id)?;
        let level = match &span.state {
            AnnotationState::Tagged { level } => *level,
            AnnotationState::Unannotated | AnnotationState::Plain => {
                return Err(AnnotationError::AnchorNotFound {
                    clause_id: id.clone(),
                    layer: Layer::Citation,
                });
            }
            AnnotationState::Cited { .. } | AnnotationState::Suggested { .. } => {
                return Err(AnnotationError::LayerAlreadyApplied {
                    clause_id: id.clone(),
                    layer: Layer::Citation,
                });
            }
        };
        let text = citation
            .reference()
            .unwrap_or_else(|| markup::NOT_FOUND.to_string());
        span.state = AnnotationState::Cited {
            level,
            citation: text,
        };
        debug!(clause_id = %id, found = citation.found, "citation layer applied");
        Ok(())
    }

    /// Suggestion layer, appended right after the citation close tag.
    pub fn apply_suggestion(
        &mut self,
        id: &ClauseId,
        suggestion: &str,
    ) -> Result<(), AnnotationError> {
        let span = self.clause_mut(id)?;
        let (level, citation) = match &span.state {
            AnnotationState::Cited { level, citation } => (*level, citation.clone()),
            AnnotationState::Suggested { .. } => {
                return Err(AnnotationError::LayerAlreadyApplied {
                    clause_id: id.clone(),
                    layer: Layer::Suggestion,
                });
            }
            _ => {
                return Err(AnnotationError::AnchorNotFound {
                    clause_id: id.clone(),
                    layer: Layer::Suggestion,
                });
            }
        };
        span.state = AnnotationState::Suggested {
            level,
            citation,
            suggestion: suggestion.to_string(),
        };
        debug!(clause_id = %id, "suggestion layer applied");
        Ok(())
    }

    /// Serialise to the external markup format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            match span {
                Span::Text(text) => out.push_str(text),
                Span::Clause(clause) => clause.write_markup(&mut out),
            }
        }
        out
    }

    /// The document with every clause rendered as bare content.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            match span {
                Span::Text(text) => out.push_str(text),
                Span::Clause(clause) => {
                    if let Some(ordinal) = &clause.ordinal {
                        out.push_str(ordinal);
                        out.push_str(". ");
                    }
                    out.push_str(&clause.content);
                }
            }
        }
        out
    }

    fn clause_mut(&mut self, id: &ClauseId) -> Result<&mut ClauseSpan, AnnotationError> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| AnnotationError::UnknownClause(id.clone()))?;
        match &mut self.spans[idx] {
            Span::Clause(c) => Ok(c),
            Span::Text(_) => Err(AnnotationError::UnknownClause(id.clone())),
        }
    }
}
