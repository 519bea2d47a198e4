//! The record threaded through every stage of a run.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use nyaya_ai::OracleError;
use nyaya_core::{
    AnnotatedDocument, AnnotationError, Citation, ClassifiedClause, Clause, ClauseId,
    ClauseRiskScore, ClauseType, ContractRiskSummary, ExecutiveSummary, Redline, RiskAssessment,
    RiskLevel, ScoringError, SegmentError,
};
use serde::Serialize;
use thiserror::Error;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Segment,
    Classify,
    Score,
    Cite,
    Redline,
    Summarize,
    Completed,
}

impl Stage {
    /// The six working stages.
    pub const SEQUENCE: [Stage; 6] = [
        Stage::Segment,
        Stage::Classify,
        Stage::Score,
        Stage::Cite,
        Stage::Redline,
        Stage::Summarize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Classify => "classify",
            Self::Score => "score",
            Self::Cite => "cite",
            Self::Redline => "redline",
            Self::Summarize => "summarize",
            Self::Completed => "completed",
        }
    }

    /// 1-based position in [`SEQUENCE`](Self::SEQUENCE).
    pub fn position(&self) -> usize {
        Self::SEQUENCE
            .iter()
            .position(|s| s == self)
            .map_or(Self::SEQUENCE.len(), |i| i + 1)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("segmentation failed: {0}")]
    Segment(#[from] SegmentError),

    #[error("{stage} stage: {source}")]
    Oracle {
        stage: Stage,
        #[source]
        source: OracleError,
    },

    #[error("{stage} stage: {source}")]
    Annotation {
        stage: Stage,
        #[source]
        source: AnnotationError,
    },

    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    #[error("{0} stage ran before the document was segmented")]
    NotSegmented(Stage),
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Segment(_) => Stage::Segment,
            Self::Oracle { stage, .. }
            | Self::Annotation { stage, .. }
            | Self::NotSegmented(stage) => *stage,
            Self::Scoring(_) => Stage::Summarize,
        }
    }

    pub(crate) fn oracle(stage: Stage) -> impl FnOnce(OracleError) -> Self {
        move |source| Self::Oracle { stage, source }
    }
}

/// One entry of the run's audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub stage: Stage,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything a run has produced so far.
///
/// On a fatal stage failure every field already filled in is kept, including
/// partial annotation of the document.
#[derive(Debug)]
pub struct AnalysisState {
    pub clauses: Vec<Clause>,
    /// Normalised full text of the source.
    pub text: String,
    pub classified: HashMap<ClauseId, ClassifiedClause>,
    pub assessments: HashMap<ClauseId, RiskAssessment>,
    /// Level per clause, tagged or not.
    pub risk_levels: HashMap<ClauseId, RiskLevel>,
    /// Clause scores in document order.
    pub scores: Vec<ClauseRiskScore>,
    pub citations: Vec<Citation>,
    pub redlines: Vec<Redline>,
    pub contract_risk: Option<ContractRiskSummary>,
    pub executive_summary: Option<ExecutiveSummary>,
    pub document: Option<AnnotatedDocument>,
    pub audit: Vec<AuditRecord>,
    pub error: Option<StageError>,
    /// Last stage that finished, or `Completed`.
    pub stage: Option<Stage>,
}

impl Default for AnalysisState {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisState {
    pub fn new() -> Self {
        Self {
            clauses: Vec::new(),
            text: String::new(),
            classified: HashMap::new(),
            assessments: HashMap::new(),
            risk_levels: HashMap::new(),
            scores: Vec::new(),
            citations: Vec::new(),
            redlines: Vec::new(),
            contract_risk: None,
            executive_summary: None,
            document: None,
            audit: Vec::new(),
            error: None,
            stage: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stage == Some(Stage::Completed) && self.error.is_none()
    }

    pub fn clause_types(&self) -> HashMap<ClauseId, ClauseType> {
        self.classified
            .iter()
            .map(|(id, c)| (id.clone(), c.clause_type))
            .collect()
    }

    pub fn score_of(&self, id: &ClauseId) -> Option<&ClauseRiskScore> {
        self.scores.iter().find(|s| &s.clause_id == id)
    }

    pub fn citation_of(&self, id: &ClauseId) -> Option<&Citation> {
        self.citations.iter().find(|c| &c.clause_id == id)
    }

    /// Current markup of the annotated document.
    pub fn render(&self) -> Option<String> {
        self.document.as_ref().map(AnnotatedDocument::render)
    }

    pub(crate) fn record(&mut self, stage: Stage, detail: impl Into<String>) {
        let record = AuditRecord {
            stage,
            detail: detail.into(),
            timestamp: Utc::now(),
        };
        tracing::debug!(stage = %record.stage, detail = %record.detail, "audit event recorded");
        self.audit.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_positions() {
        assert_eq!(Stage::Segment.position(), 1);
        assert_eq!(Stage::Summarize.position(), 6);
        assert_eq!(Stage::Completed.position(), 6);
    }

    #[test]
    fn errors_know_their_stage() {
        let err = StageError::oracle(Stage::Cite)(OracleError::Unavailable("down".into()));
        assert_eq!(err.stage(), Stage::Cite);
        assert_eq!(err.to_string(), "cite stage: oracle unavailable: down");
        assert_eq!(StageError::from(SegmentError::NoText).stage(), Stage::Segment);
        assert_eq!(StageError::from(ScoringError::NoClauses).stage(), Stage::Summarize);
    }
}
