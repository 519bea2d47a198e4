pub mod annotate;
pub mod clause;
pub mod judgment;
pub mod markup;
pub mod scoring;
pub mod segment;

pub use annotate::{AnnotatedDocument, AnnotationError, AnnotationState, Layer};
pub use clause::{Clause, ClauseId, ClauseMarker, Page, truncate_chars};
pub use judgment::{
    Citation, ClassifiedClause, ClauseType, ExecutiveSummary, Issue, Redline, RiskAssessment,
    RiskLevel, TopRisk, score_band,
};
pub use markup::MarkupError;
pub use scoring::{
    ClauseRiskScore, ContractRiskSummary, ModifierKind, RiskDistribution, ScoreModifier,
    ScoringError, aggregate, score_clause,
};
pub use segment::{SegmentError, Segmentation, segment};
