//! Machine-readable risk report assembled from a finished (or halted) run.

use chrono::{DateTime, Utc};
use nyaya_core::{Citation, ClauseId, Redline, RiskDistribution, RiskLevel, ScoreModifier};
use serde::Serialize;

use crate::state::{AnalysisState, AuditRecord, Stage};

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Serialize)]
pub struct ClauseEntry {
    pub clause_id: ClauseId,
    pub heading: String,
    pub page: u32,
    #[serde(rename = "type")]
    pub clause_type: String,
    pub risk_level: String,
    pub risk_score: Option<u8>,
    pub modifiers: Vec<ScoreModifier>,
    /// Whether the clause carries a risk tag in the annotated document.
    pub tagged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub analysis_timestamp: DateTime<Utc>,
    pub source: String,
    pub model: String,
    pub stage: Option<Stage>,
    pub overall_risk_score: Option<u8>,
    pub risk_distribution: Option<RiskDistribution>,
    pub risk_concentration_index: Option<f64>,
    pub most_critical_clause: Option<ClauseId>,
    pub total_clauses: usize,
    pub high_risk_count: usize,
    pub medium_risk_count: usize,
    pub low_risk_count: usize,
    pub clauses: Vec<ClauseEntry>,
    pub citations: Vec<Citation>,
    pub redlines: Vec<Redline>,
    pub audit: Vec<AuditRecord>,
    pub error: Option<String>,
}

impl RiskReport {
    pub fn build(state: &AnalysisState, source: &str, model: &str, at: DateTime<Utc>) -> Self {
        let count = |level: RiskLevel| {
            state
                .risk_levels
                .values()
                .filter(|l| **l == level)
                .count()
        };

        let clauses = state
            .clauses
            .iter()
            .map(|clause| {
                let score = state.score_of(&clause.id);
                let tagged = state
                    .document
                    .as_ref()
                    .and_then(|doc| doc.state(&clause.id))
                    .and_then(|s| s.level())
                    .is_some();
                ClauseEntry {
                    clause_id: clause.id.clone(),
                    heading: clause.heading.clone(),
                    page: clause.page,
                    clause_type: state
                        .classified
                        .get(&clause.id)
                        .map_or(UNKNOWN, |c| c.clause_type.label())
                        .to_string(),
                    risk_level: state
                        .risk_levels
                        .get(&clause.id)
                        .map_or(UNKNOWN, RiskLevel::as_str)
                        .to_string(),
                    risk_score: score.map(|s| s.final_score),
                    modifiers: score.map(|s| s.modifiers.clone()).unwrap_or_default(),
                    tagged,
                }
            })
            .collect();

        let contract = state.contract_risk.as_ref();
        Self {
            analysis_timestamp: at,
            source: source.to_string(),
            model: model.to_string(),
            stage: state.stage,
            overall_risk_score: contract.map(|c| c.overall_risk_score),
            risk_distribution: contract.map(|c| c.risk_distribution),
            risk_concentration_index: contract.map(|c| c.risk_concentration_index),
            most_critical_clause: contract.map(|c| c.most_critical_clause.clone()),
            total_clauses: state.clauses.len(),
            high_risk_count: count(RiskLevel::High),
            medium_risk_count: count(RiskLevel::Medium),
            low_risk_count: count(RiskLevel::Low),
            clauses,
            citations: state.citations.clone(),
            redlines: state.redlines.clone(),
            audit: state.audit.clone(),
            error: state.error.as_ref().map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use nyaya_core::{AnnotatedDocument, ClassifiedClause, ClauseType, Page, score_clause, segment};

    use super::*;

    fn scored_state() -> AnalysisState {
        let seg = segment(&[Page::new(
            4,
            "1. The Vendor shall indemnify and hold harmless the Client against all losses.\n\
             2. Payment is due within thirty days of invoice.",
        )])
        .unwrap();

        let mut state = AnalysisState::new();
        let mut doc = AnnotatedDocument::new("Report", &seg.clauses);
        let first = seg.clauses[0].id.clone();
        doc.apply_risk(&first, Some(RiskLevel::High)).unwrap();
        state.classified.insert(
            first.clone(),
            ClassifiedClause {
                clause_id: first.clone(),
                clause_type: ClauseType::Indemnity,
                confidence: 0.9,
            },
        );
        state.risk_levels.insert(first.clone(), RiskLevel::High);
        state
            .scores
            .push(score_clause(&first, &seg.clauses[0].content, RiskLevel::High));
        state.document = Some(doc);
        state.clauses = seg.clauses;
        state.stage = Some(Stage::Score);
        state
    }

    #[test]
    fn partial_run_reports_what_exists() {
        let at = Utc.with_ymd_and_hms(2026, 5, 2, 10, 0, 0).unwrap();
        let report = RiskReport::build(&scored_state(), "msa.txt", "scripted", at);

        assert_eq!(report.total_clauses, 2);
        assert_eq!(report.high_risk_count, 1);
        assert_eq!(report.overall_risk_score, None);

        let first = &report.clauses[0];
        assert_eq!(first.clause_type, "Indemnity");
        assert_eq!(first.risk_level, "High");
        assert!(first.tagged);
        assert!(first.risk_score.is_some());

        let second = &report.clauses[1];
        assert_eq!(second.clause_type, UNKNOWN);
        assert_eq!(second.risk_level, UNKNOWN);
        assert_eq!(second.risk_score, None);
        assert!(!second.tagged);
        assert_eq!(second.page, 4);
    }

    #[test]
    fn serializes_with_renamed_type_field() {
        let at = Utc.with_ymd_and_hms(2026, 5, 2, 10, 0, 0).unwrap();
        let report = RiskReport::build(&scored_state(), "msa.txt", "scripted", at);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["clauses"][0]["type"], "Indemnity");
        assert_eq!(json["stage"], "score");
        assert!(json["error"].is_null());
    }
}
