//! Oracle response validation and the conservative defaults used when a
//! response fails its contract.
//!
//! Every parser takes the clause id from the caller, never from the response,
//! so a confused model cannot re-address a judgment to another clause.

use std::sync::LazyLock;

use nyaya_core::{
    Citation, ClassifiedClause, ClauseId, ClauseType, ContractRiskSummary, ExecutiveSummary, Issue,
    Redline, RiskAssessment, RiskLevel, TopRisk, truncate_chars,
};
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.+?)\s*```").unwrap());

pub const EXPLANATION_MAX_CHARS: usize = 200;
/// A cut explanation keeps whole sentences only if the last period is past this.
const EXPLANATION_MIN_SENTENCE: usize = 100;
pub const ORIGINAL_TEXT_MAX_CHARS: usize = 100;
pub const SUGGESTION_MAX_CHARS: usize = 500;
const MAX_TOP_RISKS: usize = 5;

pub const DEFAULT_SUGGESTION: &str = "Add balanced terms with mutual rights. Include notice periods \
     (30-60 days) and liability caps. Clarify vague language.";
pub const DEFAULT_RATIONALE: &str = "Standard improvements for risky clauses under Indian Contract Act";

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("no JSON object in response")]
    NoJson,
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    Invalid(String),
}

/// Pull the JSON object out of a response: a fenced block if present,
/// otherwise the span from the first `{` to the last `}`.
pub fn extract_json<T: DeserializeOwned>(raw: &str) -> Result<T, ResponseError> {
    let body = match FENCED_JSON.captures(raw).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => raw.trim(),
    };
    if let Ok(parsed) = serde_json::from_str(body) {
        return Ok(parsed);
    }
    let start = body.find('{').ok_or(ResponseError::NoJson)?;
    let end = body.rfind('}').ok_or(ResponseError::NoJson)?;
    if end < start {
        return Err(ResponseError::NoJson);
    }
    Ok(serde_json::from_str(&body[start..=end])?)
}

// ── Wire shapes ──

#[derive(Deserialize)]
struct ClassificationWire {
    #[serde(rename = "type")]
    clause_type: ClauseType,
    confidence: f64,
}

#[derive(Deserialize)]
struct RiskWire {
    risk_level: RiskLevel,
    #[serde(default)]
    issues: Vec<Issue>,
}

#[derive(Deserialize)]
struct CitationWire {
    section: Option<String>,
    law_name: Option<String>,
    explanation: Option<String>,
    found: bool,
}

#[derive(Deserialize)]
struct RedlineWire {
    original_text: Option<String>,
    suggested_text: String,
    rationale: String,
}

#[derive(Deserialize)]
struct SummaryWire {
    summary: String,
    #[serde(default)]
    top_risks: Vec<TopRiskWire>,
    #[serde(default)]
    recommendations: Vec<String>,
}

#[derive(Deserialize)]
struct TopRiskWire {
    clause_id: ClauseId,
    clause_type: String,
    risk_description: String,
    #[serde(default)]
    priority: Option<u32>,
}

// ── Parsers ──

pub fn parse_classification(
    clause_id: &ClauseId,
    raw: &str,
) -> Result<ClassifiedClause, ResponseError> {
    let wire: ClassificationWire = extract_json(raw)?;
    if !(0.0..=1.0).contains(&wire.confidence) {
        return Err(ResponseError::Invalid(format!(
            "confidence {} outside [0, 1]",
            wire.confidence
        )));
    }
    Ok(ClassifiedClause {
        clause_id: clause_id.clone(),
        clause_type: wire.clause_type,
        confidence: wire.confidence,
    })
}

pub fn parse_risk(clause_id: &ClauseId, raw: &str) -> Result<RiskAssessment, ResponseError> {
    let wire: RiskWire = extract_json(raw)?;
    Ok(RiskAssessment {
        clause_id: clause_id.clone(),
        risk_level: wire.risk_level,
        issues: wire.issues,
    })
}

/// Citations are never invented: `found` without both a section and a law
/// name is downgraded to not-found.
pub fn parse_citation(clause_id: &ClauseId, raw: &str) -> Result<Citation, ResponseError> {
    let wire: CitationWire = extract_json(raw)?;
    let present = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());

    if !wire.found {
        return Ok(Citation::not_found(clause_id.clone()));
    }
    if !present(&wire.section) || !present(&wire.law_name) {
        warn!(clause_id = %clause_id, "citation marked found without section or law, treating as not found");
        return Ok(Citation::not_found(clause_id.clone()));
    }
    Ok(Citation {
        clause_id: clause_id.clone(),
        section: wire.section,
        law_name: wire.law_name,
        explanation: wire.explanation.map(|e| shorten_explanation(&e)),
        found: true,
    })
}

pub fn parse_redline(
    clause_id: &ClauseId,
    content: &str,
    raw: &str,
) -> Result<Redline, ResponseError> {
    let wire: RedlineWire = extract_json(raw)?;
    if wire.suggested_text.trim().is_empty() {
        return Err(ResponseError::Invalid("empty suggested_text".into()));
    }
    let original = wire.original_text.as_deref().unwrap_or(content);
    Ok(Redline {
        clause_id: clause_id.clone(),
        original_text: truncate_chars(original, ORIGINAL_TEXT_MAX_CHARS).to_string(),
        suggested_text: cap_with_marker(&wire.suggested_text, SUGGESTION_MAX_CHARS),
        rationale: wire.rationale,
    })
}

/// Parse a summary. The overall score is always `computed_score`; whatever
/// the oracle reports is discarded.
pub fn parse_summary(computed_score: u8, raw: &str) -> Result<ExecutiveSummary, ResponseError> {
    let wire: SummaryWire = extract_json(raw)?;
    if wire.summary.trim().is_empty() {
        return Err(ResponseError::Invalid("empty summary".into()));
    }
    let top_risks = wire
        .top_risks
        .into_iter()
        .take(MAX_TOP_RISKS)
        .enumerate()
        .map(|(i, r)| TopRisk {
            clause_id: r.clause_id,
            clause_type: r.clause_type,
            risk_description: r.risk_description,
            priority: r.priority.unwrap_or(i as u32 + 1),
        })
        .collect();
    Ok(ExecutiveSummary {
        overall_risk_score: computed_score,
        summary: wire.summary,
        top_risks,
        recommendations: wire.recommendations,
    })
}

// ── Defaults ──

pub fn default_classification(clause_id: &ClauseId) -> ClassifiedClause {
    ClassifiedClause {
        clause_id: clause_id.clone(),
        clause_type: ClauseType::Other,
        confidence: 0.5,
    }
}

/// Medium with no issues: scored as Medium, but never tagged.
pub fn default_risk(clause_id: &ClauseId) -> RiskAssessment {
    RiskAssessment {
        clause_id: clause_id.clone(),
        risk_level: RiskLevel::Medium,
        issues: Vec::new(),
    }
}

pub fn default_redline(clause_id: &ClauseId, content: &str) -> Redline {
    Redline {
        clause_id: clause_id.clone(),
        original_text: truncate_chars(content, ORIGINAL_TEXT_MAX_CHARS).to_string(),
        suggested_text: DEFAULT_SUGGESTION.to_string(),
        rationale: DEFAULT_RATIONALE.to_string(),
    }
}

pub fn default_summary(contract: &ContractRiskSummary, critical_type: &str) -> ExecutiveSummary {
    let score = contract.overall_risk_score;
    ExecutiveSummary {
        overall_risk_score: score,
        summary: format!(
            "This contract has an overall risk score of {score}/100. \
             {}% of clauses are high risk. Manual review recommended.",
            contract.risk_distribution.high.trunc() as u32
        ),
        top_risks: vec![TopRisk {
            clause_id: contract.most_critical_clause.clone(),
            clause_type: critical_type.to_string(),
            risk_description: "Highest risk clause in the contract".to_string(),
            priority: 1,
        }],
        recommendations: vec![
            "Review all high-risk clauses with legal counsel".to_string(),
            "Consider negotiating more balanced terms".to_string(),
            "Ensure liability caps are in place".to_string(),
        ],
    }
}

// ── Helpers ──

/// Cut at the last sentence end if one falls late enough, else hard-cut
/// with an ellipsis.
fn shorten_explanation(text: &str) -> String {
    if text.chars().count() <= EXPLANATION_MAX_CHARS {
        return text.to_string();
    }
    let cut = truncate_chars(text, EXPLANATION_MAX_CHARS);
    match cut.rfind('.') {
        Some(idx) if cut[..idx].chars().count() > EXPLANATION_MIN_SENTENCE => {
            cut[..=idx].to_string()
        }
        _ => format!("{cut}..."),
    }
}

fn cap_with_marker(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}
