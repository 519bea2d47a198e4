//! Judgment records supplied by the external oracle.
//!
//! These are opaque to the core: the scoring engine and the annotation buffer
//! consume them but never judge their legal correctness.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ClauseId;

/// Categorical severity of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// High and Medium clauses count towards the risky-clause average.
    pub fn is_risky(&self) -> bool {
        matches!(self, Self::High | Self::Medium)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract clause categories understood by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClauseType {
    Termination,
    Indemnity,
    Arbitration,
    Jurisdiction,
    #[serde(rename = "IP Assignment")]
    IpAssignment,
    Confidentiality,
    Penalty,
    #[serde(rename = "Rent Escalation")]
    RentEscalation,
    #[serde(rename = "Non-compete")]
    NonCompete,
    #[serde(rename = "Data Protection")]
    DataProtection,
    #[serde(rename = "Payment Terms")]
    PaymentTerms,
    Liability,
    Other,
}

impl ClauseType {
    pub const ALL: [ClauseType; 13] = [
        ClauseType::Termination,
        ClauseType::Indemnity,
        ClauseType::Arbitration,
        ClauseType::Jurisdiction,
        ClauseType::IpAssignment,
        ClauseType::Confidentiality,
        ClauseType::Penalty,
        ClauseType::RentEscalation,
        ClauseType::NonCompete,
        ClauseType::DataProtection,
        ClauseType::PaymentTerms,
        ClauseType::Liability,
        ClauseType::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Termination => "Termination",
            Self::Indemnity => "Indemnity",
            Self::Arbitration => "Arbitration",
            Self::Jurisdiction => "Jurisdiction",
            Self::IpAssignment => "IP Assignment",
            Self::Confidentiality => "Confidentiality",
            Self::Penalty => "Penalty",
            Self::RentEscalation => "Rent Escalation",
            Self::NonCompete => "Non-compete",
            Self::DataProtection => "Data Protection",
            Self::PaymentTerms => "Payment Terms",
            Self::Liability => "Liability",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ClauseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedClause {
    pub clause_id: ClauseId,
    #[serde(rename = "type")]
    pub clause_type: ClauseType,
    pub confidence: f64,
}

/// A specific problem the oracle found in a clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "issue_type")]
    pub category: String,
    pub explanation: String,
    #[serde(default)]
    pub trigger_terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub clause_id: ClauseId,
    pub risk_level: RiskLevel,
    pub issues: Vec<Issue>,
}

impl RiskAssessment {
    /// The level to tag the clause with, if any.
    ///
    /// An empty issue list means "no tag" regardless of the level reported.
    pub fn tag_level(&self) -> Option<RiskLevel> {
        if self.issues.is_empty() {
            None
        } else {
            Some(self.risk_level)
        }
    }
}

/// Legal citation for a clause. `found == false` is an explicit
/// "not found" marker, never a fabricated reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub clause_id: ClauseId,
    pub section: Option<String>,
    pub law_name: Option<String>,
    pub explanation: Option<String>,
    pub found: bool,
}

impl Citation {
    pub fn not_found(clause_id: ClauseId) -> Self {
        Self {
            clause_id,
            section: None,
            law_name: None,
            explanation: None,
            found: false,
        }
    }

    /// `"<section>, <law>: <explanation>"` when found, or `"<section>, <law>"`
    /// without an explanation.
    pub fn reference(&self) -> Option<String> {
        if !self.found {
            return None;
        }
        let section = self.section.as_deref()?;
        let law = self.law_name.as_deref()?;
        Some(match self.explanation.as_deref() {
            Some(explanation) if !explanation.trim().is_empty() => {
                format!("{section}, {law}: {explanation}")
            }
            _ => format!("{section}, {law}"),
        })
    }
}

/// Suggested rewrite advice for a risky clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redline {
    pub clause_id: ClauseId,
    pub original_text: String,
    pub suggested_text: String,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopRisk {
    pub clause_id: ClauseId,
    pub clause_type: String,
    pub risk_description: String,
    pub priority: u32,
}

/// Plain-language summary for non-lawyers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub overall_risk_score: u8,
    pub summary: String,
    pub top_risks: Vec<TopRisk>,
    pub recommendations: Vec<String>,
}

impl ExecutiveSummary {
    /// Render as the plain-text report saved next to the JSON report.
    pub fn to_text(&self) -> String {
        let rule = "=".repeat(80);
        let thin = "-".repeat(80);
        let mut lines = vec![
            rule.clone(),
            "EXECUTIVE SUMMARY - CONTRACT RISK ANALYSIS".to_string(),
            "Generated by Nyaya".to_string(),
            rule.clone(),
            String::new(),
            format!("OVERALL RISK SCORE: {}/100", self.overall_risk_score),
            String::new(),
            score_band(self.overall_risk_score).to_string(),
            String::new(),
            "SUMMARY".to_string(),
            thin.clone(),
            self.summary.clone(),
            String::new(),
            String::new(),
            "TOP RISKS TO CONSIDER".to_string(),
            thin.clone(),
        ];
        for (i, risk) in self.top_risks.iter().enumerate() {
            lines.push(format!(
                "\n{}. {} (Clause: {})",
                i + 1,
                risk.clause_type,
                risk.clause_id
            ));
            lines.push(format!("   {}", risk.risk_description));
        }
        lines.extend([
            String::new(),
            String::new(),
            "RECOMMENDED ACTIONS".to_string(),
            thin,
        ]);
        for (i, rec) in self.recommendations.iter().enumerate() {
            lines.push(format!("{}. {rec}", i + 1));
        }
        lines.extend([
            String::new(),
            rule.clone(),
            "This is an automated analysis. Always consult with legal counsel".to_string(),
            "before making final decisions on contract execution.".to_string(),
            rule,
        ]);
        lines.join("\n")
    }
}

/// One-line band description for an overall score.
pub fn score_band(score: u8) -> &'static str {
    match score {
        70..=u8::MAX => "HIGH RISK - Significant concerns identified. Careful review recommended.",
        40..=69 => "MODERATE RISK - Some concerns present. Review key clauses.",
        _ => "LOW RISK - Generally balanced contract with minor concerns.",
    }
}
