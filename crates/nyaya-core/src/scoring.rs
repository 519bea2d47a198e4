//! Deterministic, rule-based risk scoring.
//!
//! A clause score starts from a base fixed by the oracle's [`RiskLevel`] and is
//! adjusted by ten independent keyword rules. No rule short-circuits another;
//! each rule that matches at least one of its terms contributes exactly one
//! [`ScoreModifier`]. The result is clamped to `0..=100`.
//!
//! # Contract aggregation
//!
//! ```text
//! overall = clamp(round(0.6 * high% + 0.3 * medium% + 0.2 * avg_risky), 0, 100)
//! concentration = (high / total) * (avg_risky / 100)
//! ```
//!
//! where `avg_risky` is the mean final score over High and Medium clauses only.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{ClauseId, RiskLevel};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoringError {
    #[error("no clause scores provided")]
    NoClauses,
}

/// Which keyword rule produced a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    UnilateralLanguage,
    UnlimitedLiability,
    IpNoCompensation,
    BroadIndemnity,
    VagueLanguage,
    BalancedLanguage,
    JurisdictionWarningSigns,
    PaymentRedFlags,
    TerminationRedFlags,
    JurisdictionProtectiveTerms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreModifier {
    pub kind: ModifierKind,
    pub delta: i32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseRiskScore {
    pub clause_id: ClauseId,
    pub level: RiskLevel,
    pub base_score: u8,
    pub modifiers: Vec<ScoreModifier>,
    pub final_score: u8,
}

impl ClauseRiskScore {
    pub fn total_delta(&self) -> i32 {
        self.modifiers.iter().map(|m| m.delta).sum()
    }
}

/// Percentage of clauses at each level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRiskSummary {
    pub overall_risk_score: u8,
    pub risk_distribution: RiskDistribution,
    pub most_critical_clause: ClauseId,
    pub risk_concentration_index: f64,
    pub avg_risky_score: f64,
}

// ── Keyword rules ──

struct Rule {
    kind: ModifierKind,
    delta: i32,
    keywords: &'static [&'static str],
    /// Matched terms quoted in the reason string.
    shown: usize,
    label: &'static str,
}

const UNILATERAL: &[&str] = &[
    "sole discretion",
    "without notice",
    "absolute right",
    "at its discretion",
    "unilaterally",
    "without consent",
    "without approval",
    "at any time without",
    "sole judgment",
    "at our sole option",
    "may terminate immediately",
    "without cause",
    "at will",
    "in its sole opinion",
    "as we deem fit",
    "reserves the right to",
    "without any obligation",
    "absolute authority",
    "unfettered discretion",
    "without restriction",
    "exclusive right to",
    "unconditional right",
];

const UNLIMITED_LIABILITY: &[&str] = &[
    "unlimited liability",
    "no cap on liability",
    "without limitation",
    "no maximum liability",
    "unlimited damages",
    "no limit to liability",
    "full liability",
    "entire liability",
    "complete indemnification",
    "all damages",
    "any and all losses",
    "consequential damages unlimited",
    "punitive damages",
    "all direct and indirect",
    "unlimited indemnity",
];

const IP_NO_COMPENSATION: &[&str] = &[
    "assigns all rights",
    "transfers all intellectual property",
    "work for hire without additional",
    "ip assignment without compensation",
    "irrevocably assigns",
    "waives all rights to",
    "exclusive ownership without",
    "perpetual license without",
    "all proprietary rights",
    "intellectual property vests",
    "ownership automatically transfers",
    "assigns without consideration",
];

const BROAD_INDEMNITY: &[&str] = &[
    "indemnify and hold harmless",
    "fully indemnify",
    "shall indemnify for any",
    "indemnify against all claims",
    "unlimited indemnification",
    "defend and indemnify",
    "indemnify from any and all",
    "hold harmless from all",
    "indemnification without limit",
    "indemnify against any liability",
    "save harmless",
    "bear all liability",
    "responsible for all claims",
];

const VAGUE: &[&str] = &[
    "as deemed appropriate",
    "from time to time",
    "reasonable at its discretion",
    "as necessary",
    "as required",
    "such other",
    "and/or similar",
    "at the discretion of",
    "in its opinion",
    "as it sees fit",
    "at such times",
    "in such manner",
    "may be required",
    "reasonably required",
    "appropriate measures",
    "sufficient notice",
    "adequate protection",
    "reasonable time",
    "as appropriate",
    "among other things",
];

const BALANCED: &[&str] = &[
    "mutual",
    "both parties",
    "subject to notice period",
    "with prior written notice",
    "mutually agree",
    "reasonable notice",
    "upon mutual consent",
    "jointly",
    "reciprocal",
    "either party",
    "each party",
    "mutually acceptable",
    "written consent of both",
    "joint decision",
    "bilateral",
    "equal footing",
    "fair and reasonable",
    "on similar terms",
    "symmetrical",
    "equitable",
];

const JURISDICTION_WARNING: &[&str] = &[
    "waiver of consumer rights",
    "no recourse to courts",
    "foreign law governed",
    "waiver of statutory rights",
    "excluding indian jurisdiction",
    "arbitration outside india",
    "foreign arbitration mandatory",
    "no msme protection",
    "waiver under contract act",
    "governed by foreign law exclusively",
];

const PAYMENT_RED_FLAGS: &[&str] = &[
    "payment at sole discretion",
    "no refund policy",
    "non-refundable",
    "forfeiture of deposit",
    "penalty without limit",
    "liquidated damages unlimited",
    "charges without notice",
    "price change without notice",
    "payment terms subject to change",
];

/// The last entry covers the sole-discretion exit, scored 70 + 10 + 8 = 88 at High.
const TERMINATION_RED_FLAGS: &[&str] = &[
    "terminate without cause",
    "immediate termination without notice",
    "no cure period",
    "forfeit all payments on termination",
    "no compensation on termination",
    "terminate for convenience",
    "unilateral termination right",
    "terminate this agreement at its sole discretion",
];

const JURISDICTION_PROTECTIVE: &[&str] = &[
    "registered agreement",
    "stamp duty",
    "notarized",
    "force majeure",
    "as per indian law",
    "subject to indian courts",
    "arbitration under arbitration act",
    "governed by laws of india",
    "jurisdiction of indian courts",
    "indian contract act",
    "consumer protection act",
    "msme act compliance",
    "registered under companies act",
];

const RULES: [Rule; 10] = [
    Rule {
        kind: ModifierKind::UnilateralLanguage,
        delta: 10,
        keywords: UNILATERAL,
        shown: 3,
        label: "Unilateral terms detected",
    },
    Rule {
        kind: ModifierKind::UnlimitedLiability,
        delta: 15,
        keywords: UNLIMITED_LIABILITY,
        shown: 2,
        label: "Unlimited liability terms",
    },
    Rule {
        kind: ModifierKind::IpNoCompensation,
        delta: 10,
        keywords: IP_NO_COMPENSATION,
        shown: 2,
        label: "IP assignment without clear compensation",
    },
    Rule {
        kind: ModifierKind::BroadIndemnity,
        delta: 10,
        keywords: BROAD_INDEMNITY,
        shown: 1,
        label: "Broad indemnity clause",
    },
    Rule {
        kind: ModifierKind::VagueLanguage,
        delta: 5,
        keywords: VAGUE,
        shown: 3,
        label: "Vague terms detected",
    },
    Rule {
        kind: ModifierKind::BalancedLanguage,
        delta: -5,
        keywords: BALANCED,
        shown: 2,
        label: "Balanced terms found",
    },
    Rule {
        kind: ModifierKind::JurisdictionWarningSigns,
        delta: 8,
        keywords: JURISDICTION_WARNING,
        shown: 2,
        label: "Jurisdiction concerns",
    },
    Rule {
        kind: ModifierKind::PaymentRedFlags,
        delta: 7,
        keywords: PAYMENT_RED_FLAGS,
        shown: 2,
        label: "Payment concerns",
    },
    Rule {
        kind: ModifierKind::TerminationRedFlags,
        delta: 8,
        keywords: TERMINATION_RED_FLAGS,
        shown: 2,
        label: "Termination concerns",
    },
    Rule {
        kind: ModifierKind::JurisdictionProtectiveTerms,
        delta: -3,
        keywords: JURISDICTION_PROTECTIVE,
        shown: 2,
        label: "Jurisdiction protections",
    },
];

impl Rule {
    fn evaluate(&self, lowered: &str) -> Option<ScoreModifier> {
        let matched: Vec<&str> = self
            .keywords
            .iter()
            .copied()
            .filter(|kw| lowered.contains(kw))
            .collect();
        if matched.is_empty() {
            return None;
        }
        let shown = &matched[..matched.len().min(self.shown)];
        Some(ScoreModifier {
            kind: self.kind,
            delta: self.delta,
            reason: format!("{}: {}", self.label, shown.join(", ")),
        })
    }
}

// ── Public API ──

/// Base score contributed by the oracle's level.
pub fn base_score(level: RiskLevel) -> u8 {
    match level {
        RiskLevel::High => 70,
        RiskLevel::Medium => 40,
        RiskLevel::Low => 10,
    }
}

/// Score one clause. Pure: identical inputs give identical outputs.
pub fn score_clause(clause_id: &ClauseId, content: &str, level: RiskLevel) -> ClauseRiskScore {
    let lowered = content.to_lowercase();
    let base = base_score(level);
    let modifiers: Vec<ScoreModifier> = RULES.iter().filter_map(|r| r.evaluate(&lowered)).collect();
    let total: i32 = modifiers.iter().map(|m| m.delta).sum();
    let final_score = (i32::from(base) + total).clamp(0, 100) as u8;

    debug!(
        clause_id = %clause_id,
        base,
        modifiers = total,
        final_score,
        "scored clause"
    );

    ClauseRiskScore {
        clause_id: clause_id.clone(),
        level,
        base_score: base,
        modifiers,
        final_score,
    }
}

/// Aggregate clause scores into a contract-level summary.
pub fn aggregate(scores: &[ClauseRiskScore]) -> Result<ContractRiskSummary, ScoringError> {
    let Some(first) = scores.first() else {
        return Err(ScoringError::NoClauses);
    };

    let total = scores.len() as f64;
    let count = |level: RiskLevel| scores.iter().filter(|s| s.level == level).count();
    let (high, medium, low) = (
        count(RiskLevel::High),
        count(RiskLevel::Medium),
        count(RiskLevel::Low),
    );
    let high_pct = high as f64 / total * 100.0;
    let medium_pct = medium as f64 / total * 100.0;
    let low_pct = low as f64 / total * 100.0;

    let risky: Vec<f64> = scores
        .iter()
        .filter(|s| s.level.is_risky())
        .map(|s| f64::from(s.final_score))
        .collect();
    let avg_risky = if risky.is_empty() {
        0.0
    } else {
        risky.iter().sum::<f64>() / risky.len() as f64
    };

    let raw = 0.6 * high_pct + 0.3 * medium_pct + 0.2 * avg_risky;
    let overall = raw.round().clamp(0.0, 100.0) as u8;

    // First clause wins ties.
    let mut critical = first;
    for score in &scores[1..] {
        if score.final_score > critical.final_score {
            critical = score;
        }
    }

    let concentration = (high as f64 / total) * (avg_risky / 100.0);

    info!(
        overall,
        high,
        medium,
        low,
        avg_risky,
        "contract risk score"
    );

    Ok(ContractRiskSummary {
        overall_risk_score: overall,
        risk_distribution: RiskDistribution {
            high: round_to(high_pct, 2),
            medium: round_to(medium_pct, 2),
            low: round_to(low_pct, 2),
        },
        most_critical_clause: critical.clause_id.clone(),
        risk_concentration_index: round_to(concentration, 3),
        avg_risky_score: avg_risky,
    })
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
