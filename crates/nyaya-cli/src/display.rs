//! Terminal cards for analysis runs.
//!
//! Everything here prints to stdout; logs go to stderr via tracing.

use std::path::Path;

use nyaya_core::{Clause, ClauseRiskScore, score_band, truncate_chars};
use nyaya_pipeline::AnalysisState;
use nyaya_store::SavedRun;

const LABEL_WIDTH: usize = 26;
const HEADING_WIDTH: usize = 60;
const MAX_TOP_RISKS: usize = 5;

// ── Public API ──

/// Print the outcome of a completed run.
pub fn print_run_card(source: &Path, state: &AnalysisState, saved: &SavedRun) {
    println!("=== {} ===", source.display());
    println!();

    println!("Document");
    field("clauses", state.clauses.len());
    field("stage", state.stage.map_or("none", |s| s.as_str()));
    println!();

    if let Some(contract) = &state.contract_risk {
        println!("Risk");
        field(
            "overall score",
            format!("{}/100", contract.overall_risk_score),
        );
        field("band", score_band(contract.overall_risk_score));
        field(
            "distribution",
            format!(
                "high {:.1}%  medium {:.1}%  low {:.1}%",
                contract.risk_distribution.high,
                contract.risk_distribution.medium,
                contract.risk_distribution.low
            ),
        );
        field("concentration index", contract.risk_concentration_index);
        field("most critical", &contract.most_critical_clause);
        println!();
    }

    let found = state.citations.iter().filter(|c| c.found).count();
    println!("Annotation");
    field("citations", format!("{found}/{} found", state.citations.len()));
    field("suggestions", state.redlines.len());
    println!();

    if let Some(summary) = &state.executive_summary {
        println!("Top Risks");
        for risk in summary.top_risks.iter().take(MAX_TOP_RISKS) {
            println!(
                "  {}. {} ({})",
                risk.priority, risk.clause_type, risk.clause_id
            );
            println!("     {}", risk.risk_description);
        }
        println!();
    }

    println!("Output");
    field("report", saved.report.display());
    field("annotated contract", saved.annotated.display());
    if let Some(path) = &saved.summary {
        field("executive summary", path.display());
    }
}

/// Print one line per segmented clause.
pub fn print_clause_table(clauses: &[Clause]) {
    println!("{:<16} {:>4}  {}", "clause", "page", "heading");
    for clause in clauses {
        println!(
            "{:<16} {:>4}  {}",
            clause.id,
            clause.page,
            truncate_chars(&clause.heading, HEADING_WIDTH)
        );
    }
    println!();
    println!("{} clauses", clauses.len());
}

pub fn print_score(score: &ClauseRiskScore) {
    field("level", score.level);
    field("base score", score.base_score);
    if score.modifiers.is_empty() {
        field("modifiers", "none");
    }
    for m in &score.modifiers {
        field(&format!("{:+}", m.delta), &m.reason);
    }
    field("final score", score.final_score);
}

/// One-line failure report for a halted run.
pub fn print_failure(state: &AnalysisState) {
    let reached = state.stage.map_or("none", |s| s.as_str());
    if let Some(err) = &state.error {
        eprintln!("analysis halted in {} stage: {err}", err.stage());
    }
    eprintln!("  last completed stage: {reached}");
    eprintln!(
        "  clauses {} / scored {} / citations {} / suggestions {}",
        state.clauses.len(),
        state.scores.len(),
        state.citations.len(),
        state.redlines.len()
    );
}

// ── Helpers ──

fn field(label: &str, value: impl std::fmt::Display) {
    println!("  {label:<LABEL_WIDTH$} {value}");
}
