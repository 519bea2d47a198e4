//! Prompt templates for each judgment task.
//!
//! System prompts fix the response contract (a single JSON object); user
//! prompts carry the clause under review, already length-capped.

use std::collections::HashMap;

use nyaya_core::{Clause, ClauseId, ClauseType, ContractRiskSummary, RiskLevel, truncate_chars};

// ── Classification ──

pub fn classify_system() -> String {
    let categories: Vec<String> = ClauseType::ALL
        .iter()
        .map(|t| format!("- {}", t.label()))
        .collect();
    format!(
        "\
You are an expert legal document analyst specialising in clause classification for Indian contracts.

Classify the contract clause into exactly one of these categories:

{categories}

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{{
  \"clause_id\": \"the clause identifier\",
  \"type\": \"one of the categories above\",
  \"confidence\": 0.95
}}

Rules:
- confidence is a number between 0.0 and 1.0
- type must match one of the categories exactly
- consider the Indian legal context
- if unclear, use \"Other\" with a lower confidence",
        categories = categories.join("\n"),
    )
}

pub fn classify_user(clause: &Clause, max_chars: usize) -> String {
    format!(
        "Classify this clause:\n\
         \n\
         Clause ID: {id}\n\
         Heading: {heading}\n\
         Content: {content}",
        id = clause.id,
        heading = clause.heading,
        content = truncate_chars(&clause.content, max_chars),
    )
}

// ── Risk assessment ──

pub const RISK_SYSTEM: &str = "\
You are an expert legal risk analyst specialising in Indian contract law.

Analyse the contract clause and identify risks for the party signing the contract. \
Only flag REAL, SIGNIFICANT risks. Standard boilerplate, balanced terms and normal \
business provisions get an EMPTY issues array.

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"clause_id\": \"the clause identifier\",
  \"risk_level\": \"High\" or \"Medium\" or \"Low\",
  \"issues\": [
    {
      \"issue_type\": \"brief issue category\",
      \"explanation\": \"detailed explanation of the risk\",
      \"trigger_terms\": [\"specific\", \"problematic\", \"terms\"]
    }
  ]
}

Risk levels:
- High: severe financial or legal exposure, unilateral termination, unlimited liability, IP loss without safeguards
- Medium: unclear terms, one-sided provisions, needs attention but not critical
- Low: minor imbalance or ambiguity

Consider the Indian Contract Act 1872, consumer protection law, the IT Act 2000 \
and standard business practice in India.";

pub fn risk_user(clause: &Clause, clause_type: Option<ClauseType>, max_chars: usize) -> String {
    format!(
        "Analyze this clause:\n\
         \n\
         Clause ID: {id}\n\
         Type: {ty}\n\
         Content: {content}",
        id = clause.id,
        ty = clause_type.unwrap_or(ClauseType::Other).label(),
        content = truncate_chars(&clause.content, max_chars),
    )
}

// ── Legal citation ──

pub const CITE_SYSTEM: &str = "\
You are an expert on Indian contract and commercial law.

Find a REAL, ACCURATE reference in Indian law that is relevant to the contract clause. \
Look to the Indian Contract Act, 1872; the Consumer Protection Act, 2019; the Specific \
Relief Act, 1963; and other Indian commercial statutes.

NEVER guess or invent a section number. If you are not confident, set found to false. \
Saying \"not found\" is always better than a wrong citation.

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"clause_id\": \"the clause identifier\",
  \"section\": \"Section 23\" or null,
  \"law_name\": \"Indian Contract Act, 1872\" or null,
  \"explanation\": \"one or two sentences on why the section applies\" or null,
  \"found\": true or false
}

Keep the explanation to 30-50 words and give the full name of the law with its year.";

pub fn cite_user(clause: &Clause, level: RiskLevel, max_chars: usize) -> String {
    format!(
        "Find the most relevant Indian law citation for this clause:\n\
         \n\
         Clause ID: {id}\n\
         Risk Level: {level}\n\
         Clause Content: {content}",
        id = clause.id,
        content = truncate_chars(&clause.content, max_chars),
    )
}

// ── Redline suggestion ──

pub const REDLINE_SYSTEM: &str = "\
You are an expert contract negotiation advisor specialising in Indian commercial law.

Give SHORT, ACTIONABLE advice on how to improve a risky clause. Do not rewrite the clause.

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"clause_id\": \"the clause identifier from the input\",
  \"original_text\": \"first 80-100 characters of the original clause\",
  \"suggested_text\": \"2-3 short sentences of concise advice\",
  \"rationale\": \"one short sentence on why this helps\"
}

Focus on the key improvements: make unilateral terms mutual, add notice periods \
(30-60 days), add liability caps, clarify vague terms and add safeguards.

Example suggested_text:
\"Add 30-day written notice before termination. Cap liability at 12 months of fees. \
Make indemnification mutual.\"";

pub fn redline_user(
    clause: &Clause,
    level: RiskLevel,
    legal_context: Option<&str>,
    max_chars: usize,
) -> String {
    format!(
        "Generate redline:\n\
         \n\
         Clause ID: {id}\n\
         Risk Level: {level}\n\
         Original: {content}\n\
         Legal Context: {context}",
        id = clause.id,
        content = truncate_chars(&clause.content, max_chars),
        context = legal_context.unwrap_or("No specific legal reference"),
    )
}

// ── Executive summary ──

pub const SUMMARY_SYSTEM: &str = "\
You explain complex legal contracts to non-lawyers in simple, clear language.

Write an executive summary that helps business stakeholders understand the contract's \
risks without legal jargon. Focus on business impact, be specific about consequences, \
and give actionable negotiation points.

Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{
  \"overall_risk_score\": 75,
  \"summary\": \"2-3 paragraph executive summary in plain language\",
  \"top_risks\": [
    {
      \"clause_id\": \"clause_X\",
      \"clause_type\": \"Termination\",
      \"risk_description\": \"plain language description of the risk\",
      \"priority\": 1
    }
  ],
  \"recommendations\": [\"actionable recommendation\"]
}

List at most 5 top risks, ordered by severity.";

/// Clauses listed per level in the summary prompt.
const SUMMARY_DETAIL_LIMIT: usize = 5;
const SUMMARY_EXCERPT_CHARS: usize = 150;

/// Everything the summary prompt draws on.
pub struct SummaryContext<'a> {
    pub contract: &'a ContractRiskSummary,
    pub clauses: &'a [Clause],
    pub levels: &'a HashMap<ClauseId, RiskLevel>,
    pub types: &'a HashMap<ClauseId, ClauseType>,
}

impl SummaryContext<'_> {
    pub fn type_label(&self, id: &ClauseId) -> &'static str {
        self.types.get(id).map_or("Unknown", |t| t.label())
    }

    fn at_level(&self, level: RiskLevel) -> impl Iterator<Item = &Clause> {
        self.clauses
            .iter()
            .filter(move |c| self.levels.get(&c.id) == Some(&level))
            .take(SUMMARY_DETAIL_LIMIT)
    }
}

pub fn summary_user(ctx: &SummaryContext<'_>) -> String {
    let high: Vec<String> = ctx
        .at_level(RiskLevel::High)
        .map(|c| {
            format!(
                "- {} ({}): {} - {}...",
                c.id,
                ctx.type_label(&c.id),
                c.heading,
                truncate_chars(&c.content, SUMMARY_EXCERPT_CHARS)
            )
        })
        .collect();
    let medium: Vec<String> = ctx
        .at_level(RiskLevel::Medium)
        .map(|c| format!("- {} ({}): {}", c.id, ctx.type_label(&c.id), c.heading))
        .collect();
    let or_none = |lines: Vec<String>| {
        if lines.is_empty() {
            "None".to_string()
        } else {
            lines.join("\n")
        }
    };
    let dist = &ctx.contract.risk_distribution;

    format!(
        "Generate executive summary for this contract:\n\
         \n\
         Overall Risk Score: {score}/100\n\
         Risk Distribution: High: {high_pct}%, Medium: {medium_pct}%, Low: {low_pct}%\n\
         Total Clauses: {total}\n\
         Most Critical Clause: {critical}\n\
         \n\
         High Risk Clauses:\n\
         {high}\n\
         \n\
         Medium Risk Clauses:\n\
         {medium}\n\
         \n\
         Create a clear, non-technical summary for business stakeholders.",
        score = ctx.contract.overall_risk_score,
        high_pct = dist.high,
        medium_pct = dist.medium,
        low_pct = dist.low,
        total = ctx.clauses.len(),
        critical = ctx.contract.most_critical_clause,
        high = or_none(high),
        medium = or_none(medium),
    )
}
