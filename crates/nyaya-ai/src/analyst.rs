//! Typed judgment requests over an [`Oracle`].
//!
//! The analyst builds the prompt, calls the oracle through the retry wrapper,
//! and validates the answer. A response that fails validation is replaced by
//! the task's named default and logged; transport failures are returned to
//! the caller untouched.

use std::sync::Arc;

use nyaya_core::{
    Citation, ClassifiedClause, Clause, ClauseId, ClauseType, ExecutiveSummary, Redline,
    RiskAssessment, RiskLevel,
};
use tracing::{info, warn};

use crate::prompts::{self, SummaryContext};
use crate::response::{self, ResponseError};
use crate::{Oracle, OracleError, OracleRequest, RetryPolicy, Task, with_backoff};

/// Per-task clause content caps, in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCaps {
    pub classify: usize,
    pub risk: usize,
    pub cite: usize,
    pub redline: usize,
}

impl Default for ContentCaps {
    fn default() -> Self {
        Self {
            classify: 1000,
            risk: 2000,
            cite: 1500,
            redline: 1000,
        }
    }
}

pub struct Analyst {
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
    caps: ContentCaps,
}

impl Analyst {
    pub fn new(oracle: Arc<dyn Oracle>, retry: RetryPolicy, caps: ContentCaps) -> Self {
        Self {
            oracle,
            retry,
            caps,
        }
    }

    pub fn model(&self) -> &str {
        self.oracle.model()
    }

    pub async fn classify(&self, clause: &Clause) -> Result<ClassifiedClause, OracleError> {
        let request = OracleRequest::new(
            Task::Classify,
            Some(clause.id.clone()),
            prompts::classify_system(),
            prompts::classify_user(clause, self.caps.classify),
        );
        let classified = self
            .ask(
                &request,
                |raw| response::parse_classification(&clause.id, raw),
                || response::default_classification(&clause.id),
            )
            .await?;
        info!(
            clause_id = %clause.id,
            clause_type = %classified.clause_type,
            confidence = classified.confidence,
            "classified clause"
        );
        Ok(classified)
    }

    pub async fn assess_risk(
        &self,
        clause: &Clause,
        clause_type: Option<ClauseType>,
    ) -> Result<RiskAssessment, OracleError> {
        let request = OracleRequest::new(
            Task::Risk,
            Some(clause.id.clone()),
            prompts::RISK_SYSTEM,
            prompts::risk_user(clause, clause_type, self.caps.risk),
        );
        let assessment = self
            .ask(
                &request,
                |raw| response::parse_risk(&clause.id, raw),
                || response::default_risk(&clause.id),
            )
            .await?;
        info!(
            clause_id = %clause.id,
            level = %assessment.risk_level,
            issues = assessment.issues.len(),
            "assessed risk"
        );
        Ok(assessment)
    }

    pub async fn find_citation(
        &self,
        clause: &Clause,
        level: RiskLevel,
    ) -> Result<Citation, OracleError> {
        let request = OracleRequest::new(
            Task::Cite,
            Some(clause.id.clone()),
            prompts::CITE_SYSTEM,
            prompts::cite_user(clause, level, self.caps.cite),
        );
        let citation = self
            .ask(
                &request,
                |raw| response::parse_citation(&clause.id, raw),
                || Citation::not_found(clause.id.clone()),
            )
            .await?;
        match citation.reference() {
            Some(reference) => info!(clause_id = %clause.id, %reference, "citation found"),
            None => info!(clause_id = %clause.id, "no confident citation"),
        }
        Ok(citation)
    }

    pub async fn suggest_redline(
        &self,
        clause: &Clause,
        level: RiskLevel,
        legal_context: Option<&str>,
    ) -> Result<Redline, OracleError> {
        let request = OracleRequest::new(
            Task::Redline,
            Some(clause.id.clone()),
            prompts::REDLINE_SYSTEM,
            prompts::redline_user(clause, level, legal_context, self.caps.redline),
        );
        let redline = self
            .ask(
                &request,
                |raw| response::parse_redline(&clause.id, &clause.content, raw),
                || response::default_redline(&clause.id, &clause.content),
            )
            .await?;
        info!(clause_id = %clause.id, "generated redline");
        Ok(redline)
    }

    pub async fn summarize(
        &self,
        ctx: &SummaryContext<'_>,
    ) -> Result<ExecutiveSummary, OracleError> {
        let request = OracleRequest::new(
            Task::Summarize,
            None,
            prompts::SUMMARY_SYSTEM,
            prompts::summary_user(ctx),
        );
        let score = ctx.contract.overall_risk_score;
        let critical: &ClauseId = &ctx.contract.most_critical_clause;
        let summary = self
            .ask(
                &request,
                |raw| response::parse_summary(score, raw),
                || response::default_summary(ctx.contract, ctx.type_label(critical)),
            )
            .await?;
        info!(
            top_risks = summary.top_risks.len(),
            recommendations = summary.recommendations.len(),
            "generated executive summary"
        );
        Ok(summary)
    }

    async fn ask<T>(
        &self,
        request: &OracleRequest,
        parse: impl FnOnce(&str) -> Result<T, ResponseError>,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, OracleError> {
        let task = request.task;
        let clause_id = request.clause_id.as_ref().map(ClauseId::as_str).unwrap_or("-");

        let raw = match with_backoff(&self.retry, task.as_str(), || self.oracle.complete(request))
            .await
        {
            Ok(raw) => raw,
            Err(OracleError::Malformed(reason)) => {
                warn!(%task, clause_id, %reason, "unusable oracle response, using default");
                return Ok(fallback());
            }
            Err(e) => return Err(e),
        };

        match parse(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(%task, clause_id, error = %e, "oracle response failed validation, using default");
                Ok(fallback())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use nyaya_core::ClauseMarker;

    use super::*;
    use crate::ScriptedOracle;

    fn clause() -> Clause {
        Clause {
            id: ClauseId::from("clause_5"),
            marker: ClauseMarker::Ordinal("5".into()),
            heading: "Liability".into(),
            content: "The Vendor shall bear unlimited liability for all losses.".into(),
            page: 2,
        }
    }

    fn analyst(oracle: ScriptedOracle) -> (Analyst, Arc<ScriptedOracle>) {
        let oracle = Arc::new(oracle);
        let analyst = Analyst::new(
            oracle.clone(),
            RetryPolicy::immediate(),
            ContentCaps::default(),
        );
        (analyst, oracle)
    }

    #[tokio::test]
    async fn valid_response_is_used() {
        let (analyst, oracle) = analyst(ScriptedOracle::new(|_| {
            Ok(r#"{"clause_id": "clause_5", "risk_level": "High",
                   "issues": [{"issue_type": "Unlimited liability",
                               "explanation": "No cap.", "trigger_terms": ["unlimited liability"]}]}"#
                .into())
        }));
        let assessment = analyst
            .assess_risk(&clause(), Some(ClauseType::Liability))
            .await
            .unwrap();
        assert_eq!(assessment.tag_level(), Some(RiskLevel::High));
        let calls = oracle.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].temperature, 0.2);
        assert!(calls[0].user_prompt.contains("Type: Liability"));
    }

    #[tokio::test]
    async fn invalid_response_falls_back_to_default() {
        let (analyst, _) = analyst(ScriptedOracle::new(|_| Ok("I cannot help with that.".into())));
        let classified = analyst.classify(&clause()).await.unwrap();
        assert_eq!(classified.clause_type, ClauseType::Other);
        assert_eq!(classified.confidence, 0.5);

        let redline = analyst
            .suggest_redline(&clause(), RiskLevel::High, None)
            .await
            .unwrap();
        assert_eq!(redline.suggested_text, response::DEFAULT_SUGGESTION);
    }

    #[tokio::test]
    async fn malformed_transport_reply_falls_back() {
        let (analyst, _) = analyst(ScriptedOracle::new(|_| {
            Err(OracleError::Malformed("no candidates".into()))
        }));
        let citation = analyst
            .find_citation(&clause(), RiskLevel::High)
            .await
            .unwrap();
        assert!(!citation.found);
    }

    #[tokio::test]
    async fn server_errors_propagate() {
        let (analyst, oracle) = analyst(ScriptedOracle::new(|_| {
            Err(OracleError::Server {
                status: 503,
                body: "unavailable".into(),
            })
        }));
        let err = analyst.classify(&clause()).await.unwrap_err();
        assert!(matches!(err, OracleError::Server { status: 503, .. }));
        assert_eq!(oracle.calls().len(), 1);
    }

    #[tokio::test]
    async fn rate_limits_are_retried_then_surface() {
        let (analyst, oracle) = analyst(ScriptedOracle::new(|_| {
            Err(OracleError::RateLimited {
                message: "quota exceeded".into(),
                retry_after: None,
            })
        }));
        let err = analyst.classify(&clause()).await.unwrap_err();
        assert!(err.is_rate_limit());
        assert_eq!(oracle.calls().len(), 4);
    }
}
