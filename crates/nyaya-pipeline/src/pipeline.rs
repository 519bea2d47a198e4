//! Fixed-order stage sequencer.
//!
//! Stages run strictly one after another over a single [`AnalysisState`]:
//!
//! 1. segment: pages into clauses, initial annotated document
//! 2. classify: clause type per clause
//! 3. score: risk assessment, deterministic score, risk layer
//! 4. cite: legal citation for every risk-tagged clause
//! 5. redline: rewrite advice for every cited clause
//! 6. summarize: contract aggregation and executive summary
//!
//! The first fatal error stops the run. Nothing already produced is rolled back.

use std::sync::Arc;

use nyaya_ai::{Analyst, Oracle, SummaryContext};
use nyaya_core::{
    AnnotatedDocument, AnnotationError, AnnotationState, Page, RiskLevel, aggregate, score_clause,
    segment,
};
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::state::{AnalysisState, Stage, StageError};

pub struct Pipeline {
    analyst: Analyst,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(oracle: Arc<dyn Oracle>, config: PipelineConfig) -> Self {
        let analyst = Analyst::new(oracle, config.retry.clone(), config.caps.clone());
        Self { analyst, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        self.analyst.model()
    }

    /// Run every stage over `pages`. Always returns the state; a fatal
    /// failure is recorded in [`AnalysisState::error`].
    pub async fn run(&self, pages: &[Page]) -> AnalysisState {
        let mut state = AnalysisState::new();
        let total = Stage::SEQUENCE.len();

        for stage in Stage::SEQUENCE {
            info!("[{}/{total}] {stage}", stage.position());
            let result = match stage {
                Stage::Segment => self.segment(&mut state, pages),
                Stage::Classify => self.classify(&mut state).await,
                Stage::Score => self.score(&mut state).await,
                Stage::Cite => self.cite(&mut state).await,
                Stage::Redline => self.redline(&mut state).await,
                Stage::Summarize => self.summarize(&mut state).await,
                Stage::Completed => Ok(()),
            };
            if let Err(e) = result {
                error!(stage = %stage, error = %e, "stage failed, halting run");
                state.record(stage, format!("failed: {e}"));
                state.error = Some(e);
                return state;
            }
            state.stage = Some(stage);
        }

        state.stage = Some(Stage::Completed);
        info!("analysis complete");
        state
    }

    fn segment(&self, state: &mut AnalysisState, pages: &[Page]) -> Result<(), StageError> {
        let segmentation = segment(pages)?;
        state.document = Some(AnnotatedDocument::new(
            &self.config.title,
            &segmentation.clauses,
        ));
        state.record(
            Stage::Segment,
            format!("{} clauses from {} pages", segmentation.clauses.len(), pages.len()),
        );
        state.clauses = segmentation.clauses;
        state.text = segmentation.text;
        Ok(())
    }

    async fn classify(&self, state: &mut AnalysisState) -> Result<(), StageError> {
        for clause in &state.clauses {
            let classified = self
                .analyst
                .classify(clause)
                .await
                .map_err(StageError::oracle(Stage::Classify))?;
            state.classified.insert(clause.id.clone(), classified);
        }
        state.record(
            Stage::Classify,
            format!("{} clauses classified", state.classified.len()),
        );
        Ok(())
    }

    async fn score(&self, state: &mut AnalysisState) -> Result<(), StageError> {
        let Some(doc) = state.document.as_mut() else {
            return Err(StageError::NotSegmented(Stage::Score));
        };

        let mut tagged = 0;
        for clause in &state.clauses {
            let clause_type = state.classified.get(&clause.id).map(|c| c.clause_type);
            let assessment = self
                .analyst
                .assess_risk(clause, clause_type)
                .await
                .map_err(StageError::oracle(Stage::Score))?;

            let score = score_clause(&clause.id, &clause.content, assessment.risk_level);
            info!(
                clause_id = %clause.id,
                level = %assessment.risk_level,
                score = score.final_score,
                "clause scored"
            );

            let tag = assessment.tag_level();
            if apply_layer(Stage::Score, doc.apply_risk(&clause.id, tag))? && tag.is_some() {
                tagged += 1;
            }

            state
                .risk_levels
                .insert(clause.id.clone(), assessment.risk_level);
            state.assessments.insert(clause.id.clone(), assessment);
            state.scores.push(score);
        }

        let count = |level: RiskLevel| state.risk_levels.values().filter(|l| **l == level).count();
        let detail = format!(
            "high={} medium={} low={} tagged={tagged}",
            count(RiskLevel::High),
            count(RiskLevel::Medium),
            count(RiskLevel::Low)
        );
        info!(%detail, "risk detection complete");
        state.record(Stage::Score, detail);
        Ok(())
    }

    async fn cite(&self, state: &mut AnalysisState) -> Result<(), StageError> {
        let Some(doc) = state.document.as_mut() else {
            return Err(StageError::NotSegmented(Stage::Cite));
        };

        let mut calls = 0;
        for clause in &state.clauses {
            let Some(AnnotationState::Tagged { level }) = doc.state(&clause.id).cloned() else {
                continue;
            };
            if calls > 0 {
                pause(&self.config).await;
            }
            calls += 1;

            let citation = self
                .analyst
                .find_citation(clause, level)
                .await
                .map_err(StageError::oracle(Stage::Cite))?;
            apply_layer(Stage::Cite, doc.apply_citation(&clause.id, &citation))?;
            state.citations.push(citation);
        }

        let found = state.citations.iter().filter(|c| c.found).count();
        info!(found, total = state.citations.len(), "legal retrieval complete");
        state.record(
            Stage::Cite,
            format!("found {found}/{} citations", state.citations.len()),
        );
        Ok(())
    }

    async fn redline(&self, state: &mut AnalysisState) -> Result<(), StageError> {
        let Some(doc) = state.document.as_mut() else {
            return Err(StageError::NotSegmented(Stage::Redline));
        };

        let mut calls = 0;
        for clause in &state.clauses {
            let Some(AnnotationState::Cited { level, .. }) = doc.state(&clause.id).cloned() else {
                continue;
            };
            if calls > 0 {
                pause(&self.config).await;
            }
            calls += 1;

            let legal_context = state
                .citations
                .iter()
                .find(|c| c.clause_id == clause.id)
                .and_then(|c| c.reference());
            let redline = self
                .analyst
                .suggest_redline(clause, level, legal_context.as_deref())
                .await
                .map_err(StageError::oracle(Stage::Redline))?;
            apply_layer(
                Stage::Redline,
                doc.apply_suggestion(&clause.id, &redline.suggested_text),
            )?;
            state.redlines.push(redline);
        }

        info!(count = state.redlines.len(), "redline generation complete");
        state.record(
            Stage::Redline,
            format!("{} suggestions", state.redlines.len()),
        );
        Ok(())
    }

    async fn summarize(&self, state: &mut AnalysisState) -> Result<(), StageError> {
        let contract = aggregate(&state.scores)?;
        let types = state.clause_types();
        let ctx = SummaryContext {
            contract: &contract,
            clauses: &state.clauses,
            levels: &state.risk_levels,
            types: &types,
        };
        let summary = self
            .analyst
            .summarize(&ctx)
            .await
            .map_err(StageError::oracle(Stage::Summarize))?;

        info!(
            overall = contract.overall_risk_score,
            most_critical = %contract.most_critical_clause,
            "contract risk aggregated"
        );
        state.record(
            Stage::Summarize,
            format!("overall risk score {}/100", contract.overall_risk_score),
        );
        state.contract_risk = Some(contract);
        state.executive_summary = Some(summary);
        Ok(())
    }
}

/// Apply a layer result: soft anchor misses are logged and skipped, other
/// annotation errors are fatal. Returns whether the layer was applied.
fn apply_layer(stage: Stage, result: Result<(), AnnotationError>) -> Result<bool, StageError> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_soft() => {
            warn!(stage = %stage, error = %e, "annotation anchor missing, layer skipped");
            Ok(false)
        }
        Err(source) => Err(StageError::Annotation { stage, source }),
    }
}

async fn pause(config: &PipelineConfig) {
    if !config.call_delay.is_zero() {
        tokio::time::sleep(config.call_delay).await;
    }
}
