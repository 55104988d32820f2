//! Pipeline orchestrator
//!
//! Composes registry → synthesizer → guard → executor for one question.
//! Stages are strictly sequential and single-shot: a failed stage is
//! terminal and the caller must resubmit. Explanation and chart
//! configuration branch off a successful execution; their failures never
//! roll it back.

use crate::chart::{ChartConfig, ChartConfigSynthesizer};
use crate::error::{InsightError, Result};
use crate::executor::{ExecutionResult, QueryStore};
use crate::explain::{ExplanationSegment, ExplanationSynthesizer};
use crate::guard::{QueryGuard, ValidationOutcome};
use crate::history::QueryHistoryRepository;
use crate::llm::InsightModel;
use crate::synthesizer::{GeneratedQuery, QuerySynthesizer};
use crate::templates::{EntityKey, TemplateRegistry};
use crate::tenant::TenantContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One question, fully described.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightRequest {
    pub question: String,

    /// Raw entity key; unknown values fall back to the default entity.
    pub entity: String,

    pub tenant: TenantContext,

    /// Run the chart-config branch after execution.
    pub with_chart: bool,
}

/// Everything the presentation layer needs from a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightResponse {
    pub query: GeneratedQuery,
    pub outcome: ValidationOutcome,
    pub result: ExecutionResult,

    /// Absent when not requested or when chart synthesis failed; the rows
    /// above stay valid either way.
    pub chart: Option<ChartConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Synthesizing,
    Validating,
    Executing,
    Explaining,
    Configuring,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Synthesizing => "synthesizing",
            PipelineStage::Validating => "validating",
            PipelineStage::Executing => "executing",
            PipelineStage::Explaining => "explaining",
            PipelineStage::Configuring => "configuring",
        };
        write!(f, "{}", name)
    }
}

pub struct InsightPipeline {
    synthesizer: QuerySynthesizer,
    explainer: ExplanationSynthesizer,
    chart: ChartConfigSynthesizer,
    store: Arc<dyn QueryStore>,
    history: Option<QueryHistoryRepository>,
}

impl InsightPipeline {
    pub fn new(model: Arc<dyn InsightModel>, store: Arc<dyn QueryStore>) -> Self {
        Self {
            synthesizer: QuerySynthesizer::new(Arc::clone(&model)),
            explainer: ExplanationSynthesizer::new(Arc::clone(&model)),
            chart: ChartConfigSynthesizer::new(model),
            store,
            history: None,
        }
    }

    /// Record every run in the query history table.
    pub fn with_history(mut self, history: QueryHistoryRepository) -> Self {
        self.history = Some(history);
        self
    }

    /// Run one question end-to-end. Fatal stage failures propagate;
    /// a failed chart branch degrades to `chart: None`.
    pub async fn ask(&self, request: InsightRequest) -> Result<InsightResponse> {
        let entity = EntityKey::parse(&request.entity);
        let template = TemplateRegistry::lookup(entity, &request.tenant);

        info!(
            stage = %PipelineStage::Synthesizing,
            entity = entity.as_str(),
            user_id = request.tenant.user_id,
            team_id = ?request.tenant.team_id,
            "Pipeline started"
        );

        let query = self
            .synthesizer
            .synthesize(&request.question, &template, &request.tenant)
            .await
            .inspect_err(|e| {
                error!(stage = %PipelineStage::Synthesizing, entity = entity.as_str(), error = %e, "Stage failed");
            })?;

        self.record_run(&query, &request.question).await;

        let outcome = QueryGuard::validate(&query.text);
        if !outcome.accepted {
            let reason = outcome
                .reason
                .clone()
                .unwrap_or_else(|| "statement rejected".to_string());
            warn!(
                stage = %PipelineStage::Validating,
                entity = entity.as_str(),
                query_id = %query.id,
                reason = %reason,
                "Statement rejected"
            );
            self.mark_status(&query, "rejected", Some("rejected")).await;
            return Err(InsightError::Rejected(reason));
        }

        if !QueryGuard::references_tenant_scope(&query.text, &request.tenant) {
            warn!(
                query_id = %query.id,
                user_id = request.tenant.user_id,
                "Accepted statement does not reference the instructed tenant predicate"
            );
        }

        info!(stage = %PipelineStage::Executing, query_id = %query.id, "Executing statement");
        let result = match self.store.run_select(&query.text).await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    stage = %PipelineStage::Executing,
                    entity = entity.as_str(),
                    query_id = %query.id,
                    error = %e,
                    "Stage failed"
                );
                self.mark_status(&query, "failed", Some(e.class_name())).await;
                return Err(e);
            }
        };

        self.mark_status(&query, "succeeded", None).await;

        let chart = if request.with_chart {
            self.configure_chart(&result, &request.question).await
        } else {
            None
        };

        Ok(InsightResponse {
            query,
            outcome,
            result,
            chart,
        })
    }

    /// Lazy explanation branch for a statement that already executed.
    pub async fn explain(&self, question: &str, sql: &str) -> Result<Vec<ExplanationSegment>> {
        info!(stage = %PipelineStage::Explaining, "Explaining statement");
        self.explainer.explain(question, sql).await.inspect_err(|e| {
            warn!(stage = %PipelineStage::Explaining, error = %e, "Explanation failed");
        })
    }

    /// Chart branch; never fatal.
    async fn configure_chart(&self, result: &ExecutionResult, question: &str) -> Option<ChartConfig> {
        info!(stage = %PipelineStage::Configuring, "Synthesizing chart config");
        match self.chart.configure(result, question).await {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(stage = %PipelineStage::Configuring, error = %e, "Chart config failed, returning rows only");
                None
            }
        }
    }

    async fn record_run(&self, query: &GeneratedQuery, question: &str) {
        if let Some(history) = &self.history {
            if let Err(e) = history
                .record_run(query.id, query.entity.as_str(), question, &query.text)
                .await
            {
                warn!(query_id = %query.id, error = %e, "Failed to record query history");
            }
        }
    }

    async fn mark_status(&self, query: &GeneratedQuery, status: &str, error_class: Option<&str>) {
        if let Some(history) = &self.history {
            if let Err(e) = history.mark_status(query.id, status, error_class).await {
                warn!(query_id = %query.id, error = %e, "Failed to update query history");
            }
        }
    }
}

/// The single user-facing message for a fatal failure. Raw model and
/// driver text stays in the logs.
pub fn user_facing_message(error: &InsightError) -> &'static str {
    match error {
        InsightError::Rejected(_) => "This question produced an unsupported query. Please rephrase it.",
        _ => "Something went wrong answering this question. Please try again.",
    }
}
