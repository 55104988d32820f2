use async_trait::async_trait;
use catalog_insights::chart::{ChartConfig, ChartType};
use catalog_insights::error::{ExecutionErrorKind, InsightError, Result};
use catalog_insights::executor::{ExecutionResult, QueryStore};
use catalog_insights::explain::ExplanationSegment;
use catalog_insights::llm::InsightModel;
use catalog_insights::pipeline::{InsightPipeline, InsightRequest};
use catalog_insights::templates::{EntityKey, EntityTemplate};
use catalog_insights::tenant::TenantContext;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const RELEASES_SQL: &str = "SELECT \"releaseType\", COUNT(*) AS \"total\" FROM \"Releases\" WHERE \"userId\" = 5 GROUP BY \"releaseType\"";

/// Canned model: fixed SQL, covering explanation, configurable chart failure.
struct MockModel {
    sql: String,
    chart_fails: bool,
}

impl MockModel {
    fn returning(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            chart_fails: false,
        }
    }

    fn with_failing_chart(mut self) -> Self {
        self.chart_fails = true;
        self
    }
}

#[async_trait]
impl InsightModel for MockModel {
    async fn generate_sql(&self, _template: &EntityTemplate, _question: &str) -> Result<String> {
        Ok(self.sql.clone())
    }

    async fn explain_query(&self, _question: &str, sql: &str) -> Result<Vec<ExplanationSegment>> {
        // Naive clause split, good enough to satisfy the coverage check.
        let segments = sql
            .split_inclusive(' ')
            .collect::<Vec<_>>()
            .chunks(3)
            .map(|chunk| ExplanationSegment {
                text: chunk.concat().trim().to_string(),
                explanation: String::new(),
            })
            .collect();
        Ok(segments)
    }

    async fn chart_config(
        &self,
        _question: &str,
        columns: &[String],
        _rows_preview: &str,
    ) -> Result<ChartConfig> {
        if self.chart_fails {
            return Err(InsightError::ChartConfig("model unavailable".to_string()));
        }
        Ok(ChartConfig {
            chart_type: ChartType::Bar,
            x_key: columns[0].clone(),
            y_keys: vec![columns[1].clone()],
            colors: HashMap::new(),
            legend: false,
            title: Some("Releases by type".to_string()),
            description: None,
            takeaway: None,
            multiple_lines: None,
            measurement_column: None,
        })
    }
}

/// Canned store: two-column result, counts how often it ran.
struct MockStore {
    calls: AtomicUsize,
    fail_with: Option<ExecutionErrorKind>,
}

impl MockStore {
    fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_with: None,
        }
    }

    fn failing(kind: ExecutionErrorKind) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_with: Some(kind),
        }
    }
}

#[async_trait]
impl QueryStore for MockStore {
    async fn run_select(&self, _sql: &str) -> Result<ExecutionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(kind) = &self.fail_with {
            return Err(InsightError::Execution {
                kind: kind.clone(),
                detail: "relation \"unicorns\" does not exist".to_string(),
            });
        }

        let mut row_single = HashMap::new();
        row_single.insert(
            "releaseType".to_string(),
            serde_json::Value::String("single".to_string()),
        );
        row_single.insert("total".to_string(), serde_json::Value::Number(12.into()));

        let mut row_album = HashMap::new();
        row_album.insert(
            "releaseType".to_string(),
            serde_json::Value::String("album".to_string()),
        );
        row_album.insert("total".to_string(), serde_json::Value::Number(3.into()));

        Ok(ExecutionResult {
            rows: vec![row_single, row_album],
            columns: vec!["releaseType".to_string(), "total".to_string()],
            row_count: 2,
        })
    }
}

fn request(question: &str, entity: &str, with_chart: bool) -> InsightRequest {
    InsightRequest {
        question: question.to_string(),
        entity: entity.to_string(),
        tenant: TenantContext::new(5),
        with_chart,
    }
}

#[tokio::test]
async fn test_happy_path_releases_by_type() {
    let model = Arc::new(MockModel::returning(RELEASES_SQL));
    let store = Arc::new(MockStore::ok());
    let store_dyn: Arc<dyn QueryStore> = store.clone();
    let pipeline = InsightPipeline::new(model, store_dyn);

    let response = pipeline
        .ask(request("lanzamientos por tipo", "Releases", false))
        .await
        .expect("pipeline should succeed");

    assert!(response.outcome.accepted);
    assert_eq!(response.query.entity, EntityKey::Releases);
    assert_eq!(response.query.text, RELEASES_SQL);
    assert!(response.result.columns.len() >= 2);
    assert_eq!(response.result.row_count, 2);
    assert!(response.chart.is_none());
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejected_statement_never_reaches_the_store() {
    let model = Arc::new(MockModel::returning(
        "SELECT * FROM \"Releases\"; DROP TABLE \"Releases\";",
    ));
    let store = Arc::new(MockStore::ok());
    let store_dyn: Arc<dyn QueryStore> = store.clone();
    let pipeline = InsightPipeline::new(model, store_dyn);

    let err = pipeline
        .ask(request("lanzamientos por tipo", "Releases", false))
        .await
        .expect_err("pipeline should reject");

    assert!(matches!(err, InsightError::Rejected(_)));
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_chart_failure_is_non_fatal() {
    let model = Arc::new(MockModel::returning(RELEASES_SQL).with_failing_chart());
    let store = Arc::new(MockStore::ok());
    let pipeline = InsightPipeline::new(model, store);

    let response = pipeline
        .ask(request("lanzamientos por tipo", "Releases", true))
        .await
        .expect("rows must survive a chart failure");

    assert!(response.chart.is_none());
    assert_eq!(response.result.row_count, 2);
}

#[tokio::test]
async fn test_chart_branch_backfills_colors() {
    let model = Arc::new(MockModel::returning(RELEASES_SQL));
    let store = Arc::new(MockStore::ok());
    let pipeline = InsightPipeline::new(model, store);

    let response = pipeline
        .ask(request("lanzamientos por tipo", "Releases", true))
        .await
        .unwrap();

    let chart = response.chart.expect("chart requested and model succeeded");
    assert_eq!(chart.chart_type, ChartType::Bar);
    assert_eq!(chart.colors["total"], "chart-1");
}

#[tokio::test]
async fn test_missing_relation_is_fatal_and_typed() {
    let model = Arc::new(MockModel::returning(
        "SELECT \"a\", \"b\" FROM \"unicorns\"",
    ));
    let store = Arc::new(MockStore::failing(ExecutionErrorKind::TableMissing));
    let pipeline = InsightPipeline::new(model, store);

    let err = pipeline
        .ask(request("anything", "Releases", false))
        .await
        .expect_err("execution failure must propagate");

    match err {
        InsightError::Execution { kind, .. } => assert_eq!(kind, ExecutionErrorKind::TableMissing),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_unknown_entity_falls_back_to_default() {
    let model = Arc::new(MockModel::returning(RELEASES_SQL));
    let store = Arc::new(MockStore::ok());
    let pipeline = InsightPipeline::new(model, store);

    let response = pipeline
        .ask(request("cuantos contratos", "Unicorns", false))
        .await
        .unwrap();

    assert_eq!(response.query.entity, EntityKey::Contracts);
}

#[tokio::test]
async fn test_explain_branch_reconstructs_statement() {
    let model = Arc::new(MockModel::returning(RELEASES_SQL));
    let store = Arc::new(MockStore::ok());
    let pipeline = InsightPipeline::new(model, store);

    let segments = pipeline
        .explain("lanzamientos por tipo", "SELECT * FROM unicorns limit 20")
        .await
        .expect("mock segmentation covers the statement");

    let joined = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    assert_eq!(normalize(&joined), normalize("SELECT * FROM unicorns limit 20"));
}
