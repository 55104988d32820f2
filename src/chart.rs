//! Chart config synthesizer
//!
//! Third model call: infer a visualization description from the result rows
//! and the original question. The model may omit per-series colors; this
//! module back-fills them deterministically. Two distinct color policies
//! live here on purpose:
//! - config-time back-fill is unbounded and index-keyed (`chart-{i+1}`,
//!   never cycled), and
//! - the render-time fallback palette is a fixed 8 entries cycled by
//!   `index % 8`, exported for the presentation layer.

use crate::error::{InsightError, Result};
use crate::executor::ExecutionResult;
use crate::llm::InsightModel;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// How many rows are serialized into the chart prompt.
const PREVIEW_ROWS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Area,
    Pie,
}

/// Declarative description of how to visualize a result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,

    #[serde(rename = "xKey")]
    pub x_key: String,

    #[serde(rename = "yKeys")]
    pub y_keys: Vec<String>,

    /// Per-series color tokens. Partial or absent in model output;
    /// complete after `fill_missing_colors`.
    #[serde(default)]
    pub colors: HashMap<String, String>,

    #[serde(default)]
    pub legend: bool,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub takeaway: Option<String>,

    #[serde(default, rename = "multipleLines")]
    pub multiple_lines: Option<bool>,

    #[serde(default, rename = "measurementColumn")]
    pub measurement_column: Option<String>,
}

/// Render-time fallback palette, owned by the presentation layer's drawing
/// code. Cycled, unlike the config-time back-fill.
pub const RENDER_FALLBACK_PALETTE: [&str; 8] = [
    "chart-1", "chart-2", "chart-3", "chart-4", "chart-5", "chart-6", "chart-7", "chart-8",
];

/// Cycled fallback color for a series index, for renderers that receive a
/// config with colors stripped.
pub fn render_fallback_color(index: usize) -> &'static str {
    RENDER_FALLBACK_PALETTE[index % RENDER_FALLBACK_PALETTE.len()]
}

/// Assign a deterministic index-keyed token to every yKey the model left
/// uncolored. Not cycled: series 9 gets `chart-10`.
pub fn fill_missing_colors(config: &mut ChartConfig) {
    for (index, y_key) in config.y_keys.iter().enumerate() {
        config
            .colors
            .entry(y_key.clone())
            .or_insert_with(|| format!("chart-{}", index + 1));
    }
}

pub struct ChartConfigSynthesizer {
    model: Arc<dyn InsightModel>,
}

impl ChartConfigSynthesizer {
    pub fn new(model: Arc<dyn InsightModel>) -> Self {
        Self { model }
    }

    pub async fn configure(&self, result: &ExecutionResult, question: &str) -> Result<ChartConfig> {
        let preview = rows_preview(result);
        let mut config = self
            .model
            .chart_config(question, &result.columns, &preview)
            .await?;

        if config.y_keys.is_empty() {
            return Err(InsightError::ChartConfig(
                "model returned no yKeys".to_string(),
            ));
        }

        fill_missing_colors(&mut config);
        info!(
            chart_type = ?config.chart_type,
            series = config.y_keys.len(),
            "Chart config synthesized"
        );
        Ok(config)
    }
}

fn rows_preview(result: &ExecutionResult) -> String {
    let rendered = result
        .rows
        .iter()
        .take(PREVIEW_ROWS)
        .map(|row| serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string()))
        .join(",\n");
    format!("[{}]", rendered)
}
