//! Generative model gateway
//!
//! One trait method per generative call (synthesize, explain, configure) so
//! the guard and executor stay fully decoupled from model specifics and
//! tests can substitute the whole model. `LlmClient` is the production
//! implementation speaking the OpenAI chat-completions protocol.

use crate::chart::ChartConfig;
use crate::error::{InsightError, Result};
use crate::explain::ExplanationSegment;
use crate::prompts;
use crate::templates::EntityTemplate;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// The three request/response boundaries of the pipeline's model usage.
#[async_trait]
pub trait InsightModel: Send + Sync {
    /// Produce a single SQL statement for the question against the template.
    async fn generate_sql(&self, template: &EntityTemplate, question: &str) -> Result<String>;

    /// Partition an executed statement into explained sections.
    async fn explain_query(&self, question: &str, sql: &str) -> Result<Vec<ExplanationSegment>>;

    /// Infer a chart description from the result preview.
    async fn chart_config(
        &self,
        question: &str,
        columns: &[String],
        rows_preview: &str,
    ) -> Result<ChartConfig>;
}

pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String, model: String, timeout: Duration) -> Self {
        Self {
            api_key,
            base_url,
            model,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Single-shot chat completion. Errors are returned as plain text so
    /// each caller can wrap them in its own stage variant.
    async fn complete(&self, system: &str, user: &str) -> std::result::Result<String, String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": 0.1
        });

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| format!("model call timed out after {:?}", self.timeout))?
            .map_err(|e| format!("model call failed: {}", e))?;

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("failed to read model response: {}", e))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| "no content in model response".to_string())?;

        debug!(chars = content.len(), "Model call completed");
        Ok(content.to_string())
    }
}

#[async_trait]
impl InsightModel for LlmClient {
    async fn generate_sql(&self, template: &EntityTemplate, question: &str) -> Result<String> {
        let prompt = prompts::build_sql_prompt(template, question);
        let raw = self
            .complete(prompts::SQL_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(InsightError::Generation)?;
        Ok(strip_code_fences(&raw).to_string())
    }

    async fn explain_query(&self, question: &str, sql: &str) -> Result<Vec<ExplanationSegment>> {
        let prompt = prompts::build_explain_prompt(question, sql);
        let raw = self
            .complete(prompts::EXPLAIN_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(InsightError::Explanation)?;
        let cleaned = strip_code_fences(&raw);

        serde_json::from_str(cleaned).map_err(|e| {
            InsightError::Explanation(format!("failed to parse explanation segments: {}", e))
        })
    }

    async fn chart_config(
        &self,
        question: &str,
        columns: &[String],
        rows_preview: &str,
    ) -> Result<ChartConfig> {
        let prompt = prompts::build_chart_prompt(question, columns, rows_preview);
        let raw = self
            .complete(prompts::CHART_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(InsightError::ChartConfig)?;
        let cleaned = strip_code_fences(&raw);

        serde_json::from_str(cleaned).map_err(|e| {
            InsightError::ChartConfig(format!("failed to parse chart config: {}", e))
        })
    }
}

/// Remove a single surrounding markdown code fence, if present.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("```sql")
        .or_else(|| trimmed.strip_prefix("```json"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
