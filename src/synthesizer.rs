//! Query synthesizer
//!
//! First model call: template plus question in, a single SQL statement out.
//! The statement is a candidate only; the guard decides whether it runs.

use crate::error::{InsightError, Result};
use crate::llm::InsightModel;
use crate::templates::{EntityKey, EntityTemplate};
use crate::tenant::TenantContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// A generated statement with the request context it was produced for.
/// Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub id: Uuid,
    pub text: String,
    pub entity: EntityKey,
    pub tenant: TenantContext,
    pub created_at: DateTime<Utc>,
}

pub struct QuerySynthesizer {
    model: Arc<dyn InsightModel>,
}

impl QuerySynthesizer {
    pub fn new(model: Arc<dyn InsightModel>) -> Self {
        Self { model }
    }

    pub async fn synthesize(
        &self,
        question: &str,
        template: &EntityTemplate,
        tenant: &TenantContext,
    ) -> Result<GeneratedQuery> {
        let text = self.model.generate_sql(template, question).await?;

        if text.trim().is_empty() {
            return Err(InsightError::Generation(
                "model returned an empty statement".to_string(),
            ));
        }

        let query = GeneratedQuery {
            id: Uuid::new_v4(),
            text: text.trim().to_string(),
            entity: template.key,
            tenant: tenant.clone(),
            created_at: Utc::now(),
        };

        info!(query_id = %query.id, entity = query.entity.as_str(), "Statement synthesized");
        Ok(query)
    }
}
