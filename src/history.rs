//! Query history repository
//!
//! Records one row per pipeline run for operator diagnosis. Tenant
//! identifiers are deliberately not persisted; they live only in logs.

use sqlx::PgPool;
use uuid::Uuid;

pub struct QueryHistoryRepository {
    pool: PgPool,
}

impl QueryHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record_run(
        &self,
        query_id: Uuid,
        entity: &str,
        question: &str,
        sql: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO query_history (id, entity, question, sql_text, status)
            VALUES ($1, $2, $3, $4, 'pending')
            "#,
        )
        .bind(query_id)
        .bind(entity)
        .bind(question)
        .bind(sql)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_status(
        &self,
        query_id: Uuid,
        status: &str,
        error_class: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE query_history
            SET status = $1, error_class = $2, completed_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(status)
        .bind(error_class)
        .bind(query_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
