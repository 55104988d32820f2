//! PostgreSQL connection pool

use crate::error::{InsightError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

pub async fn connect(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|e| InsightError::Database(format!("failed to connect: {}", e)))
}
