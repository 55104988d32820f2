//! Query executor
//!
//! Runs an accepted statement against PostgreSQL and normalizes rows into
//! column-name → JSON scalar maps. The executor does not re-validate and
//! does not retry; a failed execution is terminal for the request.

use crate::error::{ExecutionErrorKind, InsightError, Result};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Normalized result of one executed statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub rows: Vec<HashMap<String, serde_json::Value>>,

    /// Column names in statement order, taken from the row metadata.
    pub columns: Vec<String>,

    pub row_count: usize,
}

/// Seam between the pipeline and the relational store.
#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Run a single read statement. Precondition: the guard accepted it.
    async fn run_select(&self, sql: &str) -> Result<ExecutionResult>;
}

/// Production store backed by a PostgreSQL pool.
pub struct PgQueryStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgQueryStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl QueryStore for PgQueryStore {
    async fn run_select(&self, sql: &str) -> Result<ExecutionResult> {
        let query = sqlx::query(sql).fetch_all(&self.pool);

        let pg_rows = tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| InsightError::Execution {
                kind: ExecutionErrorKind::Other,
                detail: format!("query timed out after {:?}", self.timeout),
            })?
            .map_err(|e| classify_db_error(&e))?;

        let columns: Vec<String> = pg_rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rows: Vec<HashMap<String, serde_json::Value>> =
            pg_rows.iter().map(row_to_map).collect();

        let row_count = rows.len();
        info!(row_count, "Statement executed");

        Ok(ExecutionResult {
            rows,
            columns,
            row_count,
        })
    }
}

/// Map a driver error to the execution taxonomy. Missing relation is the
/// only specially-typed failure.
fn classify_db_error(error: &sqlx::Error) -> InsightError {
    if let sqlx::Error::Database(db_error) = error {
        let code = db_error.code();
        if is_missing_relation(code.as_deref(), db_error.message()) {
            return InsightError::Execution {
                kind: ExecutionErrorKind::TableMissing,
                detail: db_error.message().to_string(),
            };
        }
    }

    InsightError::Execution {
        kind: ExecutionErrorKind::Other,
        detail: error.to_string(),
    }
}

/// SQLSTATE 42P01 is undefined_table; the message check covers drivers that
/// do not surface the code.
fn is_missing_relation(code: Option<&str>, message: &str) -> bool {
    if code == Some("42P01") {
        return true;
    }
    let msg = message.to_lowercase();
    msg.contains("relation") && msg.contains("does not exist")
}

fn row_to_map(row: &PgRow) -> HashMap<String, serde_json::Value> {
    let mut map = HashMap::new();
    for (idx, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), pg_value_to_json(row, idx));
    }
    map
}

/// Decode one cell into a JSON scalar by declared type, falling back to a
/// string rendering for anything unrecognized.
fn pg_value_to_json(row: &PgRow, idx: usize) -> serde_json::Value {
    let type_name = row.columns()[idx].type_info().name().to_string();

    match type_name.as_str() {
        "INT2" => opt_to_json(row.try_get::<Option<i16>, _>(idx).ok().flatten(), |v| {
            serde_json::Value::Number(v.into())
        }),
        "INT4" => opt_to_json(row.try_get::<Option<i32>, _>(idx).ok().flatten(), |v| {
            serde_json::Value::Number(v.into())
        }),
        "INT8" => opt_to_json(row.try_get::<Option<i64>, _>(idx).ok().flatten(), |v| {
            serde_json::Value::Number(v.into())
        }),
        "FLOAT4" => float_to_json(
            row.try_get::<Option<f32>, _>(idx)
                .ok()
                .flatten()
                .map(f64::from),
        ),
        "FLOAT8" => float_to_json(row.try_get::<Option<f64>, _>(idx).ok().flatten()),
        "NUMERIC" => {
            let decimal = row
                .try_get::<Option<rust_decimal::Decimal>, _>(idx)
                .ok()
                .flatten();
            match decimal {
                Some(d) => d
                    .to_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or_else(|| serde_json::Value::String(d.to_string())),
                None => serde_json::Value::Null,
            }
        }
        "BOOL" => opt_to_json(row.try_get::<Option<bool>, _>(idx).ok().flatten(), |v| {
            serde_json::Value::Bool(v)
        }),
        "DATE" => opt_to_json(
            row.try_get::<Option<chrono::NaiveDate>, _>(idx).ok().flatten(),
            |v| serde_json::Value::String(v.to_string()),
        ),
        "TIMESTAMP" => opt_to_json(
            row.try_get::<Option<chrono::NaiveDateTime>, _>(idx)
                .ok()
                .flatten(),
            |v| serde_json::Value::String(v.to_string()),
        ),
        "TIMESTAMPTZ" => opt_to_json(
            row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
                .ok()
                .flatten(),
            |v| serde_json::Value::String(v.to_rfc3339()),
        ),
        "UUID" => opt_to_json(
            row.try_get::<Option<uuid::Uuid>, _>(idx).ok().flatten(),
            |v| serde_json::Value::String(v.to_string()),
        ),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(serde_json::Value::Null),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => opt_to_json(
            row.try_get::<Option<String>, _>(idx).ok().flatten(),
            serde_json::Value::String,
        ),
        other => {
            // Last resort: many types decode cleanly as text.
            match row.try_get::<Option<String>, _>(idx) {
                Ok(value) => opt_to_json(value, serde_json::Value::String),
                Err(_) => {
                    warn!(pg_type = other, "Undecodable column type, emitting null");
                    serde_json::Value::Null
                }
            }
        }
    }
}

fn opt_to_json<T>(value: Option<T>, convert: impl FnOnce(T) -> serde_json::Value) -> serde_json::Value {
    value.map(convert).unwrap_or(serde_json::Value::Null)
}

fn float_to_json(value: Option<f64>) -> serde_json::Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_relation_by_code() {
        assert!(is_missing_relation(Some("42P01"), "whatever"));
    }

    #[test]
    fn test_missing_relation_by_message() {
        assert!(is_missing_relation(
            None,
            "relation \"unicorns\" does not exist"
        ));
    }

    #[test]
    fn test_other_errors_not_missing_relation() {
        assert!(!is_missing_relation(Some("42703"), "column \"x\" does not exist"));
        assert!(!is_missing_relation(None, "syntax error at or near \"FROM\""));
    }

    #[test]
    fn test_float_to_json_rejects_nan() {
        assert_eq!(float_to_json(Some(f64::NAN)), serde_json::Value::Null);
        assert_eq!(
            float_to_json(Some(1.5)),
            serde_json::Value::Number(serde_json::Number::from_f64(1.5).unwrap())
        );
    }
}
