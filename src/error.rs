use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failed statement execution.
///
/// A missing relation is the one failure the caller can act on (the model
/// invented a table), so it gets its own kind; everything else is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionErrorKind {
    TableMissing,
    Other,
}

impl fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionErrorKind::TableMissing => write!(f, "TableMissing"),
            ExecutionErrorKind::Other => write!(f, "Other"),
        }
    }
}

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Query rejected: {0}")]
    Rejected(String),

    #[error("Execution error ({kind}): {detail}")]
    Execution {
        kind: ExecutionErrorKind,
        detail: String,
    },

    #[error("Explanation error: {0}")]
    Explanation(String),

    #[error("Chart config error: {0}")]
    ChartConfig(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl InsightError {
    /// True for failures that terminate the whole request. Explanation and
    /// chart failures leave the executed rows usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            InsightError::Explanation(_) | InsightError::ChartConfig(_)
        )
    }

    /// Short class name for history records and operator logs.
    pub fn class_name(&self) -> &'static str {
        match self {
            InsightError::Generation(_) => "generation",
            InsightError::Rejected(_) => "rejected",
            InsightError::Execution {
                kind: ExecutionErrorKind::TableMissing,
                ..
            } => "table_missing",
            InsightError::Execution { .. } => "execution",
            InsightError::Explanation(_) => "explanation",
            InsightError::ChartConfig(_) => "chart_config",
            InsightError::Config(_) => "config",
            InsightError::Database(_) => "database",
        }
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explanation_and_chart_failures_are_non_fatal() {
        assert!(!InsightError::Explanation("x".to_string()).is_fatal());
        assert!(!InsightError::ChartConfig("x".to_string()).is_fatal());
        assert!(InsightError::Generation("x".to_string()).is_fatal());
        assert!(InsightError::Rejected("x".to_string()).is_fatal());
        assert!(InsightError::Execution {
            kind: ExecutionErrorKind::TableMissing,
            detail: "x".to_string()
        }
        .is_fatal());
    }

    #[test]
    fn test_class_names() {
        let err = InsightError::Execution {
            kind: ExecutionErrorKind::TableMissing,
            detail: "relation missing".to_string(),
        };
        assert_eq!(err.class_name(), "table_missing");
        assert_eq!(InsightError::Rejected("no".to_string()).class_name(), "rejected");
    }
}
