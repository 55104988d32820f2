//! Explanation synthesizer
//!
//! Second model call, invoked lazily when a human asks what an executed
//! statement does. The model partitions the statement into ordered,
//! non-overlapping clause-level sections; this module verifies the
//! partition actually covers the statement before handing it out.

use crate::error::{InsightError, Result};
use crate::llm::InsightModel;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// One clause-level slice of a statement with its plain-language note.
/// Unremarkable slices keep an empty explanation rather than being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationSegment {
    pub text: String,

    #[serde(default)]
    pub explanation: String,
}

pub struct ExplanationSynthesizer {
    model: Arc<dyn InsightModel>,
}

impl ExplanationSynthesizer {
    pub fn new(model: Arc<dyn InsightModel>) -> Self {
        Self { model }
    }

    pub async fn explain(&self, question: &str, sql: &str) -> Result<Vec<ExplanationSegment>> {
        let segments = self.model.explain_query(question, sql).await?;

        if segments.is_empty() {
            return Err(InsightError::Explanation(
                "model returned no segments".to_string(),
            ));
        }

        if !segments_cover_statement(&segments, sql) {
            return Err(InsightError::Explanation(
                "segments do not reconstruct the statement".to_string(),
            ));
        }

        info!(segments = segments.len(), "Statement explained");
        Ok(segments)
    }
}

/// The ordered concatenation of segment texts must equal the statement,
/// modulo case and whitespace.
pub fn segments_cover_statement(segments: &[ExplanationSegment], sql: &str) -> bool {
    let joined = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    normalize(&joined) == normalize(sql)
}

fn normalize(text: &str) -> String {
    lazy_static! {
        static ref WS: Regex = Regex::new(r"\s+").expect("whitespace regex");
    }
    WS.replace_all(text.trim(), " ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, explanation: &str) -> ExplanationSegment {
        ExplanationSegment {
            text: text.to_string(),
            explanation: explanation.to_string(),
        }
    }

    #[test]
    fn test_segments_reconstruct_statement() {
        let segments = vec![
            seg("SELECT *", "Selects every column."),
            seg("FROM unicorns", ""),
            seg("LIMIT 20", "Caps the result at 20 rows."),
        ];
        assert!(segments_cover_statement(
            &segments,
            "SELECT * FROM unicorns limit 20"
        ));
    }

    #[test]
    fn test_missing_clause_fails_coverage() {
        let segments = vec![seg("SELECT *", ""), seg("FROM unicorns", "")];
        assert!(!segments_cover_statement(
            &segments,
            "SELECT * FROM unicorns limit 20"
        ));
    }

    #[test]
    fn test_reordered_segments_fail_coverage() {
        let segments = vec![seg("FROM unicorns", ""), seg("SELECT *", "")];
        assert!(!segments_cover_statement(&segments, "SELECT * FROM unicorns"));
    }

    #[test]
    fn test_empty_explanations_are_preserved() {
        let raw = r#"[{"text": "SELECT *"}, {"text": "FROM unicorns", "explanation": ""}]"#;
        let segments: Vec<ExplanationSegment> = serde_json::from_str(raw).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].explanation, "");
    }
}
