//! Query guard - deterministic pre-execution validator
//!
//! Two layers. Layer 1 is the lexical gate: the statement must start with
//! SELECT and must not contain any write/DDL keyword anywhere, matched as a
//! plain substring after lowercasing. This is intentionally not a parser:
//! it rejects legitimate statements whose literals happen to contain a
//! blocked word (an artist named "Grant"), and it cannot catch every
//! obfuscated smuggling attempt on its own. Layer 2 closes the obvious gap
//! by parsing the statement and requiring exactly one plain SELECT query.
//! Layer 2 only narrows acceptance; everything layer 1 rejects stays
//! rejected.

use crate::tenant::TenantContext;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Keywords that disqualify a statement wherever they appear.
const FORBIDDEN: [&str; 9] = [
    "drop", "delete", "insert", "update", "alter", "truncate", "create", "grant", "revoke",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub accepted: bool,

    /// The rule that failed, when rejected. Never raw driver or model text.
    pub reason: Option<String>,
}

impl ValidationOutcome {
    fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// Deterministic, synchronous, side-effect-free statement validator.
pub struct QueryGuard;

impl QueryGuard {
    pub fn validate(text: &str) -> ValidationOutcome {
        let normalized = text.trim().to_lowercase();

        if !normalized.starts_with("select") {
            return ValidationOutcome::rejected("statement must start with SELECT");
        }

        for keyword in FORBIDDEN {
            if normalized.contains(keyword) {
                return ValidationOutcome::rejected(format!(
                    "statement contains forbidden keyword '{}'",
                    keyword
                ));
            }
        }

        // Parser layer: exactly one statement, and it must be a query.
        let statements = match Parser::parse_sql(&PostgreSqlDialect {}, text) {
            Ok(statements) => statements,
            Err(_) => {
                return ValidationOutcome::rejected("statement does not parse as SQL");
            }
        };

        match statements.as_slice() {
            [Statement::Query(_)] => ValidationOutcome::accepted(),
            [_] => ValidationOutcome::rejected("statement is not a SELECT query"),
            _ => ValidationOutcome::rejected("only a single statement is allowed"),
        }
    }

    /// Advisory check: does the accepted statement textually reference the
    /// tenant predicate it was instructed to include? Acceptance never
    /// depends on this; the pipeline logs a warning when it returns false.
    pub fn references_tenant_scope(text: &str, tenant: &TenantContext) -> bool {
        lazy_static! {
            static ref WS: Regex = Regex::new(r"\s+").expect("whitespace regex");
        }
        let compact = WS.replace_all(text, " ").to_string();

        let user_predicate = format!("\"userId\" = {}", tenant.user_id);
        if compact.contains(&user_predicate) {
            return true;
        }

        match tenant.team_id {
            Some(team_id) => compact.contains(&format!("\"teamId\" = {}", team_id)),
            None => false,
        }
    }
}
