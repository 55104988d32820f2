//! Prompt bodies for the three generative calls
//!
//! One builder per model call: SQL synthesis, statement explanation and
//! chart configuration. All prompts demand machine-parsable output (bare
//! SQL or JSON, no markdown).

use crate::templates::EntityTemplate;

/// System directive for the SQL synthesis call.
pub const SQL_SYSTEM_PROMPT: &str = r#"You are a SQL analyst for a music distribution platform, writing PostgreSQL.
Rules for every statement you produce:
1. Exactly one read-only SELECT statement. Never any other statement kind.
2. Column and table names are case sensitive and MUST be double-quoted, e.g. "artistName".
3. Never select administrative columns ("id", "createdAt") or tenant columns ("userId", "teamId", "folderId").
4. The result must contain at least two columns so it can be charted.
5. String predicates use case-insensitive matching (ILIKE with wildcards).
6. Always include the tenant filter you are given.
Return ONLY the SQL statement, no explanation, no markdown."#;

/// Task prompt for the SQL synthesis call.
pub fn build_sql_prompt(template: &EntityTemplate, question: &str) -> String {
    format!(
        r#"SCHEMA:
{}

TENANT SCOPING:
{}

USER QUESTION: "{}"

SQL:"#,
        template.schema_description, template.tenant_filter_instructions, question
    )
}

/// System directive for the explanation call.
pub const EXPLAIN_SYSTEM_PROMPT: &str = r#"You are a SQL teacher. You break a SQL statement into ordered sections and explain each one in plain language.
Return ONLY a valid JSON array, no markdown, no other text."#;

/// Task prompt for the explanation call.
pub fn build_explain_prompt(question: &str, sql: &str) -> String {
    format!(
        r#"The user asked: "{}"

The executed SQL statement was:
{}

Partition the statement into unique, non-overlapping, ordered sections at clause granularity (for example: SELECT *, FROM table, LIMIT 10). Together the sections must reconstruct the whole statement in order. Attach a short plain-language explanation to each section; if a section needs no explanation, use an empty string, never drop the section.

Return a JSON array in this exact shape:
[
  {{"text": "SELECT *", "explanation": "Selects every column."}},
  {{"text": "FROM unicorns", "explanation": ""}}
]"#,
        question, sql
    )
}

/// System directive for the chart configuration call.
pub const CHART_SYSTEM_PROMPT: &str = r#"You are a data visualization assistant. Given query results and the user's question, you describe the best chart for the data.
Return ONLY a valid JSON object, no markdown, no other text."#;

/// Task prompt for the chart configuration call.
pub fn build_chart_prompt(question: &str, columns: &[String], rows_preview: &str) -> String {
    format!(
        r#"The user asked: "{}"

The query returned columns: {}

Sample rows (JSON, truncated):
{}

Describe how to visualize this result. Pick "type" from "bar", "line", "area" or "pie". "xKey" is the column for the x axis, "yKeys" the measured columns (at least one). "colors" maps a yKey to a color token and may be omitted or partial. Set "legend" true when more than one series is shown. "takeaway" is one sentence about what the data shows.

Return a JSON object in this exact shape:
{{
  "type": "bar",
  "xKey": "releaseType",
  "yKeys": ["count"],
  "colors": {{"count": "chart-1"}},
  "legend": false,
  "title": "Releases by type",
  "description": "Number of releases per release type",
  "takeaway": "Singles dominate the catalog."
}}"#,
        question,
        columns.join(", "),
        rows_preview
    )
}
