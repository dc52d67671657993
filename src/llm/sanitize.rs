//! Cleanup of raw model output into a bare SQL statement.
//!
//! Backends wrap their answers inconsistently: fenced code blocks with or
//! without a language tag, chatty lead-ins such as `SQL Query:`, stray
//! whitespace. Every provider runs its output through [`sanitize_sql`] so the
//! executor only ever sees the statement itself.

use regex::Regex;
use std::sync::LazyLock;

/// Fenced block tagged as SQL; an unterminated fence runs to the end of input.
static SQL_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```sql\b(.*?)(?:```|\z)").expect("valid SQL fence regex"));

/// Any fenced block, minus a language tag on the opening line.
static ANY_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:[\w+-]*\n)?(.*?)(?:```|\z)").expect("valid fence regex")
});

/// Lead-in labels, most specific first. At most one is removed.
const LABEL_PREFIXES: &[&str] = &[
    "Here is the SQL query:",
    "The SQL query is:",
    "SQL Query:",
    "Query:",
    "SQL:",
    "Answer:",
    "A:",
];

/// Reduces raw model output to a trimmed SQL statement.
///
/// Never fails: text without fences or labels is only trimmed. An empty
/// return value is the caller's signal that generation produced nothing.
pub fn sanitize_sql(raw: &str) -> String {
    let body = extract_fenced(raw).unwrap_or(raw).trim();

    let body = LABEL_PREFIXES
        .iter()
        .find_map(|prefix| body.strip_prefix(prefix))
        .unwrap_or(body);

    body.trim().to_string()
}

fn extract_fenced(raw: &str) -> Option<&str> {
    SQL_FENCE
        .captures(raw)
        .or_else(|| ANY_FENCE.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
