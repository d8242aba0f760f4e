//! SQL text helpers shared by every translator.
//!
//! Identifiers and string values that end up inside generated SQL are quoted
//! here and nowhere else. Expressions supplied by callers (RLS `USING` and
//! `WITH CHECK` clauses, column defaults, column types) are inserted verbatim:
//! the gateway treats them as trusted input and does not parse SQL.

/// Keywords whose presence anywhere in a query disqualifies it from the
/// read-only endpoint.
pub const WRITE_KEYWORDS: [&str; 6] = ["delete", "insert", "update", "drop", "alter", "create"];

/// Schema used when a request does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Wrap an identifier in double quotes, doubling any embedded quote.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `"schema"."table"`
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Wrap a value in single quotes, doubling any embedded quote.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Pick the requested schema, falling back to `public` when blank.
pub fn schema_or_default(schema: &str) -> &str {
    if schema.trim().is_empty() {
        DEFAULT_SCHEMA
    } else {
        schema
    }
}

/// Substring-based read-only classifier for `execute_query`.
///
/// Returns true only if the trimmed, lowercased query starts with `select` and
/// none of [`WRITE_KEYWORDS`] occurs anywhere in it. The check is purely
/// textual: a `SELECT` mentioning `updated_at` is rejected, while statements
/// such as `TRUNCATE` hidden behind a leading `select` are accepted.
pub fn is_read_only(query: &str) -> bool {
    let lowered = query.trim().to_lowercase();
    lowered.starts_with("select") && !WRITE_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}
