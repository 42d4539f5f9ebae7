//! Statement-shape classification and SQL synthesis.
//!
//! A statement spec is a single string that is either a complete SQL statement
//! or the bare name of a database routine. The classification rule is
//! deliberate and load-bearing: any of the keywords `SELECT`, `INSERT`,
//! `UPDATE`, `DELETE`, `WITH` (case-insensitive, word-bounded) or a `(`
//! anywhere marks the string as literal SQL; everything else is treated as a
//! routine name and synthesized into `SELECT * FROM name($1, ..., $n)`.

use crate::error::{GatewayError, GatewayResult};
use regex::Regex;
use std::sync::LazyLock;

static SQL_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|WITH)\b").expect("keyword pattern is valid")
});

/// How a statement spec was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Complete SQL, used verbatim with the caller's positional placeholders.
    LiteralSql,
    /// Routine name, synthesized into a call expression.
    Routine,
}

/// A classified statement ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
}

/// Classify a trimmed statement spec.
pub fn classify(spec: &str) -> StatementKind {
    if SQL_KEYWORDS.is_match(spec) || spec.contains('(') {
        StatementKind::LiteralSql
    } else {
        StatementKind::Routine
    }
}

/// Build the concrete statement for a spec and a parameter count.
///
/// An empty or whitespace-only spec is a usage error, detected before any
/// pool interaction.
pub fn build_statement(spec: &str, param_count: usize) -> GatewayResult<Statement> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::usage("Statement spec must not be empty"));
    }

    match classify(trimmed) {
        StatementKind::LiteralSql => Ok(Statement {
            kind: StatementKind::LiteralSql,
            sql: trimmed.to_string(),
        }),
        StatementKind::Routine => Ok(Statement {
            kind: StatementKind::Routine,
            sql: synthesize_call(trimmed, param_count),
        }),
    }
}

/// Synthesize `SELECT * FROM name($1, ..., $n)` with one positional
/// placeholder per parameter, empty parens for zero parameters.
fn synthesize_call(name: &str, param_count: usize) -> String {
    if param_count == 0 {
        return format!("SELECT * FROM {}()", name);
    }
    let placeholders: Vec<String> = (1..=param_count).map(|n| format!("${}", n)).collect();
    format!("SELECT * FROM {}({})", name, placeholders.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_identifier_is_routine() {
        assert_eq!(classify("get_user_by_id"), StatementKind::Routine);
        assert_eq!(classify("catalogomomentotomamuestra"), StatementKind::Routine);
    }

    #[test]
    fn test_keywords_classify_as_literal_sql() {
        assert_eq!(
            classify("SELECT * FROM users"),
            StatementKind::LiteralSql
        );
        assert_eq!(
            classify("insert into t values ($1)"),
            StatementKind::LiteralSql
        );
        assert_eq!(classify("Update t SET x = $1"), StatementKind::LiteralSql);
        assert_eq!(classify("delete from t"), StatementKind::LiteralSql);
        assert_eq!(
            classify("WITH cte AS (SELECT 1) SELECT * FROM cte"),
            StatementKind::LiteralSql
        );
    }

    #[test]
    fn test_keyword_must_be_word_bounded() {
        // "selection_fn" contains "select" but not as a word
        assert_eq!(classify("selection_fn"), StatementKind::Routine);
        assert_eq!(classify("updated_records_fn"), StatementKind::Routine);
    }

    #[test]
    fn test_parenthesis_classifies_as_literal_sql() {
        assert_eq!(classify("my_fn($1, $2)"), StatementKind::LiteralSql);
    }

    #[test]
    fn test_synthesizes_call_with_placeholders() {
        let stmt = build_statement("get_user_by_id", 1).unwrap();
        assert_eq!(stmt.kind, StatementKind::Routine);
        assert_eq!(stmt.sql, "SELECT * FROM get_user_by_id($1)");

        let stmt = build_statement("ins_glucose_record", 4).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM ins_glucose_record($1, $2, $3, $4)"
        );
    }

    #[test]
    fn test_synthesizes_zero_argument_call() {
        let stmt = build_statement("ins_glucose_record", 0).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM ins_glucose_record()");
    }

    #[test]
    fn test_literal_sql_passes_through_verbatim() {
        let sql = "SELECT * FROM users WHERE name = $1";
        let stmt = build_statement(sql, 1).unwrap();
        assert_eq!(stmt.kind, StatementKind::LiteralSql);
        assert_eq!(stmt.sql, sql);
    }

    #[test]
    fn test_spec_is_trimmed_before_classification() {
        let stmt = build_statement("  get_user_by_id  ", 0).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM get_user_by_id()");
    }

    #[test]
    fn test_empty_spec_is_usage_error() {
        assert!(matches!(
            build_statement("", 0),
            Err(GatewayError::Usage { .. })
        ));
        assert!(matches!(
            build_statement("   ", 2),
            Err(GatewayError::Usage { .. })
        ));
    }
}
