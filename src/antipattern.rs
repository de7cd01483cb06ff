//! Anti-pattern detector (spec §4.9, C10): regex/structural scan over the
//! SQL text for well-known query smells.

use crate::config::AntiPatternConfig;
use crate::finding::{Finding, Severity};
use crate::metrics::Metrics;
use crate::sql::SqlInfo;

pub fn analyze(sql: &SqlInfo, metrics: &Metrics, config: &AntiPatternConfig) -> Vec<Finding> {
    let mut findings = Vec::new();

    if sql.select_star {
        findings.push(Finding::new(
            Severity::Warning,
            "anti_pattern",
            "SELECT * in use",
            "Selecting all columns pulls unneeded data over the wire and defeats covering indexes",
        ).with_recommendation("List only the columns the caller actually needs"));
    }

    for (func, col) in &sql.function_on_column {
        findings.push(
            Finding::new(
                Severity::Warning,
                "anti_pattern",
                "Function wrapping an indexed column",
                format!("`{func}({col})` in a predicate prevents index range/lookup access on `{col}`"),
            )
            .with_recommendation(format!("Rewrite the predicate so `{col}` is bare, or add a functional index on {func}({col})"))
            .with_meta("function", func.as_str())
            .with_meta("column", col.as_str()),
        );
    }

    if sql.has_or_chain_of_len >= config.or_chain_threshold {
        findings.push(Finding::new(
            Severity::Warning,
            "anti_pattern",
            "Long OR chain",
            format!("WHERE clause chains {} OR-separated conditions", sql.has_or_chain_of_len),
        ).with_recommendation("Consider rewriting as IN(...) or UNION of indexed lookups"));
    }

    if sql.has_correlated_subquery {
        findings.push(Finding::new(
            Severity::Warning,
            "anti_pattern",
            "Correlated subquery",
            "A subquery references the outer row and re-executes per row",
        ).with_recommendation("Rewrite as a JOIN where possible"));
    }

    if sql.has_not_in_subquery {
        findings.push(Finding::new(
            Severity::Warning,
            "anti_pattern",
            "NOT IN with subquery",
            "NOT IN (SELECT ...) does not short-circuit on NULL and often defeats indexes",
        ).with_recommendation("Rewrite as NOT EXISTS or LEFT JOIN ... IS NULL"));
    }

    if sql.has_leading_wildcard_like {
        findings.push(Finding::new(
            Severity::Warning,
            "anti_pattern",
            "Leading wildcard LIKE",
            "A LIKE pattern starting with % cannot use a standard B-tree index",
        ).with_recommendation("Use a full-text index or reverse the pattern/column"));
    }

    if !sql.has_limit && metrics.rows_examined > config.missing_limit_row_threshold as f64 && !sql.has_aggregation {
        findings.push(Finding::new(
            Severity::Optimization,
            "anti_pattern",
            "Missing LIMIT on a large scan",
            format!("Query examines {:.0} rows with no LIMIT clause", metrics.rows_examined),
        ).with_recommendation("Add a LIMIT clause if the full result set is not required"));
    }

    if sql.has_order_by_rand {
        findings.push(Finding::new(
            Severity::Critical,
            "anti_pattern",
            "ORDER BY RAND()",
            "Sorting by RAND() forces a full scan and full sort on every execution",
        ).with_recommendation("Use a precomputed random key column or application-side sampling"));
    }

    let primary_keyed_select = !sql.select_star
        && sql.select_columns.len() == 1
        && is_primary_key_like(&sql.select_columns[0]);
    if sql.has_distinct && sql.tables.len() == 1 && primary_keyed_select {
        findings.push(Finding::new(
            Severity::Optimization,
            "anti_pattern",
            "Redundant DISTINCT",
            "DISTINCT on a single-table, primary-keyed select cannot remove any duplicates",
        ));
    }

    findings
}

/// Naming-convention proxy for "this column is the table's primary key",
/// since this parser never has schema access (spec §4.9/§6).
fn is_primary_key_like(column: &str) -> bool {
    column.eq_ignore_ascii_case("id") || column.to_ascii_lowercase().ends_with("_id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::extract;
    use crate::plan::parse_plan;
    use crate::sql::parse_sql;

    #[test]
    fn flags_function_on_column_and_select_star() {
        let tree = parse_plan("-> Table scan on users  (cost=1 rows=100) (actual time=0.1..1.0 rows=100 loops=1)");
        let metrics = extract(&tree, false);
        let sql = parse_sql("SELECT * FROM users WHERE LOWER(email)='x'");
        let findings = analyze(&sql, &metrics, &AntiPatternConfig::default());
        assert!(findings.iter().any(|f| f.title == "SELECT * in use"));
        assert!(findings.iter().any(|f| f.title == "Function wrapping an indexed column"));
    }

    #[test]
    fn flags_order_by_rand_as_critical() {
        let tree = parse_plan("-> Table scan on t  (cost=1 rows=100) (actual time=0.1..1.0 rows=100 loops=1)");
        let metrics = extract(&tree, false);
        let sql = parse_sql("SELECT id FROM t ORDER BY RAND()");
        let findings = analyze(&sql, &metrics, &AntiPatternConfig::default());
        assert!(findings.iter().any(|f| f.title == "ORDER BY RAND()" && f.severity == Severity::Critical));
    }

    #[test]
    fn flags_redundant_distinct_on_primary_key_select() {
        let tree = parse_plan("-> Table scan on orders  (cost=1 rows=100) (actual time=0.1..1.0 rows=100 loops=1)");
        let metrics = extract(&tree, false);
        let sql = parse_sql("SELECT DISTINCT id FROM orders");
        let findings = analyze(&sql, &metrics, &AntiPatternConfig::default());
        assert!(findings.iter().any(|f| f.title == "Redundant DISTINCT"));
    }

    #[test]
    fn does_not_flag_distinct_on_non_unique_column() {
        let tree = parse_plan("-> Table scan on orders  (cost=1 rows=100) (actual time=0.1..1.0 rows=100 loops=1)");
        let metrics = extract(&tree, false);
        let sql = parse_sql("SELECT DISTINCT status FROM orders");
        let findings = analyze(&sql, &metrics, &AntiPatternConfig::default());
        assert!(!findings.iter().any(|f| f.title == "Redundant DISTINCT"));
    }
}
