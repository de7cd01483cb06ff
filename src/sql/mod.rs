//! Light, regex-level SQL introspection (spec §4.1 C3).
//!
//! Deliberately not a SQL grammar — spec §1 scopes this to "light regex-level
//! SQL introspection for WHERE/JOIN/ORDER BY column extraction". Downstream
//! analyzers (anti-pattern, index synthesis, concurrency) read the
//! [`SqlInfo`] this module produces; nothing here touches the plan tree.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmlKind {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    Equality,
    Range,
    In,
    Between,
    Like,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRef {
    /// `None` for a derived table (subquery in the FROM list) — spec §4.1:
    /// "table aliases (incl. derived tables → null)".
    pub name: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub table_hint: Option<String>,
    pub kind: PredicateKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlInfo {
    pub dml_kind: DmlKind,
    pub tables: Vec<TableRef>,
    pub select_star: bool,
    pub select_columns: Vec<String>,
    pub predicates: Vec<Predicate>,
    pub order_by: Vec<String>,
    pub has_order_by: bool,
    pub has_limit: bool,
    pub limit_value: Option<u64>,
    pub has_exists: bool,
    pub has_aggregation: bool,
    pub has_group_by: bool,
    pub has_distinct: bool,
    pub has_for_update: bool,
    pub has_for_share: bool,
    pub has_or_chain_of_len: usize,
    pub function_on_column: Vec<(String, String)>,
    pub has_not_in_subquery: bool,
    pub has_correlated_subquery: bool,
    pub has_leading_wildcard_like: bool,
    pub has_order_by_rand: bool,
}

static FROM_JOIN_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:FROM|JOIN)\s+`?([A-Za-z_][A-Za-z0-9_]*)`?(?:\s+(?:AS\s+)?([A-Za-z_][A-Za-z0-9_]*))?")
        .unwrap()
});
static DERIVED_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\)\s*(?:AS\s+)?([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static SELECT_CLAUSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)\bSELECT\b(.*?)\bFROM\b").unwrap());
static SELECT_DISTINCT_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*DISTINCT\b").unwrap());
static WHERE_CLAUSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bWHERE\b(.*?)(?:\bGROUP BY\b|\bORDER BY\b|\bLIMIT\b|$)").unwrap());
static ORDER_BY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bORDER BY\b(.*?)(?:\bLIMIT\b|$)").unwrap());
static LIMIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bLIMIT\s+(\d+)").unwrap());
static EQUALITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_.]*)\s*=\s*(?:[^=]|$)").unwrap());
static RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_.]*)\s*(?:>=|<=|>|<)\s*").unwrap());
static IN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([A-Za-z_][A-Za-z0-9_.]*)\s+IN\s*\(").unwrap());
static BETWEEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([A-Za-z_][A-Za-z0-9_.]*)\s+BETWEEN\s+").unwrap());
static LIKE_LEADING_WILDCARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([A-Za-z_][A-Za-z0-9_.]*)\s+LIKE\s+'%").unwrap());
static FUNCTION_ON_COLUMN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(UPPER|LOWER|YEAR|MONTH|DAY|DATE|CAST|SUBSTRING|TRIM)\s*\(\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\)\s*(?:=|>|<|LIKE)")
        .unwrap()
});
static NOT_IN_SUBQUERY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bNOT\s+IN\s*\(\s*SELECT\b").unwrap());
static CORRELATED_SUBQUERY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\(\s*SELECT\b[^()]*\bWHERE\b[^()]*=\s*[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*[^()]*\)")
        .unwrap()
});
static AGGREGATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(COUNT|SUM|AVG|MIN|MAX)\s*\(").unwrap());
static ORDER_BY_RAND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)ORDER BY\s+RAND\s*\(\s*\)").unwrap());
static EXISTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bEXISTS\s*\(").unwrap());
static OR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bOR\b").unwrap());

/// Extract a best-effort, regex-level `SqlInfo` from a raw SQL statement.
pub fn parse_sql(sql: &str) -> SqlInfo {
    let dml_kind = detect_dml_kind(sql);

    let mut tables = Vec::new();
    for caps in FROM_JOIN_TABLE_RE.captures_iter(sql) {
        let name = caps.get(1).map(|m| m.as_str().to_string());
        let alias = caps.get(2).map(|m| m.as_str().to_string());
        tables.push(TableRef { name, alias });
    }
    for caps in DERIVED_TABLE_RE.captures_iter(sql) {
        let alias = caps[1].to_string();
        if !tables.iter().any(|t| t.alias.as_deref() == Some(alias.as_str())) {
            tables.push(TableRef { name: None, alias: Some(alias) });
        }
    }

    let select_clause = SELECT_CLAUSE_RE.captures(sql).map(|c| c[1].to_string()).unwrap_or_default();
    let select_star = select_clause.trim().starts_with('*') || select_clause.contains("*");
    let select_clause_columns_only = SELECT_DISTINCT_PREFIX_RE.replace(&select_clause, "").into_owned();
    let select_columns: Vec<String> = if select_star {
        Vec::new()
    } else {
        select_clause_columns_only
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    };

    let where_clause = WHERE_CLAUSE_RE.captures(sql).map(|c| c[1].to_string()).unwrap_or_default();
    let mut predicates = Vec::new();
    for caps in BETWEEN_RE.captures_iter(&where_clause) {
        predicates.push(Predicate { column: caps[1].to_string(), table_hint: None, kind: PredicateKind::Between });
    }
    for caps in IN_RE.captures_iter(&where_clause) {
        predicates.push(Predicate { column: caps[1].to_string(), table_hint: None, kind: PredicateKind::In });
    }
    for caps in RANGE_RE.captures_iter(&where_clause) {
        predicates.push(Predicate { column: caps[1].to_string(), table_hint: None, kind: PredicateKind::Range });
    }
    for caps in EQUALITY_RE.captures_iter(&where_clause) {
        predicates.push(Predicate { column: caps[1].to_string(), table_hint: None, kind: PredicateKind::Equality });
    }
    if let Some(caps) = LIKE_LEADING_WILDCARD_RE.captures(&where_clause) {
        predicates.push(Predicate { column: caps[1].to_string(), table_hint: None, kind: PredicateKind::Like });
    }

    let order_by_clause = ORDER_BY_RE.captures(sql).map(|c| c[1].to_string()).unwrap_or_default();
    let has_order_by = !order_by_clause.trim().is_empty();
    let order_by: Vec<String> = order_by_clause
        .split(',')
        .map(|s| {
            s.trim()
                .trim_end_matches(|c: char| c == ' ')
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .collect();

    let limit_value = LIMIT_RE.captures(sql).and_then(|c| c[1].parse::<u64>().ok());

    let function_on_column: Vec<(String, String)> = FUNCTION_ON_COLUMN_RE
        .captures_iter(sql)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect();

    SqlInfo {
        dml_kind,
        tables,
        select_star,
        select_columns,
        predicates,
        order_by,
        has_order_by,
        has_limit: limit_value.is_some(),
        limit_value,
        has_exists: EXISTS_RE.is_match(sql),
        has_aggregation: AGGREGATION_RE.is_match(sql),
        has_group_by: Regex::new(r"(?i)\bGROUP BY\b").unwrap().is_match(sql),
        has_distinct: Regex::new(r"(?i)\bSELECT\s+DISTINCT\b").unwrap().is_match(sql),
        has_for_update: Regex::new(r"(?i)\bFOR\s+UPDATE\b").unwrap().is_match(sql),
        has_for_share: Regex::new(r"(?i)\bFOR\s+SHARE\b").unwrap().is_match(sql),
        has_or_chain_of_len: OR_RE.find_iter(&where_clause).count() + 1,
        function_on_column,
        has_not_in_subquery: NOT_IN_SUBQUERY_RE.is_match(sql),
        has_correlated_subquery: CORRELATED_SUBQUERY_RE.is_match(sql),
        has_leading_wildcard_like: LIKE_LEADING_WILDCARD_RE.is_match(&where_clause),
        has_order_by_rand: ORDER_BY_RAND_RE.is_match(sql),
    }
}

fn detect_dml_kind(sql: &str) -> DmlKind {
    let trimmed = sql.trim_start().to_ascii_uppercase();
    if trimmed.starts_with("INSERT") {
        DmlKind::Insert
    } else if trimmed.starts_with("UPDATE") {
        DmlKind::Update
    } else if trimmed.starts_with("DELETE") {
        DmlKind::Delete
    } else {
        DmlKind::Select
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ers_predicates_in_order() {
        let info = parse_sql("SELECT id FROM orders WHERE status='active' AND amount>100 ORDER BY created_at DESC");
        assert!(info.predicates.iter().any(|p| p.column == "status" && p.kind == PredicateKind::Equality));
        assert!(info.predicates.iter().any(|p| p.column == "amount" && p.kind == PredicateKind::Range));
        assert_eq!(info.order_by, vec!["created_at"]);
    }

    #[test]
    fn detects_function_on_column_and_select_star() {
        let info = parse_sql("SELECT * FROM users WHERE LOWER(email)='x'");
        assert!(info.select_star);
        assert_eq!(info.function_on_column, vec![("LOWER".to_string(), "email".to_string())]);
    }

    #[test]
    fn detects_leading_wildcard_and_rand_order() {
        let info = parse_sql("SELECT id FROM t WHERE name LIKE '%foo' ORDER BY RAND()");
        assert!(info.has_leading_wildcard_like);
        assert!(info.has_order_by_rand);
    }
}
