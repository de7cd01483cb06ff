//! Metrics extraction (spec §4.2, C2): walks the parsed plan tree once and
//! produces the statically typed [`Metrics`] record every downstream
//! analyzer reads from, per the "dynamic metric map re-architected" design
//! note (spec §9).

use crate::plan::{AccessType, PlanTree, is_derived_table_name, strip_derived_marker};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Asymptotic growth class for a query's dominant cost driver (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityClass {
    Constant = 0,
    Logarithmic = 1,
    LogRange = 2,
    Linear = 3,
    Linearithmic = 4,
    Quadratic = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl ComplexityClass {
    pub fn risk_level(self) -> RiskLevel {
        use ComplexityClass::*;
        match self {
            Constant | Logarithmic | LogRange => RiskLevel::Low,
            Linear | Linearithmic => RiskLevel::Medium,
            Quadratic => RiskLevel::High,
        }
    }

    pub fn label(self) -> &'static str {
        use ComplexityClass::*;
        match self {
            Constant => "O(1)",
            Logarithmic => "O(log n)",
            LogRange => "O(log n + k)",
            Linear => "O(n)",
            Linearithmic => "O(n log n)",
            Quadratic => "O(n\u{b2})",
        }
    }

    /// Ordinal max: "raising" complexity never decreases it (spec §8 invariant).
    pub fn raise_to(self, floor: ComplexityClass) -> ComplexityClass {
        self.max(floor)
    }
}

/// One table's row-estimation accuracy within a single plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerTableEstimate {
    pub table: String,
    pub estimated_rows: f64,
    pub actual_rows: f64,
    pub loops: f64,
}

/// The statically typed output of metrics extraction (spec §3 `Metrics`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub execution_time_ms: f64,
    pub rows_examined: f64,
    pub rows_returned: f64,
    pub primary_access_type: AccessType,
    pub mysql_access_type: String,
    pub is_zero_row_const: bool,
    pub is_index_backed: bool,
    pub complexity: ComplexityClass,
    pub has_table_scan: bool,
    pub has_filesort: bool,
    pub has_temp_table: bool,
    pub has_disk_temp: bool,
    pub has_weedout: bool,
    pub has_covering_index: bool,
    pub has_early_termination: bool,
    pub has_index_merge: bool,
    pub has_materialization: bool,
    pub nested_loop_depth: u32,
    pub fanout_factor: f64,
    pub per_table_estimates: Vec<PerTableEstimate>,
    pub tables_accessed: Vec<String>,
    pub indexes_used: Vec<String>,
    pub parsing_valid: bool,
    pub is_intentional_scan: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

static LIMIT_VALUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)limit:?\s*(\d+)").unwrap());

/// Walk `tree` once and derive every field of [`Metrics`].
///
/// `is_intentional_scan` is caller-supplied (spec glossary: "a scan the
/// caller has flagged as expected"); it cannot be derived from the plan
/// alone.
pub fn extract(tree: &PlanTree, is_intentional_scan: bool) -> Metrics {
    let Some(root) = tree.root.as_ref() else {
        tracing::debug!("metrics extraction on empty plan tree");
        return Metrics {
            execution_time_ms: 0.0,
            rows_examined: 0.0,
            rows_returned: 0.0,
            primary_access_type: AccessType::Unknown,
            mysql_access_type: "unknown".to_string(),
            is_zero_row_const: false,
            is_index_backed: false,
            complexity: ComplexityClass::Linear,
            has_table_scan: false,
            has_filesort: false,
            has_temp_table: false,
            has_disk_temp: false,
            has_weedout: false,
            has_covering_index: false,
            has_early_termination: false,
            has_index_merge: false,
            has_materialization: false,
            nested_loop_depth: 0,
            fanout_factor: 0.0,
            per_table_estimates: Vec::new(),
            tables_accessed: Vec::new(),
            indexes_used: Vec::new(),
            parsing_valid: false,
            is_intentional_scan,
            metadata: HashMap::new(),
        };
    };

    let nodes = root.flatten();

    let io_nodes: Vec<_> = nodes.iter().filter(|n| n.access_type.is_io_node() && n.has_measurement()).collect();

    let primary_access_type = io_nodes
        .iter()
        .max_by_key(|n| n.access_type.io_severity().unwrap_or(0))
        .map(|n| n.access_type)
        .unwrap_or(AccessType::Unknown);

    let rows_examined: f64 = io_nodes.iter().map(|n| n.actual_rows_times_loops()).sum();

    let fanout_factor = io_nodes.iter().map(|n| n.actual_rows_times_loops()).fold(0.0_f64, f64::max);

    let has_table_scan = io_nodes.iter().any(|n| {
        n.access_type == AccessType::TableScan
            && !n.table.as_deref().map(is_derived_table_name).unwrap_or(false)
    });

    let has_filesort = nodes.iter().any(|n| n.access_type == AccessType::Sort);
    let has_weedout = nodes.iter().any(|n| n.raw_line.to_ascii_lowercase().contains("weedout"));
    let has_temp_table = nodes.iter().any(|n| n.raw_line.to_ascii_lowercase().contains("temporary table"));
    let has_disk_temp = nodes
        .iter()
        .any(|n| n.raw_line.to_ascii_lowercase().contains("temporary table") && n.raw_line.to_ascii_lowercase().contains("disk"));
    let has_index_merge = nodes.iter().any(|n| n.access_type == AccessType::IndexMerge);
    let has_materialization = nodes.iter().any(|n| n.access_type == AccessType::Materialize);

    let has_covering_index = nodes.iter().any(|n| {
        n.access_type == AccessType::CoveringIndexLookup || n.raw_line.to_ascii_lowercase().contains("covering index")
    });

    let max_limit_rows: Option<u64> = nodes
        .iter()
        .filter(|n| n.access_type == AccessType::Limit)
        .filter_map(|n| LIMIT_VALUE_RE.captures(&n.raw_line).and_then(|c| c[1].parse::<u64>().ok()))
        .min();
    let has_early_termination = max_limit_rows
        .map(|limit| io_nodes.iter().any(|n| n.actual_rows_times_loops() as u64 <= limit))
        .unwrap_or(false);

    let is_zero_row_const = primary_access_type == AccessType::ZeroRowConst;
    let is_index_backed = primary_access_type.is_io_node() && primary_access_type != AccessType::TableScan
        || matches!(primary_access_type, AccessType::ConstRow | AccessType::ZeroRowConst);

    let max_loops = nodes.iter().filter_map(|n| n.loops).fold(0.0_f64, f64::max);
    let nested_loop_depth = root.join_depth();

    let mut complexity = match primary_access_type {
        AccessType::ZeroRowConst | AccessType::ConstRow | AccessType::SingleRowLookup => ComplexityClass::Constant,
        AccessType::CoveringIndexLookup | AccessType::IndexLookup | AccessType::FulltextIndex => ComplexityClass::Logarithmic,
        AccessType::IndexRangeScan => ComplexityClass::LogRange,
        AccessType::IndexScan | AccessType::TableScan | AccessType::IndexMerge => ComplexityClass::Linear,
        AccessType::Unknown => ComplexityClass::Linear,
        _ => ComplexityClass::Linear,
    };
    if has_filesort {
        complexity = complexity.raise_to(ComplexityClass::Linearithmic);
    }
    let inner_table_scan = nested_loop_depth >= 2 && has_table_scan;
    if inner_table_scan || (nested_loop_depth >= 4 && max_loops > 1000.0) {
        complexity = complexity.raise_to(ComplexityClass::Quadratic);
    }
    if is_zero_row_const {
        complexity = ComplexityClass::Constant;
    }

    let mut tables_accessed: Vec<String> = Vec::new();
    let mut indexes_used: Vec<String> = Vec::new();
    let mut per_table_estimates: Vec<PerTableEstimate> = Vec::new();
    let mut seen_tables: HashSet<String> = HashSet::new();
    let mut seen_indexes: HashSet<String> = HashSet::new();
    for n in &nodes {
        if let Some(t) = &n.table {
            let real = strip_derived_marker(t).to_string();
            if seen_tables.insert(real.clone()) {
                tables_accessed.push(real.clone());
            }
            if let (Some(est), Some(actual), Some(loops)) = (n.estimated_rows, n.actual_rows, n.loops) {
                per_table_estimates.push(PerTableEstimate { table: real, estimated_rows: est, actual_rows: actual, loops });
            }
        }
        if let Some(idx) = &n.index {
            if seen_indexes.insert(idx.clone()) {
                indexes_used.push(idx.clone());
            }
        }
    }

    let execution_time_ms = root.actual_time_end.unwrap_or(0.0);
    let rows_returned = root.actual_rows_times_loops();
    let parsing_valid = tree.parsing_valid;

    Metrics {
        execution_time_ms,
        rows_examined,
        rows_returned,
        primary_access_type,
        mysql_access_type: primary_access_type.to_mysql_access_type().to_string(),
        is_zero_row_const,
        is_index_backed,
        complexity,
        has_table_scan,
        has_filesort,
        has_temp_table,
        has_disk_temp,
        has_weedout,
        has_covering_index,
        has_early_termination,
        has_index_merge,
        has_materialization,
        nested_loop_depth,
        fanout_factor,
        per_table_estimates,
        tables_accessed,
        indexes_used,
        parsing_valid,
        is_intentional_scan,
        metadata: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::parse_plan;

    #[test]
    fn zero_row_const_is_constant_complexity() {
        let tree = parse_plan("-> Zero rows (no matching row in const table)  (cost=0..0 rows=0) (actual time=0.003..0.003 rows=0 loops=1)");
        let m = extract(&tree, false);
        assert_eq!(m.primary_access_type, AccessType::ZeroRowConst);
        assert_eq!(m.complexity, ComplexityClass::Constant);
        assert_eq!(m.rows_examined, 0.0);
    }

    #[test]
    fn table_scan_is_linear_and_flagged() {
        let tree = parse_plan("-> Table scan on t1  (cost=10 rows=1000) (actual time=0.1..5.0 rows=1000 loops=1)");
        let m = extract(&tree, false);
        assert!(m.has_table_scan);
        assert_eq!(m.complexity, ComplexityClass::Linear);
        assert!(!m.is_index_backed);
    }

    #[test]
    fn nested_loop_with_inner_scan_is_quadratic() {
        let text = "\
-> Nested loop inner join
    -> Nested loop inner join
        -> Table scan on t1  (cost=1 rows=100) (actual time=0.1..1.0 rows=100 loops=1)
        -> Table scan on t2  (cost=1 rows=100) (actual time=0.1..1.0 rows=100 loops=100)
    -> Table scan on t3  (cost=1 rows=100) (actual time=0.1..1.0 rows=100 loops=10000)
";
        let tree = parse_plan(text);
        let m = extract(&tree, false);
        assert_eq!(m.complexity, ComplexityClass::Quadratic);
        assert_eq!(m.nested_loop_depth, 2);
    }

    #[test]
    fn never_executed_excluded_from_rows_examined() {
        let text = "\
-> Nested loop inner join
    -> Table scan on t1  (cost=1 rows=10) (actual time=0.1..1.0 rows=10 loops=1)
    -> Index lookup on t2 using idx (a=t1.a) (cost=1 rows=10) (never executed)
";
        let tree = parse_plan(text);
        let m = extract(&tree, false);
        assert_eq!(m.rows_examined, 10.0);
    }
}
