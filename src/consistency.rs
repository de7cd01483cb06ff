//! Consistency validator (spec §4.15, C16): final cross-checks for internal
//! contradictions. Purely observational — it never removes or mutates a
//! finding, only reports violations (spec §7).

use crate::concurrency::LockScope;
use crate::config::RegressionConfig;
use crate::finding::{Finding, Severity};
use crate::metrics::{Metrics, RiskLevel};
use crate::plan::AccessType;
use crate::regression::MetricRegression;
use crate::sql::{DmlKind, SqlInfo};
use std::collections::HashSet;

pub fn validate(
    metrics: &Metrics,
    findings: &[Finding],
    lock_scope: LockScope,
    complexity_risk: RiskLevel,
    sql: &SqlInfo,
    regressions: &[MetricRegression],
    regression_config: &RegressionConfig,
) -> (bool, Vec<String>) {
    let mut violations = Vec::new();

    if metrics.primary_access_type == AccessType::IndexLookup && !metrics.is_index_backed {
        violations.push("primary_access_type=index_lookup but is_index_backed=false".to_string());
    }

    if metrics.primary_access_type == AccessType::IndexLookup && metrics.has_table_scan && metrics.is_index_backed {
        violations.push("primary_access_type=index_lookup with has_table_scan=true despite is_index_backed=true".to_string());
    }

    if complexity_risk == RiskLevel::Low && metrics.has_table_scan && metrics.rows_examined > 1000.0 {
        violations.push("complexity_risk=LOW despite a table scan over more than 1000 rows".to_string());
    }

    let mut seen: HashSet<(String, String, Option<String>)> = HashSet::new();
    for f in findings {
        let key = f.dedup_key();
        if !seen.insert(key) {
            violations.push(format!("duplicate finding: {} / {}", f.category, f.title));
        }
    }

    let plain_select = matches!(sql.dml_kind, DmlKind::Select) && !sql.has_for_update && !sql.has_for_share;
    if lock_scope == LockScope::Table && plain_select {
        violations.push("lock_scope=table on a plain SELECT with no locking clause".to_string());
    }

    if complexity_risk == RiskLevel::High
        && matches!(metrics.primary_access_type, AccessType::ConstRow | AccessType::ZeroRowConst)
    {
        violations.push("complexity_risk=HIGH for a const/zero-row access type".to_string());
    }

    if metrics.is_intentional_scan
        && findings.iter().any(|f| f.severity == Severity::Critical && f.category == "no_index")
    {
        violations.push("is_intentional_scan=true but a Critical no_index finding remains".to_string());
    }

    for r in regressions {
        if r.baseline_value < regression_config.minimum_measurable_ms && r.metric == "execution_time_ms" {
            violations.push(format!("regression on {} with baseline below minimum_measurable_ms", r.metric));
        }
    }

    if !metrics.parsing_valid && metrics.execution_time_ms > 0.0 {
        violations.push("parsing_valid=false but execution_time_ms>0".to_string());
    }

    let valid = violations.is_empty();
    (valid, violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::extract;
    use crate::plan::parse_plan;
    use crate::sql::parse_sql;

    #[test]
    fn clean_input_is_valid() {
        let tree = parse_plan("-> Index lookup on t using idx (a=1)  (cost=1 rows=1) (actual time=0.01..0.01 rows=1 loops=1)");
        let metrics = extract(&tree, false);
        let sql = parse_sql("SELECT id FROM t WHERE a=1");
        let (valid, violations) = validate(&metrics, &[], LockScope::None, RiskLevel::Low, &sql, &[], &RegressionConfig::default());
        assert!(valid, "unexpected violations: {violations:?}");
    }
}
