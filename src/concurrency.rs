//! Concurrency / lock analyzer (spec §4.6, C7).

use crate::environment::ExecutionProfile;
use crate::finding::{Finding, Severity};
use crate::metrics::Metrics;
use crate::plan::AccessType;
use crate::sql::{DmlKind, SqlInfo};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockScope {
    None,
    Table,
    Range,
    Gap,
    Row,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlockRiskLabel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyProfile {
    pub lock_scope: LockScope,
    pub deadlock_risk: f64,
    pub deadlock_risk_label: DeadlockRiskLabel,
    pub contention_score: f64,
}

pub fn analyze(metrics: &Metrics, sql: &SqlInfo, profile: Option<&ExecutionProfile>) -> (ConcurrencyProfile, Vec<Finding>) {
    if matches!(sql.dml_kind, DmlKind::Select) && !sql.has_for_update && !sql.has_for_share {
        return (
            ConcurrencyProfile {
                lock_scope: LockScope::None,
                deadlock_risk: 0.0,
                deadlock_risk_label: DeadlockRiskLabel::Low,
                contention_score: 0.0,
            },
            Vec::new(),
        );
    }

    let lock_scope = match metrics.primary_access_type {
        AccessType::TableScan => LockScope::Table,
        AccessType::IndexRangeScan => LockScope::Range,
        AccessType::IndexLookup | AccessType::CoveringIndexLookup | AccessType::IndexScan => LockScope::Gap,
        AccessType::SingleRowLookup | AccessType::ConstRow | AccessType::ZeroRowConst => LockScope::Row,
        _ => LockScope::Unknown,
    };

    let multi_table = sql.tables.len() > 1;
    let nested_loop_depth = profile.map(|p| p.nested_loop_depth).unwrap_or(metrics.nested_loop_depth);

    let mut deadlock_risk = 0.0;
    if multi_table {
        deadlock_risk += 0.3;
    }
    if sql.has_exists || sql.has_not_in_subquery || sql.has_correlated_subquery {
        deadlock_risk += 0.2;
    }
    if !metrics.is_index_backed {
        deadlock_risk += 0.3;
    }
    if nested_loop_depth > 2 {
        deadlock_risk += 0.2;
    }
    deadlock_risk = deadlock_risk.clamp(0.0, 1.0);

    let deadlock_risk_label = if deadlock_risk < 0.3 {
        DeadlockRiskLabel::Low
    } else if deadlock_risk < 0.6 {
        DeadlockRiskLabel::Moderate
    } else {
        DeadlockRiskLabel::High
    };

    let contention_score =
        round4(metrics.execution_time_ms * (1.0 + nested_loop_depth as f64 * 0.5) * metrics.rows_examined / 10_000.0);

    let mut findings = Vec::new();
    if !matches!(sql.dml_kind, DmlKind::Select) && lock_scope == LockScope::Table {
        findings.push(
            Finding::new(
                Severity::Critical,
                "concurrency",
                "Table-level lock on write",
                "This write statement takes a table-scope lock, serializing concurrent writers",
            )
            .with_recommendation("Add a selective index so the write can take row/gap locks instead"),
        );
    }
    match deadlock_risk_label {
        DeadlockRiskLabel::High => findings.push(Finding::new(
            Severity::Warning,
            "concurrency",
            "High deadlock risk",
            format!("Deadlock risk score {deadlock_risk:.2} across {} table(s)", sql.tables.len()),
        )),
        DeadlockRiskLabel::Moderate => findings.push(Finding::new(
            Severity::Optimization,
            "concurrency",
            "Moderate deadlock risk",
            format!("Deadlock risk score {deadlock_risk:.2}"),
        )),
        DeadlockRiskLabel::Low => {}
    }
    if contention_score > 100.0 {
        findings.push(Finding::new(
            Severity::Warning,
            "concurrency",
            "High lock contention",
            format!("Contention score {contention_score:.2} exceeds the advisory threshold of 100"),
        ));
    }

    (ConcurrencyProfile { lock_scope, deadlock_risk, deadlock_risk_label, contention_score }, findings)
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::extract;
    use crate::plan::parse_plan;
    use crate::sql::parse_sql;

    #[test]
    fn plain_select_has_no_lock_scope() {
        let tree = parse_plan("-> Table scan on users  (cost=1 rows=100) (actual time=0.1..1.0 rows=100 loops=1)");
        let metrics = extract(&tree, false);
        let sql = parse_sql("SELECT * FROM users WHERE LOWER(email)='x'");
        let (profile, findings) = analyze(&metrics, &sql, None);
        assert_eq!(profile.lock_scope, LockScope::None);
        assert_eq!(profile.deadlock_risk, 0.0);
        assert!(findings.is_empty());
    }
}
