//! Cardinality drift analyzer (spec §4.7, C8): per-table estimate-vs-actual
//! divergence and the actual-row-weighted composite.

use crate::config::DriftConfig;
use crate::finding::{Finding, Severity};
use crate::metrics::Metrics;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftDirection {
    Accurate,
    Over,
    Under,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftSeverity {
    Info,
    Optimization,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDrift {
    pub table: String,
    pub drift: f64,
    pub direction: DriftDirection,
    pub severity: DriftSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    pub per_table: Vec<TableDrift>,
    pub composite_drift: f64,
    pub tables_needing_analyze: Vec<String>,
}

pub fn analyze(metrics: &Metrics, config: &DriftConfig) -> (DriftReport, Vec<Finding>) {
    let mut per_table = Vec::new();
    let mut weighted_sum = 0.0;
    let mut actual_sum = 0.0;
    let mut findings = Vec::new();

    for t in &metrics.per_table_estimates {
        let total_estimated = t.estimated_rows * t.loops;
        let total_actual = t.actual_rows * t.loops;
        let denom = total_estimated.max(total_actual).max(1.0);
        let drift = (total_estimated - total_actual).abs() / denom;
        let direction = if drift == 0.0 {
            DriftDirection::Accurate
        } else if total_estimated > total_actual {
            DriftDirection::Over
        } else {
            DriftDirection::Under
        };
        let severity = if drift > config.critical_threshold {
            DriftSeverity::Critical
        } else if drift > config.warning_threshold {
            DriftSeverity::Warning
        } else if drift > 0.2 {
            DriftSeverity::Optimization
        } else {
            DriftSeverity::Info
        };

        if severity == DriftSeverity::Critical {
            findings.push(Finding::new(
                Severity::Critical,
                "cardinality_drift",
                "Severe cardinality drift",
                format!(
                    "Table `{}` estimate diverges {:.1}% from actual rows",
                    t.table,
                    drift * 100.0
                ),
            ).with_recommendation(format!("Run ANALYZE TABLE `{}`", t.table)));
        } else if severity == DriftSeverity::Warning {
            findings.push(Finding::new(
                Severity::Warning,
                "cardinality_drift",
                "Cardinality drift",
                format!(
                    "Table `{}` estimate diverges {:.1}% from actual rows",
                    t.table,
                    drift * 100.0
                ),
            ).with_recommendation(format!("Run ANALYZE TABLE `{}`", t.table)));
        }

        weighted_sum += drift * total_actual;
        actual_sum += total_actual;
        per_table.push(TableDrift { table: t.table.clone(), drift, direction, severity });
    }

    let composite_drift = if actual_sum > 0.0 { weighted_sum / actual_sum } else { 0.0 };
    let tables_needing_analyze = per_table
        .iter()
        .filter(|t| t.drift > config.warning_threshold)
        .map(|t| t.table.clone())
        .collect();

    (DriftReport { per_table, composite_drift, tables_needing_analyze }, findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PerTableEstimate;

    fn metrics_with(estimates: Vec<PerTableEstimate>) -> Metrics {
        let tree = crate::plan::parse_plan("-> Table scan on t  (cost=1 rows=1) (actual time=0.1..1.0 rows=1 loops=1)");
        let mut m = crate::metrics::extract(&tree, false);
        m.per_table_estimates = estimates;
        m
    }

    #[test]
    fn critical_drift_on_logs_table() {
        let m = metrics_with(vec![PerTableEstimate {
            table: "logs".to_string(),
            estimated_rows: 10.0,
            actual_rows: 10_000.0,
            loops: 1.0,
        }]);
        let (report, findings) = analyze(&m, &DriftConfig::default());
        assert_eq!(report.per_table[0].severity, DriftSeverity::Critical);
        assert!(report.tables_needing_analyze.contains(&"logs".to_string()));
        assert!(findings.iter().any(|f| f.severity == Severity::Critical));
    }
}
