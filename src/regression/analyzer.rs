//! Regression baseline analyzer (spec §4.13, C14): dual-threshold plus
//! noise-floor/minimum-measurable gating against the last saved snapshot,
//! rows-examined data-growth classification, plan-change detection, and
//! trend across history.

use super::baseline_store::{BaselineSnapshot, BaselineStore, StoreError};
use crate::config::RegressionConfig;
use crate::finding::{Finding, Severity};
use crate::metrics::Metrics;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Degrading,
    Improving,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRegression {
    pub metric: String,
    pub baseline_value: f64,
    pub current_value: f64,
    pub change_pct: f64,
    pub classification: Option<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    pub has_baseline: bool,
    pub regressions: Vec<MetricRegression>,
    pub improvements: Vec<MetricRegression>,
    pub trend: Option<TrendLabel>,
}

/// `current_grade`/`current_is_cold_cache` etc. are supplied by the caller
/// (the orchestrator) since they come from other components' outputs, not
/// from `Metrics` itself.
#[allow(clippy::too_many_arguments)]
pub fn analyze(
    store: &dyn BaselineStore,
    query_hash: &str,
    metrics: &Metrics,
    composite_score: f64,
    grade: &str,
    current_is_cold_cache: bool,
    table_size: Option<f64>,
    buffer_pool_utilization: f64,
    config: &RegressionConfig,
) -> (RegressionReport, Vec<Finding>) {
    let mut findings = Vec::new();

    let baseline = match store.load(query_hash) {
        Ok(b) => b,
        Err(StoreError::Io(_)) | Err(StoreError::Serde(_)) => {
            tracing::warn!(query_hash, "baseline store unavailable");
            findings.push(Finding::new(Severity::Info, "regression", "Baseline store unavailable", "Could not read prior baselines for this query"));
            None
        }
    };

    let mut report = RegressionReport { has_baseline: baseline.is_some(), regressions: Vec::new(), improvements: Vec::new(), trend: None };

    if let Some(baseline) = &baseline {
        analyze_against_baseline(baseline, metrics, composite_score, current_is_cold_cache, config, &mut report, &mut findings);

        if let Ok(history) = store.history(query_hash, 200) {
            if history.len() >= 3 {
                let scores: Vec<f64> = history.iter().map(|s| s.composite_score).collect();
                let degrading = scores.windows(2).all(|w| w[1] < w[0]);
                let improving = scores.windows(2).all(|w| w[1] > w[0]);
                let trend = if degrading {
                    findings.push(Finding::new(Severity::Warning, "regression", "Degrading trend", "Composite score has strictly decreased across recent runs"));
                    TrendLabel::Degrading
                } else if improving {
                    TrendLabel::Improving
                } else {
                    TrendLabel::Stable
                };
                report.trend = Some(trend);
            }
        }
    }

    let snapshot = BaselineSnapshot {
        timestamp: baseline.as_ref().map(|_| current_timestamp()).unwrap_or_else(current_timestamp),
        composite_score,
        grade: grade.to_string(),
        execution_time_ms: metrics.execution_time_ms,
        rows_examined: metrics.rows_examined,
        rows_returned: metrics.rows_returned,
        complexity: metrics.complexity,
        access_type: metrics.primary_access_type,
        indexes_used: metrics.indexes_used.clone(),
        finding_counts: std::collections::HashMap::new(),
        table_size,
        buffer_pool_utilization,
        is_cold_cache: current_is_cold_cache,
        time_per_row: BaselineSnapshot::time_per_row(metrics.execution_time_ms, metrics.rows_examined),
    };
    if let Err(e) = store.save(query_hash, snapshot) {
        tracing::warn!(query_hash, error = %e, "failed to save baseline snapshot");
    }

    (report, findings)
}

fn current_timestamp() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

fn analyze_against_baseline(
    baseline: &BaselineSnapshot,
    metrics: &Metrics,
    composite_score: f64,
    current_is_cold_cache: bool,
    config: &RegressionConfig,
    report: &mut RegressionReport,
    findings: &mut Vec<Finding>,
) {
    // composite_score
    if baseline.composite_score > 0.0 {
        let delta = composite_score - baseline.composite_score;
        let change_pct = (delta / baseline.composite_score) * 100.0;
        if delta < 0.0 && change_pct.abs() >= config.score_warning_threshold_pct && delta.abs() >= config.absolute_score_threshold {
            let severity = if change_pct.abs() >= config.score_critical_threshold_pct { Severity::Critical } else { Severity::Warning };
            findings.push(
                Finding::new(severity, "regression", "Composite score regression", format!("Composite score dropped {:.1}% ({:.1} -> {:.1})", change_pct.abs(), baseline.composite_score, composite_score)),
            );
            report.regressions.push(MetricRegression {
                metric: "composite_score".to_string(),
                baseline_value: baseline.composite_score,
                current_value: composite_score,
                change_pct,
                classification: None,
                severity,
            });
        } else if delta > 0.0 && change_pct.abs() >= config.score_warning_threshold_pct && delta.abs() >= config.absolute_score_threshold {
            report.improvements.push(MetricRegression {
                metric: "composite_score".to_string(),
                baseline_value: baseline.composite_score,
                current_value: composite_score,
                change_pct,
                classification: None,
                severity: Severity::Info,
            });
        }
    }

    // execution_time_ms, with rows-examined-aware data-growth classification
    if baseline.execution_time_ms >= config.minimum_measurable_ms {
        let delta_ms = metrics.execution_time_ms - baseline.execution_time_ms;
        let change_pct = (delta_ms / baseline.execution_time_ms) * 100.0;
        let rows_grew_pct = if baseline.rows_examined > 0.0 {
            (metrics.rows_examined - baseline.rows_examined) / baseline.rows_examined * 100.0
        } else {
            0.0
        };
        let baseline_per_row = baseline.execution_time_ms / baseline.rows_examined.max(1.0);
        let current_per_row = metrics.execution_time_ms / metrics.rows_examined.max(1.0);
        let per_row_degradation_pct = if baseline_per_row > 0.0 { (current_per_row - baseline_per_row) / baseline_per_row * 100.0 } else { 0.0 };

        let data_growth = delta_ms > 0.0 && rows_grew_pct > 50.0 && per_row_degradation_pct.abs() <= 25.0;

        if data_growth {
            findings.push(Finding::new(
                Severity::Info,
                "regression",
                "Data growth in execution_time",
                format!("Rows examined grew {rows_grew_pct:.1}% with stable per-row cost ({per_row_degradation_pct:+.1}%)"),
            ).with_meta("classification", "data_growth"));
        } else if delta_ms > 0.0
            && delta_ms.abs() >= config.noise_floor_ms
            && delta_ms.abs() >= config.absolute_time_threshold_ms
            && change_pct.abs() >= config.time_warning_threshold_pct
        {
            let severity = if change_pct.abs() >= config.time_critical_threshold_pct { Severity::Critical } else { Severity::Warning };
            findings.push(Finding::new(
                severity,
                "regression",
                "Execution time regression",
                format!("Execution time grew {:.1}% ({:.2}ms -> {:.2}ms)", change_pct, baseline.execution_time_ms, metrics.execution_time_ms),
            ));
            report.regressions.push(MetricRegression {
                metric: "execution_time_ms".to_string(),
                baseline_value: baseline.execution_time_ms,
                current_value: metrics.execution_time_ms,
                change_pct,
                classification: Some("performance_degradation".to_string()),
                severity,
            });
        } else if delta_ms < 0.0 && delta_ms.abs() >= config.noise_floor_ms {
            let is_cache_warmup_artifact = baseline.is_cold_cache && !current_is_cold_cache;
            if !is_cache_warmup_artifact {
                report.improvements.push(MetricRegression {
                    metric: "execution_time_ms".to_string(),
                    baseline_value: baseline.execution_time_ms,
                    current_value: metrics.execution_time_ms,
                    change_pct,
                    classification: None,
                    severity: Severity::Info,
                });
            }
        }

        // rows_examined classification record, independent of the time finding above
        if rows_grew_pct > 50.0 {
            let classification = if per_row_degradation_pct.abs() <= 25.0 { "data_growth" } else { "performance_degradation" };
            report.regressions.retain(|r| r.metric != "rows_examined");
            if classification == "performance_degradation" {
                report.regressions.push(MetricRegression {
                    metric: "rows_examined".to_string(),
                    baseline_value: baseline.rows_examined,
                    current_value: metrics.rows_examined,
                    change_pct: rows_grew_pct,
                    classification: Some(classification.to_string()),
                    severity: Severity::Warning,
                });
            }
        }
    }

    // plan-change detection
    let baseline_sev = baseline.access_type.io_severity();
    let current_sev = metrics.primary_access_type.io_severity();
    if let (Some(b), Some(c)) = (baseline_sev, current_sev) {
        if c > b {
            findings.push(
                Finding::new(Severity::Warning, "regression", "Plan change", format!("Access type worsened from {:?} to {:?}", baseline.access_type, metrics.primary_access_type))
            );
            report.regressions.push(MetricRegression {
                metric: "plan_change".to_string(),
                baseline_value: b as f64,
                current_value: c as f64,
                change_pct: 0.0,
                classification: Some("plan_change".to_string()),
                severity: Severity::Warning,
            });
        } else if c < b {
            report.improvements.push(MetricRegression {
                metric: "plan_change".to_string(),
                baseline_value: b as f64,
                current_value: c as f64,
                change_pct: 0.0,
                classification: Some("plan_change".to_string()),
                severity: Severity::Info,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::baseline_store::FileBaselineStore;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn base_metrics(time_ms: f64, rows: f64, access: crate::plan::AccessType) -> Metrics {
        Metrics {
            execution_time_ms: time_ms,
            rows_examined: rows,
            rows_returned: rows,
            primary_access_type: access,
            mysql_access_type: "ALL".to_string(),
            is_zero_row_const: false,
            is_index_backed: false,
            complexity: crate::metrics::ComplexityClass::Linear,
            has_table_scan: true,
            has_filesort: false,
            has_temp_table: false,
            has_disk_temp: false,
            has_weedout: false,
            has_covering_index: false,
            has_early_termination: false,
            has_index_merge: false,
            has_materialization: false,
            nested_loop_depth: 0,
            fanout_factor: rows,
            per_table_estimates: Vec::new(),
            tables_accessed: Vec::new(),
            indexes_used: Vec::new(),
            parsing_valid: true,
            is_intentional_scan: false,
            metadata: HashMap::new(),
        }
    }

    fn snapshot(score: f64, time_ms: f64, rows: f64, access: crate::plan::AccessType, cold: bool) -> BaselineSnapshot {
        BaselineSnapshot {
            timestamp: chrono::Utc::now(),
            composite_score: score,
            grade: "B".to_string(),
            execution_time_ms: time_ms,
            rows_examined: rows,
            rows_returned: rows,
            complexity: crate::metrics::ComplexityClass::Linear,
            access_type: access,
            indexes_used: Vec::new(),
            finding_counts: HashMap::new(),
            table_size: None,
            buffer_pool_utilization: 0.0,
            is_cold_cache: cold,
            time_per_row: time_ms / rows.max(1.0),
        }
    }

    #[test]
    fn proportional_data_growth_is_not_a_regression() {
        let dir = tempdir().unwrap();
        let store = FileBaselineStore::new(dir.path(), 100).unwrap();
        store.save("h", snapshot(90.0, 50.0, 500_000.0, crate::plan::AccessType::TableScan, false)).unwrap();
        let metrics = base_metrics(100.0, 1_000_000.0, crate::plan::AccessType::TableScan);
        let (report, findings) = analyze(&store, "h", &metrics, 90.0, "A", false, None, 0.0, &RegressionConfig::default());
        assert!(!report.regressions.iter().any(|r| r.metric == "execution_time_ms"));
        assert!(findings.iter().any(|f| f.title == "Data growth in execution_time"));
    }

    #[test]
    fn small_score_delta_under_absolute_floor_is_not_flagged() {
        let dir = tempdir().unwrap();
        let store = FileBaselineStore::new(dir.path(), 100).unwrap();
        store.save("h", snapshot(20.0, 10.0, 100.0, crate::plan::AccessType::TableScan, false)).unwrap();
        let metrics = base_metrics(10.0, 100.0, crate::plan::AccessType::TableScan);
        let (report, _) = analyze(&store, "h", &metrics, 18.0, "D", false, None, 0.0, &RegressionConfig::default());
        assert!(!report.regressions.iter().any(|r| r.metric == "composite_score"));
    }

    #[test]
    fn noise_floor_blocks_small_time_delta() {
        let dir = tempdir().unwrap();
        let store = FileBaselineStore::new(dir.path(), 100).unwrap();
        store.save("h", snapshot(90.0, 10.0, 100.0, crate::plan::AccessType::TableScan, false)).unwrap();
        let metrics = base_metrics(12.5, 100.0, crate::plan::AccessType::TableScan);
        let (report, _) = analyze(&store, "h", &metrics, 90.0, "A", false, None, 0.0, &RegressionConfig::default());
        assert!(!report.regressions.iter().any(|r| r.metric == "execution_time_ms"));
    }

    #[test]
    fn access_type_downgrade_is_plan_change_regression() {
        let dir = tempdir().unwrap();
        let store = FileBaselineStore::new(dir.path(), 100).unwrap();
        store.save("h", snapshot(95.0, 1.0, 1.0, crate::plan::AccessType::ConstRow, false)).unwrap();
        let metrics = base_metrics(50.0, 1000.0, crate::plan::AccessType::TableScan);
        let (report, findings) = analyze(&store, "h", &metrics, 60.0, "D", false, None, 0.0, &RegressionConfig::default());
        assert!(report.regressions.iter().any(|r| r.metric == "plan_change"));
        assert!(findings.iter().any(|f| f.title == "Plan change"));
    }
}
