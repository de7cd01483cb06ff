//! Workload pattern analyzer (spec §4.14, C15): pattern detection over
//! baseline history.

use crate::config::WorkloadConfig;
use crate::finding::{Finding, Severity};
use crate::regression::BaselineSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadPattern {
    RepeatedFullExport,
    HighFrequencyLargeTransfer,
    ApiMisuseBurst,
    HighFrequency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub query_frequency: usize,
    pub is_frequent: bool,
    pub patterns: Vec<WorkloadPattern>,
}

const BURST_WINDOW_SECONDS: i64 = 30;

pub fn analyze(history: &[BaselineSnapshot], table_size: Option<f64>, config: &WorkloadConfig) -> (WorkloadReport, Vec<Finding>) {
    let query_frequency = history.len();
    let is_frequent = query_frequency >= config.frequency_threshold;
    let mut patterns = Vec::new();
    let mut findings = Vec::new();

    let full_export_count = history
        .iter()
        .filter(|s| {
            s.rows_examined >= config.export_row_threshold as f64
                && table_size.map(|ts| (s.rows_examined - ts).abs() / ts.max(1.0) < 0.1).unwrap_or(false)
        })
        .count();
    if full_export_count >= config.frequency_threshold {
        patterns.push(WorkloadPattern::RepeatedFullExport);
        findings.push(Finding::new(
            Severity::Critical,
            "workload",
            "Repeated full table export",
            format!("{full_export_count} recent runs scanned nearly the entire table"),
        ));
    }

    let large_transfer_count =
        history.iter().filter(|s| s.table_size.unwrap_or(0.0) * 256.0 > 50.0 * 1024.0 * 1024.0).count();
    if large_transfer_count >= config.frequency_threshold {
        patterns.push(WorkloadPattern::HighFrequencyLargeTransfer);
        findings.push(Finding::new(
            Severity::Warning,
            "workload",
            "High-frequency large transfer",
            format!("{large_transfer_count} recent runs each transferred a large result set"),
        ));
    }

    let burst = history.windows(config.frequency_threshold.max(1)).any(|w| {
        let span = (w.last().unwrap().timestamp - w.first().unwrap().timestamp).num_seconds();
        span.abs() <= BURST_WINDOW_SECONDS
    });
    if burst && query_frequency >= config.frequency_threshold {
        patterns.push(WorkloadPattern::ApiMisuseBurst);
        findings.push(Finding::new(
            Severity::Warning,
            "workload",
            "Burst of repeated queries",
            format!("{} executions observed within a {BURST_WINDOW_SECONDS}s window", config.frequency_threshold),
        ));
    }

    if is_frequent && patterns.is_empty() {
        patterns.push(WorkloadPattern::HighFrequency);
    }

    (WorkloadReport { query_frequency, is_frequent, patterns }, findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ComplexityClass;
    use crate::plan::AccessType;
    use std::collections::HashMap;

    fn snapshot(table_size: Option<f64>) -> BaselineSnapshot {
        BaselineSnapshot {
            timestamp: chrono::Utc::now(),
            composite_score: 80.0,
            grade: "B".to_string(),
            execution_time_ms: 10.0,
            rows_examined: 1000.0,
            rows_returned: 1000.0,
            complexity: ComplexityClass::Linear,
            access_type: AccessType::TableScan,
            indexes_used: Vec::new(),
            finding_counts: HashMap::new(),
            table_size,
            buffer_pool_utilization: 0.1,
            is_cold_cache: false,
            time_per_row: 0.01,
        }
    }

    #[test]
    fn large_transfer_count_is_per_snapshot() {
        let config = WorkloadConfig { frequency_threshold: 2, export_row_threshold: 1_000_000 };
        // Only two of three snapshots individually exceed the 50MB transfer size.
        let history = vec![snapshot(Some(300_000.0)), snapshot(Some(300_000.0)), snapshot(Some(10.0))];
        let (report, findings) = analyze(&history, None, &config);
        assert!(report.patterns.contains(&WorkloadPattern::HighFrequencyLargeTransfer));
        assert!(findings.iter().any(|f| f.title == "High-frequency large transfer"));
    }

    #[test]
    fn large_transfer_not_flagged_when_snapshots_are_small() {
        let config = WorkloadConfig { frequency_threshold: 2, export_row_threshold: 1_000_000 };
        let history = vec![snapshot(Some(10.0)), snapshot(Some(10.0)), snapshot(Some(10.0))];
        let (report, _) = analyze(&history, None, &config);
        assert!(!report.patterns.contains(&WorkloadPattern::HighFrequencyLargeTransfer));
    }
}
