//! End-to-end scenario tests driving the orchestrator the way a caller
//! would, rather than exercising one analyzer in isolation.

use crate::config::Config;
use crate::environment::{EnvironmentContext, ExecutionProfile};
use crate::orchestrator::{analyze, AnalysisRequest};
use crate::regression::FileBaselineStore;
use tempfile::tempdir;

fn request<'a>(sql: &str, plan_text: &str, config: &'a Config, store: &'a FileBaselineStore) -> AnalysisRequest<'a> {
    AnalysisRequest {
        sql: sql.to_string(),
        plan_text: plan_text.to_string(),
        driver_name: "mysql".to_string(),
        env: EnvironmentContext::default(),
        profile: None,
        is_intentional_scan: false,
        supports_analyze: true,
        table_size: None,
        existing_indexes: Vec::new(),
        sort_buffer_size: 262_144,
        config,
        baseline_store: store,
        cancellation: None,
        budget_ms: 2000,
    }
}

#[test]
fn large_intentional_scan_is_dampened_end_to_end() {
    let dir = tempdir().unwrap();
    let store = FileBaselineStore::new(dir.path(), 100).unwrap();
    let config = Config::default();
    let plan = "-> Table scan on archive  (cost=1 rows=1000000) (actual time=0.1..258000 rows=1000000 loops=1)";
    let mut req = request("SELECT * FROM archive", plan, &config, &store);
    req.is_intentional_scan = true;
    let report = analyze(req).unwrap();
    assert!(report.composite_score <= 94.0001, "expected dampened score, got {}", report.composite_score);
    assert!(report.result.scores.dataset_dampened);
}

#[test]
fn order_by_rand_fails_the_report() {
    let dir = tempdir().unwrap();
    let store = FileBaselineStore::new(dir.path(), 100).unwrap();
    let config = Config::default();
    let plan = "-> Table scan on t  (cost=1 rows=5000) (actual time=0.1..40 rows=5000 loops=1)";
    let req = request("SELECT * FROM t ORDER BY RAND() LIMIT 1", plan, &config, &store);
    let report = analyze(req).unwrap();
    assert!(!report.passed);
    assert!(report
        .result
        .findings
        .iter()
        .any(|f| f.severity == crate::finding::Severity::Critical));
}

#[test]
fn memory_pressure_surfaces_through_the_pipeline() {
    let dir = tempdir().unwrap();
    let store = FileBaselineStore::new(dir.path(), 100).unwrap();
    let config = Config::default();
    let plan = "-> Table scan on t1  (cost=1 rows=1000000) (actual time=0.1..50 rows=1000000 loops=1)";
    let mut req = request("SELECT * FROM t1", plan, &config, &store);
    req.profile = Some(ExecutionProfile { physical_reads: 3111, ..Default::default() });
    let report = analyze(req).unwrap();
    assert!(report
        .result
        .findings
        .iter()
        .any(|f| f.category == "memory" && f.title == "Large result set transfer"));
    assert!(!report.passed);
}

#[test]
fn single_row_lookup_suppresses_index_findings() {
    let dir = tempdir().unwrap();
    let store = FileBaselineStore::new(dir.path(), 100).unwrap();
    let config = Config::default();
    let plan = "-> Single-row index lookup on users using PRIMARY (id=1)  (cost=1 rows=1) (actual time=0.01..0.01 rows=1 loops=1)";
    let req = request("SELECT * FROM users WHERE id=1", plan, &config, &store);
    let report = analyze(req).unwrap();
    assert!(report.grade == "A+" || report.grade == "A");
    assert!(!report
        .result
        .findings
        .iter()
        .any(|f| f.category == "index_synthesis"));
}
