//! Scalability projection (spec §4.4, C5): fixed/variable cost separation,
//! page-scaling growth model, confidence-banded projection range, risk
//! classification, LIMIT sensitivity, and linear-subtype classification.

use crate::metrics::{ComplexityClass, Metrics};
use crate::metrics::RiskLevel;
use crate::sql::{PredicateKind, SqlInfo};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionConfidence {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinearSubtype {
    ExportLinear,
    AnalyticalLinear,
    IndexMissedLinear,
    PathologicalLinear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitProjection {
    pub limit: u64,
    pub projected_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalabilityEstimate {
    pub fixed_ms: f64,
    pub variable_ms: f64,
    pub projected_ms: f64,
    pub projected_lower_ms: f64,
    pub projected_upper_ms: f64,
    pub confidence: ProjectionConfidence,
    pub risk: RiskLevel,
    pub limit_projections: Vec<LimitProjection>,
    pub linear_subtype: Option<LinearSubtype>,
}

fn fixed_ratio(current_rows: f64) -> f64 {
    if current_rows <= 1.0 {
        0.95
    } else if current_rows <= 100.0 {
        0.5
    } else if current_rows <= 1000.0 {
        0.2
    } else if current_rows <= 10_000.0 {
        0.1
    } else {
        0.05
    }
}

fn growth(factor: f64, complexity: ComplexityClass, current_rows: f64, target_rows: f64) -> f64 {
    match complexity {
        ComplexityClass::Constant => 1.0,
        ComplexityClass::Logarithmic => factor.log2() + 1.0,
        ComplexityClass::LogRange => factor.sqrt(),
        ComplexityClass::Linear => factor,
        ComplexityClass::Linearithmic => {
            let log_target = target_rows.max(2.0).log2();
            let log_current = current_rows.max(2.0).log2().max(1.0);
            factor * (log_target / log_current)
        }
        ComplexityClass::Quadratic => factor * factor,
    }
}

/// Project execution time at `target_rows`, given the current measured run.
pub fn project(metrics: &Metrics, current_rows: f64, target_rows: f64, sql: &SqlInfo) -> ScalabilityEstimate {
    let ratio = fixed_ratio(current_rows);
    let fixed_ms = metrics.execution_time_ms * ratio;
    let variable_ms = metrics.execution_time_ms * (1.0 - ratio);

    let factor = (target_rows / 100.0).ceil() / (current_rows / 100.0).ceil().max(1.0);
    let projected_ms = fixed_ms + variable_ms * growth(factor, metrics.complexity, current_rows, target_rows);

    let r = target_rows / current_rows.max(1.0);
    let (confidence, uncertainty) = if r <= 10.0 {
        (ProjectionConfidence::High, 0.1)
    } else if r <= 1000.0 {
        (ProjectionConfidence::Moderate, 0.3)
    } else {
        (ProjectionConfidence::Low, 0.6)
    };
    let projected_lower_ms = projected_ms * (1.0 - uncertainty);
    let projected_upper_ms = projected_ms * (1.0 + uncertainty);

    let risk = classify_risk(metrics, current_rows);

    let limit_projections = [100u64, 500, 1000]
        .into_iter()
        .map(|limit| {
            let projected = if !sql.has_order_by && (metrics.is_intentional_scan || metrics.has_early_termination) {
                metrics.execution_time_ms * (limit as f64 / metrics.rows_examined.max(1.0)).clamp(0.01, 1.0)
            } else {
                metrics.execution_time_ms
            };
            LimitProjection { limit, projected_ms: projected }
        })
        .collect();

    let linear_subtype = if metrics.complexity == ComplexityClass::Linear {
        Some(classify_linear_subtype(metrics, sql))
    } else {
        None
    };

    ScalabilityEstimate {
        fixed_ms,
        variable_ms,
        projected_ms,
        projected_lower_ms,
        projected_upper_ms,
        confidence,
        risk,
        limit_projections,
        linear_subtype,
    }
}

fn classify_risk(metrics: &Metrics, current_rows: f64) -> RiskLevel {
    match metrics.complexity {
        ComplexityClass::Constant | ComplexityClass::Logarithmic | ComplexityClass::LogRange => RiskLevel::Low,
        ComplexityClass::Quadratic => {
            if metrics.is_intentional_scan {
                RiskLevel::Medium
            } else {
                RiskLevel::High
            }
        }
        ComplexityClass::Linear | ComplexityClass::Linearithmic => {
            if current_rows == 0.0 || (metrics.is_intentional_scan && current_rows < 10_000.0) {
                RiskLevel::Low
            } else if metrics.has_table_scan && !metrics.is_intentional_scan && current_rows > 10_000.0 {
                RiskLevel::High
            } else if metrics.is_intentional_scan {
                RiskLevel::Medium
            } else {
                RiskLevel::Medium
            }
        }
    }
}

fn classify_linear_subtype(metrics: &Metrics, sql: &SqlInfo) -> LinearSubtype {
    if metrics.is_intentional_scan && !sql.select_star && !sql.select_columns.is_empty() {
        LinearSubtype::ExportLinear
    } else if sql.has_group_by || sql.has_aggregation {
        LinearSubtype::AnalyticalLinear
    } else if metrics.has_table_scan && sql.predicates.iter().any(|p| p.kind == PredicateKind::Equality) {
        LinearSubtype::IndexMissedLinear
    } else {
        LinearSubtype::PathologicalLinear
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::extract;
    use crate::plan::parse_plan;
    use crate::sql::parse_sql;

    #[test]
    fn intentional_scan_caps_risk_at_medium() {
        let tree = parse_plan("-> Table scan on t1  (cost=1 rows=1000000) (actual time=0.1..258 rows=1000000 loops=1)");
        let mut metrics = extract(&tree, true);
        metrics.rows_returned = 1_000_000.0;
        let sql = parse_sql("SELECT id, name FROM t1");
        let est = project(&metrics, 1_000_000.0, 10_000_000.0, &sql);
        assert!(matches!(est.risk, RiskLevel::Low | RiskLevel::Medium));
    }

    #[test]
    fn range_only_predicate_is_pathological_not_index_missed() {
        let tree = parse_plan("-> Table scan on t1  (cost=1 rows=10000) (actual time=0.1..20 rows=10000 loops=1)");
        let metrics = extract(&tree, false);
        let sql = parse_sql("SELECT id FROM t1 WHERE amount BETWEEN 1 AND 100");
        let est = project(&metrics, 10_000.0, 100_000.0, &sql);
        assert_eq!(est.linear_subtype, Some(LinearSubtype::PathologicalLinear));
    }

    #[test]
    fn equality_predicate_table_scan_is_index_missed() {
        let tree = parse_plan("-> Table scan on t1  (cost=1 rows=10000) (actual time=0.1..20 rows=10000 loops=1)");
        let metrics = extract(&tree, false);
        let sql = parse_sql("SELECT id FROM t1 WHERE status='active'");
        let est = project(&metrics, 10_000.0, 100_000.0, &sql);
        assert_eq!(est.linear_subtype, Some(LinearSubtype::IndexMissedLinear));
    }

    #[test]
    fn constant_complexity_has_no_growth() {
        let tree = parse_plan("-> Zero rows (no matching row in const table)  (cost=0..0 rows=0) (actual time=0.003..0.003 rows=0 loops=1)");
        let metrics = extract(&tree, false);
        let sql = parse_sql("SELECT 1");
        let est = project(&metrics, 0.0, 1_000_000.0, &sql);
        assert_eq!(est.risk, RiskLevel::Low);
    }
}
