//! Scoring engine (spec §4.3, C4): five weighted sub-scores, size-aware
//! execution-time blend, context override, dataset dampening, and grading.

use crate::config::ScoringConfig;
use crate::metrics::{ComplexityClass, Metrics};
use crate::plan::AccessType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    F,
    D,
    C,
    B,
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    fn from_score(score: f64) -> Grade {
        if score >= 98.0 {
            Grade::APlus
        } else if score >= 90.0 {
            Grade::A
        } else if score >= 80.0 {
            Grade::B
        } else if score >= 70.0 {
            Grade::C
        } else if score >= 50.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub execution_time: f64,
    pub scan_efficiency: f64,
    pub index_quality: f64,
    pub join_efficiency: f64,
    pub scalability: f64,
    pub composite_score: f64,
    pub grade: Grade,
    pub context_override: bool,
    pub dataset_dampened: bool,
}

/// Size-aware execution-time sub-score (spec §4.3 "Execution-time scoring").
fn execution_time_score(metrics: &Metrics) -> f64 {
    let rows = metrics.rows_examined;
    if rows < 1000.0 {
        absolute_time_score(metrics.execution_time_ms)
    } else if rows > 10_000.0 {
        per_row_score(metrics)
    } else {
        let w = (rows - 1000.0) / 9000.0;
        let per_row = per_row_score(metrics);
        let absolute = absolute_time_score(metrics.execution_time_ms);
        w * per_row + (1.0 - w) * absolute
    }
}

fn absolute_time_score(t: f64) -> f64 {
    let score = if t <= 1.0 {
        100.0
    } else if t <= 10.0 {
        95.0
    } else if t <= 100.0 {
        90.0 - (t - 10.0) * 20.0 / 90.0
    } else if t <= 1000.0 {
        70.0 - (t - 100.0) * 20.0 / 900.0
    } else if t <= 5000.0 {
        50.0 - (t - 1000.0) * 20.0 / 4000.0
    } else if t <= 10_000.0 {
        30.0 - (t - 5000.0) * 20.0 / 5000.0
    } else if t <= 30_000.0 {
        10.0
    } else {
        0.0
    };
    score.round()
}

fn per_row_score(metrics: &Metrics) -> f64 {
    let expected_us_per_row = match metrics.primary_access_type {
        AccessType::TableScan | AccessType::IndexScan => 0.3,
        AccessType::IndexRangeScan => 0.2,
        AccessType::IndexLookup | AccessType::CoveringIndexLookup => 0.1,
        AccessType::SingleRowLookup => 0.05,
        AccessType::ConstRow | AccessType::ZeroRowConst => 0.01,
        _ => 0.3,
    };
    let actual_us_per_row = 1000.0 * metrics.execution_time_ms / metrics.rows_examined.max(1.0);
    let ratio = actual_us_per_row / expected_us_per_row;
    if ratio <= 1.0 {
        100.0
    } else if ratio <= 2.0 {
        95.0
    } else if ratio <= 5.0 {
        70.0
    } else if ratio <= 10.0 {
        50.0
    } else if ratio <= 50.0 {
        30.0
    } else {
        10.0
    }
}

fn scan_efficiency_score(metrics: &Metrics) -> f64 {
    if metrics.rows_examined == 0.0 {
        // Nothing was read at all (e.g. zero_row_const short-circuit) — no
        // waste occurred, so this is perfectly selective rather than 0.
        return 100.0;
    }
    let selectivity = metrics.rows_returned / metrics.rows_examined.max(1.0);
    (100.0 * selectivity).round().min(100.0)
}

fn index_quality_score(metrics: &Metrics) -> f64 {
    if matches!(
        metrics.primary_access_type,
        AccessType::ConstRow | AccessType::SingleRowLookup | AccessType::ZeroRowConst
    ) {
        return 100.0;
    }
    let mut score: f64 = 100.0;
    if metrics.has_table_scan && !metrics.is_intentional_scan {
        score -= 70.0;
    }
    if !metrics.has_covering_index {
        score -= 15.0;
    }
    score.max(0.0)
}

fn join_efficiency_score(metrics: &Metrics) -> f64 {
    let depth = metrics.nested_loop_depth;
    let mut score: f64 = match depth {
        0..=2 => 100.0,
        3 => 80.0,
        4 => 60.0,
        _ => 40.0,
    };
    if metrics.fanout_factor > 10_000.0 && depth > 0 {
        score -= 30.0;
    }
    if metrics.has_weedout {
        score -= 15.0;
    }
    score.max(0.0)
}

fn scalability_score(metrics: &Metrics) -> f64 {
    let base = match metrics.complexity {
        ComplexityClass::Constant => 100.0,
        ComplexityClass::Logarithmic => 90.0,
        ComplexityClass::LogRange => 80.0,
        ComplexityClass::Linear => 50.0,
        ComplexityClass::Linearithmic => 30.0,
        ComplexityClass::Quadratic => 10.0,
    };
    let bumped = if metrics.has_early_termination { base + 20.0 } else { base };
    bumped.min(100.0)
}

/// Compute the full composite score, applying the context override and
/// dataset dampening adjustments described in spec §4.3.
pub fn score(metrics: &Metrics, weights: &ScoringConfig) -> ScoreBreakdown {
    let w = &weights.weights;
    let execution_time = execution_time_score(metrics);
    let scan_efficiency = scan_efficiency_score(metrics);
    let index_quality = index_quality_score(metrics);
    let join_efficiency = join_efficiency_score(metrics);
    let scalability = scalability_score(metrics);

    let mut composite = w.execution_time * execution_time
        + w.scan_efficiency * scan_efficiency
        + w.index_quality * index_quality
        + w.join_efficiency * join_efficiency
        + w.scalability * scalability;

    let mut context_override = false;
    let optimal_access_fast = matches!(
        metrics.primary_access_type,
        AccessType::ConstRow | AccessType::SingleRowLookup | AccessType::ZeroRowConst
    ) && metrics.execution_time_ms < 10.0;
    let intentional_and_efficient =
        metrics.is_intentional_scan && (metrics.has_covering_index || metrics.complexity == ComplexityClass::Constant);
    if composite < 95.0 && (optimal_access_fast || intentional_and_efficient) {
        composite = composite.max(95.0).min(95.0);
        context_override = true;
    }

    let mut dataset_dampened = false;
    if metrics.is_intentional_scan && metrics.rows_examined > 10_000.0 {
        let max_allowed = 98.0 - (metrics.rows_examined / 10_000.0).log10() * 2.0;
        if composite > max_allowed {
            composite = max_allowed;
        }
        dataset_dampened = true;
    }

    let composite_score = composite.clamp(0.0, 100.0);
    let grade = Grade::from_score(composite_score);

    ScoreBreakdown {
        execution_time,
        scan_efficiency,
        index_quality,
        join_efficiency,
        scalability,
        composite_score,
        grade,
        context_override,
        dataset_dampened,
    }
}

/// Post-hoc confidence gate (spec §4.3): low confidence or any Critical
/// finding caps both the numeric score and the letter grade.
pub fn apply_confidence_gate(breakdown: &mut ScoreBreakdown, confidence: f64, has_critical_finding: bool) {
    if confidence < 0.5 {
        breakdown.composite_score = breakdown.composite_score.min(50.0);
        breakdown.grade = breakdown.grade.min(Grade::C);
    } else if confidence < 0.7 {
        breakdown.composite_score = breakdown.composite_score.min(75.0);
        breakdown.grade = breakdown.grade.min(Grade::B);
    }
    if has_critical_finding {
        breakdown.composite_score = breakdown.composite_score.min(75.0);
        breakdown.grade = breakdown.grade.min(Grade::B);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::metrics::extract;
    use crate::plan::parse_plan;

    #[test]
    fn zero_row_const_grades_a_plus() {
        let tree = parse_plan("-> Zero rows (no matching row in const table)  (cost=0..0 rows=0) (actual time=0.003..0.003 rows=0 loops=1)");
        let metrics = extract(&tree, false);
        let breakdown = score(&metrics, &ScoringConfig::default());
        assert_eq!(breakdown.grade, Grade::APlus);
        assert!(breakdown.composite_score >= 98.0);
        assert_eq!(breakdown.index_quality, 100.0);
        assert_eq!(breakdown.scalability, 100.0);
    }

    #[test]
    fn large_intentional_scan_is_dampened() {
        let mut metrics_text = String::new();
        metrics_text.push_str("-> Table scan on t1  (cost=1 rows=1000000) (actual time=0.01..258 rows=1000000 loops=1)");
        let tree = parse_plan(&metrics_text);
        let mut metrics = extract(&tree, true);
        metrics.rows_returned = 1_000_000.0;
        let breakdown = score(&metrics, &ScoringConfig::default());
        assert!(breakdown.dataset_dampened);
        assert!(breakdown.composite_score <= 94.0);
        assert_eq!(breakdown.scalability, 50.0);
    }

    #[test]
    fn confidence_gate_caps_grade() {
        let tree = parse_plan("-> Zero rows (no matching row in const table)  (cost=0..0 rows=0) (actual time=0.003..0.003 rows=0 loops=1)");
        let metrics = extract(&tree, false);
        let mut breakdown = score(&metrics, &ScoringConfig::default());
        apply_confidence_gate(&mut breakdown, 0.4, false);
        assert!(breakdown.composite_score <= 50.0);
        assert_eq!(breakdown.grade, Grade::C);
    }
}
