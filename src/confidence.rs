//! Confidence scorer (spec §4.12, C13): eight weighted factors summarizing
//! how much the rest of the report's numbers should be trusted.

use crate::drift::DriftReport;
use crate::environment::EnvironmentContext;
use crate::metrics::Metrics;
use crate::plan::AccessType;
use crate::stability::StabilityReport;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
    Unreliable,
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceFactors {
    pub estimation_accuracy: f64,
    pub sample_size: f64,
    pub explain_analyze: f64,
    pub cache_warmth: f64,
    pub statistics_freshness: f64,
    pub plan_stability: f64,
    pub query_complexity: f64,
    pub driver_capabilities: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub factors: ConfidenceFactors,
    pub overall: f64,
    pub label: ConfidenceLabel,
    pub notes: Vec<String>,
}

const WEIGHTS: ConfidenceFactors = ConfidenceFactors {
    estimation_accuracy: 0.25,
    sample_size: 0.20,
    explain_analyze: 0.15,
    cache_warmth: 0.10,
    statistics_freshness: 0.10,
    plan_stability: 0.10,
    query_complexity: 0.05,
    driver_capabilities: 0.05,
};

pub fn analyze(
    metrics: &Metrics,
    drift: &DriftReport,
    stability: &StabilityReport,
    env: Option<&EnvironmentContext>,
    supports_analyze: bool,
    join_count: u32,
) -> ConfidenceReport {
    let mut notes = Vec::new();

    let estimation_accuracy = (1.0 - drift.composite_drift).max(0.0);
    if drift.composite_drift > 0.5 {
        notes.push("High drift between estimated and actual row counts".to_string());
    }

    let sample_size = if matches!(
        metrics.primary_access_type,
        AccessType::ConstRow | AccessType::ZeroRowConst | AccessType::SingleRowLookup
    ) {
        notes.push("Deterministic access path; sample size is not a factor".to_string());
        1.0
    } else {
        (metrics.rows_examined / 1000.0).min(1.0)
    };

    let explain_analyze = if supports_analyze { 1.0 } else { 0.3 };
    let cache_warmth = env.map(|e| if e.is_cold_cache { 0.5 } else { 1.0 }).unwrap_or(0.5);

    let tables_accessed = metrics.tables_accessed.len().max(1);
    let statistics_freshness =
        1.0 - (drift.tables_needing_analyze.len() as f64 / tables_accessed as f64).min(1.0);

    let plan_stability = if stability.is_risky { 0.5 } else { 1.0 };

    let query_complexity = if join_count >= 5 {
        0.7
    } else if join_count >= 3 {
        0.85
    } else {
        1.0
    };

    let driver_capabilities = if supports_analyze { 1.0 } else { 0.6 };

    let factors = ConfidenceFactors {
        estimation_accuracy,
        sample_size,
        explain_analyze,
        cache_warmth,
        statistics_freshness,
        plan_stability,
        query_complexity,
        driver_capabilities,
    };

    let overall = WEIGHTS.estimation_accuracy * factors.estimation_accuracy
        + WEIGHTS.sample_size * factors.sample_size
        + WEIGHTS.explain_analyze * factors.explain_analyze
        + WEIGHTS.cache_warmth * factors.cache_warmth
        + WEIGHTS.statistics_freshness * factors.statistics_freshness
        + WEIGHTS.plan_stability * factors.plan_stability
        + WEIGHTS.query_complexity * factors.query_complexity
        + WEIGHTS.driver_capabilities * factors.driver_capabilities;

    let label = if overall < 0.5 {
        ConfidenceLabel::Unreliable
    } else if overall < 0.7 {
        ConfidenceLabel::Low
    } else if overall < 0.9 {
        ConfidenceLabel::Moderate
    } else {
        ConfidenceLabel::High
    };

    ConfidenceReport { factors, overall, label, notes }
}
