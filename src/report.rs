//! The final report shape (spec §3 `Report`).

use crate::confidence::ConfidenceReport;
use crate::finding::Finding;
use crate::metrics::Metrics;
use crate::scoring::ScoreBreakdown;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The `result` carrier inside [`Report`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub sql: String,
    pub driver: String,
    pub plan_text: String,
    pub metrics: Metrics,
    pub scores: ScoreBreakdown,
    pub findings: Vec<Finding>,
    pub execution_time_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub findings: Vec<Finding>,
    pub confidence: ConfidenceReport,
    pub consistency_violations: Vec<String>,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub result: AnalysisResult,
    pub grade: String,
    /// No Critical findings remain after suppression (spec §3).
    pub passed: bool,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub composite_score: f64,
    pub analyzed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}
