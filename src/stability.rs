//! Plan stability analyzer (spec §4.8, C9): volatility from per-node
//! estimate/actual deviation, optimizer hints, and drift contribution.

use crate::drift::DriftReport;
use crate::plan::PlanTree;
use crate::sql::SqlInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityLabel {
    Stable,
    Moderate,
    Volatile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityReport {
    pub volatility_score: i32,
    pub label: StabilityLabel,
    pub drift_contributors: Vec<String>,
    pub is_risky: bool,
}

fn has_optimizer_hint(sql_text: &str) -> bool {
    let upper = sql_text.to_ascii_uppercase();
    upper.contains("FORCE INDEX") || upper.contains("USE INDEX") || upper.contains("STRAIGHT_JOIN")
}

pub fn analyze(tree: &PlanTree, sql_text: &str, _sql: &SqlInfo, drift: Option<&DriftReport>) -> StabilityReport {
    let mut score: f64 = 0.0;
    if let Some(root) = &tree.root {
        for n in root.flatten() {
            if let (Some(est), Some(actual)) = (n.estimated_rows, n.actual_rows) {
                let factor = est.max(actual) / est.min(actual).max(1.0);
                score += (factor * 5.0).min(25.0);
            }
        }
    }

    if has_optimizer_hint(sql_text) {
        score -= 20.0;
    }

    if let Some(d) = drift {
        score += (d.composite_drift * 30.0).round();
    }

    let volatility_score = score.clamp(0.0, 100.0).round() as i32;
    let label = if volatility_score < 30 {
        StabilityLabel::Stable
    } else if volatility_score < 60 {
        StabilityLabel::Moderate
    } else {
        StabilityLabel::Volatile
    };

    let drift_contributors = drift
        .map(|d| d.per_table.iter().filter(|t| t.drift > 0.5).map(|t| t.table.clone()).collect())
        .unwrap_or_default();

    StabilityReport {
        volatility_score,
        label,
        drift_contributors,
        is_risky: label == StabilityLabel::Volatile,
    }
}
