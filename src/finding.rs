//! Findings and severities shared across every analyzer (spec §3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Optimization,
    Warning,
    Critical,
}

/// One observation produced by an analyzer.
///
/// Equality for dedup purposes is `(category, title, recommendation)` per
/// spec §3 — deliberately excludes `severity`/`metadata` so two findings that
/// differ only in detail still collapse under [`crate::orchestrator::dedup`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Finding {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            title: title.into(),
            description: description.into(),
            recommendation: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The `(category, title, recommendation)` dedup key.
    pub fn dedup_key(&self) -> (String, String, Option<String>) {
        (self.category.clone(), self.title.clone(), self.recommendation.clone())
    }
}
