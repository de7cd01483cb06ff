//! Configuration surface (spec §6).
//!
//! Mirrors the teacher's `config.rs`: a top-level `Config` composed of
//! per-concern nested structs, each `Deserialize` with `#[serde(default)]`
//! so a partial TOML file is enough. `CommandLineArgs` lets the demo binary
//! override the config path, the same way the teacher's `CommandLineArgs`
//! overrides its server config from the CLI.

use crate::error::{AnalysisError, AnalysisResult};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub regression: RegressionConfig,
    pub memory: MemoryConfig,
    pub drift: DriftConfig,
    pub anti_pattern: AntiPatternConfig,
    pub index_synth: IndexSynthConfig,
    pub workload: WorkloadConfig,
    pub baseline_store: BaselineStoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            regression: RegressionConfig::default(),
            memory: MemoryConfig::default(),
            drift: DriftConfig::default(),
            anti_pattern: AntiPatternConfig::default(),
            index_synth: IndexSynthConfig::default(),
            workload: WorkloadConfig::default(),
            baseline_store: BaselineStoreConfig::default(),
        }
    }
}

impl Config {
    /// Load a config from a TOML file, falling back to defaults for any
    /// section the file omits. Validates at the end (weights must sum to 1.0).
    pub fn load(path: &Path) -> AnalysisResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| AnalysisError::ConfigurationInvalid(format!("{}: {e}", path.display())))?;
        let cfg: Config = toml::from_str(&text)
            .map_err(|e| AnalysisError::ConfigurationInvalid(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        self.scoring.validate()
    }
}

/// Weights for the five sub-scores that make up the composite score (§4.3).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { weights: ScoringWeights::default() }
    }
}

impl ScoringConfig {
    fn validate(&self) -> AnalysisResult<()> {
        let w = &self.weights;
        let sum = w.execution_time + w.scan_efficiency + w.index_quality + w.join_efficiency + w.scalability;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(AnalysisError::ConfigurationInvalid(format!(
                "scoring weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub execution_time: f64,
    pub scan_efficiency: f64,
    pub index_quality: f64,
    pub join_efficiency: f64,
    pub scalability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            execution_time: 0.35,
            scan_efficiency: 0.20,
            index_quality: 0.15,
            join_efficiency: 0.10,
            scalability: 0.20,
        }
    }
}

/// Regression baseline thresholds (§4.13).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub score_warning_threshold_pct: f64,
    pub score_critical_threshold_pct: f64,
    pub absolute_score_threshold: f64,
    pub time_warning_threshold_pct: f64,
    pub time_critical_threshold_pct: f64,
    pub absolute_time_threshold_ms: f64,
    pub noise_floor_ms: f64,
    pub minimum_measurable_ms: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            score_warning_threshold_pct: 10.0,
            score_critical_threshold_pct: 25.0,
            absolute_score_threshold: 5.0,
            time_warning_threshold_pct: 50.0,
            time_critical_threshold_pct: 200.0,
            absolute_time_threshold_ms: 5.0,
            noise_floor_ms: 3.0,
            minimum_measurable_ms: 5.0,
        }
    }
}

/// Memory pressure thresholds and concurrency multiplier (§4.5).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub high_threshold_bytes: u64,
    pub moderate_threshold_bytes: u64,
    pub concurrent_sessions: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            high_threshold_bytes: 256 * 1024 * 1024,
            moderate_threshold_bytes: 64 * 1024 * 1024,
            concurrent_sessions: 1,
        }
    }
}

/// Cardinality drift thresholds (§4.7).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub warning_threshold: f64,
    pub critical_threshold: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self { warning_threshold: 0.5, critical_threshold: 0.9 }
    }
}

/// Anti-pattern detector thresholds (§4.9).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AntiPatternConfig {
    pub or_chain_threshold: usize,
    pub missing_limit_row_threshold: u64,
}

impl Default for AntiPatternConfig {
    fn default() -> Self {
        Self { or_chain_threshold: 3, missing_limit_row_threshold: 1000 }
    }
}

/// Index synthesizer caps (§4.10).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexSynthConfig {
    pub max_recommendations: usize,
    pub max_columns_per_index: usize,
}

impl Default for IndexSynthConfig {
    fn default() -> Self {
        Self { max_recommendations: 3, max_columns_per_index: 5 }
    }
}

/// Workload pattern thresholds (§4.14).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub frequency_threshold: usize,
    pub export_row_threshold: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self { frequency_threshold: 5, export_row_threshold: 100_000 }
    }
}

/// Baseline store layout and retention (§6).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaselineStoreConfig {
    pub directory: String,
    pub max_snapshots_per_hash: usize,
    pub prune_max_age_days: i64,
}

impl Default for BaselineStoreConfig {
    fn default() -> Self {
        Self {
            directory: "baselines".to_string(),
            max_snapshots_per_hash: 100,
            prune_max_age_days: 90,
        }
    }
}

/// Command line overrides for the demo binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "sql-diag")]
#[command(version, about = "SQL query diagnostic engine")]
pub struct CommandLineArgs {
    /// Path to a TOML config file. Defaults are used for anything it omits.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Path to the SQL statement file.
    #[arg(long, value_name = "PATH")]
    pub sql: String,

    /// Path to the plan-text file (MySQL `EXPLAIN ANALYZE`-style tree).
    #[arg(long, value_name = "PATH")]
    pub plan: String,

    /// Optional baseline store directory override.
    #[arg(long, value_name = "PATH")]
    pub baseline_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        Config::default().validate().expect("default config must validate");
    }

    #[test]
    fn unbalanced_weights_are_rejected() {
        let mut cfg = Config::default();
        cfg.scoring.weights.execution_time = 0.9;
        assert!(cfg.validate().is_err());
    }
}
