//! Error types for the diagnostic engine.
//!
//! Two enums, mirroring the parser/public split the teacher crate uses
//! (`services/profile_analyzer/parser/error.rs`): an internal parse-error
//! reason that never escapes the public API, and the public error surface
//! that only carries the kinds explicitly allowed to propagate (spec §7).

use thiserror::Error;

/// Internal reasons the plan parser did not produce a usable tree.
///
/// Never returned from [`crate::plan::parse_plan`] — it always returns a
/// `PlanTree`, falling back to an empty one with `parsing_valid=false` on
/// failure. This type exists so the fallback path can be logged with a
/// specific reason instead of a bare string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanParseError {
    #[error("plan text is empty")]
    EmptyInput,
    #[error("no node carried a measurement or estimate block")]
    NoMeasuredNodes,
}

/// The public error surface of the engine.
///
/// Per spec §7, analyzers never panic on data defects — they downgrade
/// fidelity and emit an `Info`/`Warning` finding instead. Only
/// constructor-time misconfiguration and caller-initiated cancellation or
/// timeout propagate out of the core as `Err`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis cancelled")]
    Cancelled,
    #[error("analysis budget exceeded")]
    Timeout,
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
