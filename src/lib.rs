//! A SQL query diagnostic engine: parses an `EXPLAIN ANALYZE`-style plan,
//! extracts structured metrics, and runs a suite of independent analyzers
//! (scoring, scalability, memory, concurrency, cardinality drift, plan
//! stability, anti-patterns, index synthesis, fanout, confidence,
//! regression-vs-baseline, and workload pattern detection) to produce a
//! single [`report::Report`].
//!
//! The core is single-call and deterministic: no component spawns threads
//! or tasks of its own. [`orchestrator::analyze`] is the entry point; the
//! only stateful collaborator is a [`regression::BaselineStore`] supplied
//! by the caller.

pub mod antipattern;
pub mod cancellation;
pub mod concurrency;
pub mod confidence;
pub mod config;
pub mod consistency;
pub mod drift;
pub mod environment;
pub mod error;
pub mod fanout;
pub mod finding;
pub mod index_synth;
pub mod memory;
pub mod metrics;
pub mod orchestrator;
pub mod plan;
pub mod regression;
pub mod report;
pub mod scalability;
pub mod scoring;
pub mod sql;
pub mod stability;
pub mod workload;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use environment::{EnvironmentContext, ExecutionProfile};
pub use error::{AnalysisError, AnalysisResult};
pub use finding::{Finding, Severity};
pub use orchestrator::{analyze, AnalysisRequest};
pub use report::Report;
