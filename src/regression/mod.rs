//! Regression baseline analysis (C14) and its sole stateful collaborator,
//! the baseline store (spec §3, §5, §6).

mod analyzer;
mod baseline_store;

pub use analyzer::{analyze, MetricRegression, RegressionReport, TrendLabel};
pub use baseline_store::{BaselineSnapshot, BaselineStore, FileBaselineStore, StoreError};
