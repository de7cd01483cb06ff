//! Memory pressure analyzer (spec §4.5, C6): buffer-pool working-set model
//! grounded in physical page reads, never logical reads.

use crate::config::MemoryConfig;
use crate::environment::{EnvironmentContext, ExecutionProfile};
use crate::finding::{Finding, Severity};
use crate::metrics::{Metrics, RiskLevel};
use serde::{Deserialize, Serialize};

const BYTES_PER_ROW_ESTIMATE: f64 = 256.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkTransferClass {
    Low,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEstimate {
    pub sort_buffer_bytes: f64,
    pub join_buffer_bytes: f64,
    pub temp_table_bytes: f64,
    pub disk_spill_bytes: f64,
    pub buffer_pool_reads_bytes: f64,
    pub total_estimated_bytes: f64,
    pub buffer_pool_pressure: f64,
    pub concurrent_execution_memory: f64,
    pub concurrent_total: f64,
    pub network_transfer_estimate: f64,
    pub network_transfer_class: NetworkTransferClass,
    pub risk: RiskLevel,
    pub recommended_buffer_pool_gb: Option<u64>,
}

/// `join_count` is the number of joined tables (>=1); `sort_buffer_size`/
/// `tmp_table_size` come from the environment/server config when known.
pub fn analyze(
    metrics: &Metrics,
    env: &EnvironmentContext,
    profile: Option<&ExecutionProfile>,
    config: &MemoryConfig,
    join_count: u32,
    sort_buffer_size: u64,
) -> (MemoryEstimate, Vec<Finding>) {
    let sort_buffer_bytes = if metrics.has_filesort {
        (sort_buffer_size as f64).min(metrics.rows_examined * BYTES_PER_ROW_ESTIMATE)
    } else {
        0.0
    };

    let join_buffer_size = env.tmp_table_size as f64; // server exposes one pool size knob for both
    let join_buffer_bytes = (join_count as f64 - 1.0).max(0.0) * join_buffer_size;

    let temp_table_bytes = if metrics.has_temp_table {
        (env.tmp_table_size as f64).min(metrics.rows_examined * BYTES_PER_ROW_ESTIMATE)
    } else {
        0.0
    };

    let disk_spill_bytes = if metrics.has_disk_temp { metrics.rows_examined * BYTES_PER_ROW_ESTIMATE } else { 0.0 };

    let buffer_pool_reads_bytes = match profile {
        Some(p) if p.physical_reads > 0 => p.physical_reads as f64 * env.page_size as f64,
        _ => {
            let pages = (metrics.rows_examined * BYTES_PER_ROW_ESTIMATE / env.page_size as f64).ceil();
            pages * env.page_size as f64
        }
    };

    let total_estimated_bytes =
        sort_buffer_bytes + join_buffer_bytes + temp_table_bytes + disk_spill_bytes + buffer_pool_reads_bytes;

    let buffer_pool_pressure =
        round4(buffer_pool_reads_bytes / (env.buffer_pool_size_bytes as f64).max(1.0));

    let execution_memory = sort_buffer_bytes + join_buffer_bytes + temp_table_bytes + disk_spill_bytes;
    let concurrent_execution_memory = execution_memory * config.concurrent_sessions as f64;
    let concurrent_total = concurrent_execution_memory + buffer_pool_reads_bytes;

    let network_transfer_estimate = metrics.rows_returned * BYTES_PER_ROW_ESTIMATE;
    let mb = 1024.0 * 1024.0;
    let network_transfer_class = if network_transfer_estimate < 50.0 * mb {
        NetworkTransferClass::Low
    } else if network_transfer_estimate < 100.0 * mb {
        NetworkTransferClass::Moderate
    } else if network_transfer_estimate < 200.0 * mb {
        NetworkTransferClass::High
    } else {
        NetworkTransferClass::Critical
    };

    let risk = if buffer_pool_pressure > 0.5 || total_estimated_bytes > config.high_threshold_bytes as f64 {
        RiskLevel::High
    } else if (0.2..=0.5).contains(&buffer_pool_pressure) || total_estimated_bytes > config.moderate_threshold_bytes as f64 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let working_set_ratio = buffer_pool_reads_bytes / (env.buffer_pool_size_bytes as f64).max(1.0);
    let recommended_buffer_pool_gb = if working_set_ratio >= 0.3 {
        Some(((buffer_pool_reads_bytes / (1024.0 * 1024.0 * 1024.0)).ceil() as u64).max(1))
    } else {
        None
    };

    let mut findings = Vec::new();
    if network_transfer_estimate >= 200.0 * mb {
        findings.push(
            Finding::new(
                Severity::Critical,
                "memory",
                "Large result set transfer",
                format!("Query returns an estimated {:.0} MB to the client", network_transfer_estimate / mb),
            )
            .with_recommendation("Use a server-side cursor, chunked fetch, or a LIMIT clause"),
        );
    } else if network_transfer_estimate >= 100.0 * mb {
        findings.push(
            Finding::new(
                Severity::Warning,
                "memory",
                "Large result set transfer",
                format!("Query returns an estimated {:.0} MB to the client", network_transfer_estimate / mb),
            )
            .with_recommendation("Use a server-side cursor, chunked fetch, or a LIMIT clause"),
        );
    } else if network_transfer_estimate >= 50.0 * mb {
        findings.push(Finding::new(
            Severity::Optimization,
            "memory",
            "Large result set transfer",
            format!("Query returns an estimated {:.0} MB to the client", network_transfer_estimate / mb),
        ));
    }

    (
        MemoryEstimate {
            sort_buffer_bytes,
            join_buffer_bytes,
            temp_table_bytes,
            disk_spill_bytes,
            buffer_pool_reads_bytes,
            total_estimated_bytes,
            buffer_pool_pressure,
            concurrent_execution_memory,
            concurrent_total,
            network_transfer_estimate,
            network_transfer_class,
            risk,
            recommended_buffer_pool_gb,
        },
        findings,
    )
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::extract;
    use crate::plan::parse_plan;

    #[test]
    fn physical_reads_drive_buffer_pool_pressure() {
        let tree = parse_plan("-> Table scan on t1  (cost=1 rows=1000000) (actual time=0.1..50 rows=1000000 loops=1)");
        let metrics = extract(&tree, false);
        let mut env = EnvironmentContext::default();
        env.buffer_pool_size_bytes = 134_217_728;
        env.page_size = 16_384;
        let profile = ExecutionProfile { physical_reads: 3111, ..Default::default() };
        let (estimate, _) = analyze(&metrics, &env, Some(&profile), &MemoryConfig::default(), 1, 262_144);
        assert_eq!(estimate.buffer_pool_reads_bytes, 3111.0 * 16_384.0);
        assert_eq!(estimate.buffer_pool_pressure, 0.3796);
    }

    #[test]
    fn logical_reads_never_drive_the_estimate() {
        let tree = parse_plan("-> Table scan on t1  (cost=1 rows=10) (actual time=0.1..1.0 rows=10 loops=1)");
        let metrics = extract(&tree, false);
        let env = EnvironmentContext::default();
        let profile = ExecutionProfile { logical_reads: 999_999, physical_reads: 0, ..Default::default() };
        let (estimate, _) = analyze(&metrics, &env, Some(&profile), &MemoryConfig::default(), 1, 262_144);
        let expected_pages = (10.0 * 256.0 / env.page_size as f64).ceil() * env.page_size as f64;
        assert_eq!(estimate.buffer_pool_reads_bytes, expected_pages);
    }
}
