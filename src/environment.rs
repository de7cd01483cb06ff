//! Engine-reported and caller-supplied context carriers (spec §3).

use serde::{Deserialize, Serialize};

/// Optional engine-reported resource counters, when the driver exposes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionProfile {
    pub nested_loop_depth: u32,
    pub join_fanouts: Vec<f64>,
    pub btree_depths: Vec<u32>,
    pub logical_reads: u64,
    pub physical_reads: u64,
    pub scan_complexity: Option<String>,
    pub sort_complexity: Option<String>,
}

/// Immutable snapshot of the server/session the plan ran under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentContext {
    pub server_version: String,
    pub buffer_pool_size_bytes: u64,
    pub io_capacity: u32,
    pub page_size: u64,
    pub tmp_table_size: u64,
    pub max_heap_table_size: u64,
    pub buffer_pool_utilization: f64,
    pub is_cold_cache: bool,
    pub database_name: String,
}

impl Default for EnvironmentContext {
    fn default() -> Self {
        Self {
            server_version: "unknown".to_string(),
            buffer_pool_size_bytes: 134_217_728,
            io_capacity: 200,
            page_size: 16_384,
            tmp_table_size: 16 * 1024 * 1024,
            max_heap_table_size: 16 * 1024 * 1024,
            buffer_pool_utilization: 0.0,
            is_cold_cache: false,
            database_name: String::new(),
        }
    }
}
