//! Cooperative cancellation and timeout budget (spec §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wall-clock budget enforced by the orchestrator at each component
/// boundary (spec §5 "Timeouts", default 2000ms).
pub struct Budget {
    start: Instant,
    limit_ms: u64,
}

impl Budget {
    pub fn new(limit_ms: u64) -> Self {
        Self { start: Instant::now(), limit_ms }
    }

    pub fn expired(&self) -> bool {
        self.start.elapsed().as_millis() as u64 >= self.limit_ms
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new(2000)
    }
}
