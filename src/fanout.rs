//! Join/fanout analyzer (spec §4.11, C12).

use crate::finding::{Finding, Severity};
use crate::plan::{AccessType, PlanTree};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutTier {
    Contained,
    LinearAmplification,
    MultiplicativeRisk,
    ExponentialExplosion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutStep {
    pub table: Option<String>,
    pub rows: f64,
    pub loops: f64,
    pub step_fanout: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutReport {
    pub per_step: Vec<FanoutStep>,
    pub effective_fanout: f64,
    pub explosion_factor: f64,
    pub tier: FanoutTier,
    pub lookup_efficiency: f64,
}

pub fn analyze(tree: &PlanTree) -> (FanoutReport, Vec<Finding>) {
    let mut per_step = Vec::new();
    let mut effective_fanout = 1.0_f64;
    let mut findings = Vec::new();
    let mut has_hash_join = false;
    let mut has_block_nested_loop = false;

    if let Some(root) = &tree.root {
        for n in root.flatten() {
            if n.access_type == AccessType::HashJoin {
                has_hash_join = true;
            }
            if n.access_type == AccessType::BlockNestedLoop {
                has_block_nested_loop = true;
            }
            if n.has_measurement() {
                let rows = n.actual_rows.unwrap_or(0.0);
                let loops = n.loops.unwrap_or(1.0);
                let step_fanout = rows * loops;
                effective_fanout *= step_fanout.max(1.0);
                per_step.push(FanoutStep { table: n.table.clone(), rows, loops, step_fanout });
            }
        }
    }

    let driving_step_fanout = per_step.first().map(|s| s.step_fanout).unwrap_or(1.0);
    let explosion_factor = effective_fanout / driving_step_fanout.max(1.0);

    let tier = if explosion_factor <= 10.0 {
        FanoutTier::Contained
    } else if explosion_factor <= 100.0 {
        FanoutTier::LinearAmplification
    } else if explosion_factor <= 1000.0 {
        FanoutTier::MultiplicativeRisk
    } else {
        FanoutTier::ExponentialExplosion
    };

    match tier {
        FanoutTier::MultiplicativeRisk => findings.push(Finding::new(
            Severity::Warning,
            "fanout",
            "Multiplicative row amplification",
            format!("Join fanout explodes by a factor of {explosion_factor:.1}x across steps"),
        )),
        FanoutTier::ExponentialExplosion => findings.push(Finding::new(
            Severity::Critical,
            "fanout",
            "Exponential row explosion",
            format!("Join fanout explodes by a factor of {explosion_factor:.1}x across steps"),
        )),
        _ => {}
    }

    if has_hash_join {
        findings.push(Finding::new(Severity::Info, "fanout", "Hash join in use", "Optimizer chose a hash join for this join"));
    }
    if has_block_nested_loop {
        findings.push(Finding::new(
            Severity::Warning,
            "fanout",
            "Block Nested Loop join",
            "Block Nested Loop indicates no usable index for the join condition",
        ).with_recommendation("Add an index on the join column(s)"));
    }

    let lookup_efficiency = if effective_fanout > 0.0 { 1.0 / effective_fanout.max(1.0) } else { 1.0 };

    (FanoutReport { per_step, effective_fanout, explosion_factor, tier, lookup_efficiency }, findings)
}
