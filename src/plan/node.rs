//! Plan tree node (spec §3 `PlanNode`).

use super::access_type::AccessType;
use serde::{Deserialize, Serialize};

/// One operator in the parsed plan tree.
///
/// Built once by [`super::parser::parse_plan`] and never mutated afterward,
/// per the lifecycle rule in spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanNode {
    pub operation: String,
    pub raw_line: String,
    pub access_type: AccessType,
    pub table: Option<String>,
    pub index: Option<String>,
    pub estimated_cost: Option<f64>,
    pub estimated_rows: Option<f64>,
    pub actual_time_start: Option<f64>,
    pub actual_time_end: Option<f64>,
    pub actual_rows: Option<f64>,
    pub loops: Option<f64>,
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    pub fn new(operation: impl Into<String>, raw_line: impl Into<String>, access_type: AccessType) -> Self {
        Self {
            operation: operation.into(),
            raw_line: raw_line.into(),
            access_type,
            table: None,
            index: None,
            estimated_cost: None,
            estimated_rows: None,
            actual_time_start: None,
            actual_time_end: None,
            actual_rows: None,
            loops: None,
            children: Vec::new(),
        }
    }

    /// True iff this node carried a measurement triple. A `never executed`
    /// node (or one with no `(actual time=...)` block at all) has none, and
    /// its subtree contributes 0 to examined rows (spec §3).
    pub fn has_measurement(&self) -> bool {
        self.actual_rows.is_some() && self.loops.is_some()
    }

    pub fn actual_rows_times_loops(&self) -> f64 {
        match (self.actual_rows, self.loops) {
            (Some(r), Some(l)) => r * l,
            _ => 0.0,
        }
    }

    /// Depth-first pre-order walk over this node and its whole subtree.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a PlanNode)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Collect every node in the subtree rooted at `self`, pre-order.
    pub fn flatten(&self) -> Vec<&PlanNode> {
        let mut out = Vec::new();
        self.walk(&mut |n| out.push(n));
        out
    }

    /// Maximum nesting depth of `NestedLoop`/`HashJoin`/`BlockNestedLoop`
    /// operators in this subtree (0 if none).
    pub fn join_depth(&self) -> u32 {
        fn go(node: &PlanNode, depth: u32) -> u32 {
            let here = match node.access_type {
                AccessType::NestedLoop | AccessType::HashJoin | AccessType::BlockNestedLoop => depth + 1,
                _ => depth,
            };
            node.children.iter().map(|c| go(c, here)).max().unwrap_or(here)
        }
        go(self, 0)
    }
}

/// The parsed plan: its root, or nothing if parsing failed entirely.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanTree {
    pub root: Option<PlanNode>,
    pub parsing_valid: bool,
}

impl PlanTree {
    pub fn nodes(&self) -> Vec<&PlanNode> {
        self.root.as_ref().map(|r| r.flatten()).unwrap_or_default()
    }
}
