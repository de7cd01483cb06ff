//! Access type classification (spec §3 `AccessType`).

use serde::{Deserialize, Serialize};

/// How one table (or join/flow step) is read by a single plan node.
///
/// I/O node membership and physical-severity ordering follow spec §3 exactly.
/// `IndexMerge` is listed as an I/O node type by the plan-node invariant but is
/// not named in the explicit severity chain; it is ranked worse than
/// `TableScan` here (merging multiple range scans costs more than one table
/// scan in practice) — see DESIGN.md for this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    ZeroRowConst,
    ConstRow,
    SingleRowLookup,
    CoveringIndexLookup,
    IndexLookup,
    FulltextIndex,
    IndexRangeScan,
    IndexScan,
    TableScan,
    IndexMerge,
    NestedLoop,
    HashJoin,
    BlockNestedLoop,
    Limit,
    Sort,
    Materialize,
    Filter,
    Unknown,
}

impl AccessType {
    /// Physical-access severity for I/O node types, `None` for flow operators.
    /// Lower is better. `IndexLookup` and `FulltextIndex` are tied (spec: `≈`).
    pub fn io_severity(self) -> Option<u8> {
        use AccessType::*;
        match self {
            ZeroRowConst => Some(0),
            ConstRow => Some(1),
            SingleRowLookup => Some(2),
            CoveringIndexLookup => Some(3),
            IndexLookup | FulltextIndex => Some(4),
            IndexRangeScan => Some(5),
            IndexScan => Some(6),
            TableScan => Some(7),
            IndexMerge => Some(8),
            _ => None,
        }
    }

    pub fn is_io_node(self) -> bool {
        self.io_severity().is_some()
    }

    /// Per-driver access-type normalization target (spec §4.2 `mysql_access_type`).
    pub fn to_mysql_access_type(self) -> &'static str {
        use AccessType::*;
        match self {
            ConstRow | ZeroRowConst => "const",
            SingleRowLookup => "eq_ref",
            IndexLookup | CoveringIndexLookup => "ref",
            FulltextIndex => "fulltext",
            IndexRangeScan => "range",
            IndexScan => "index",
            TableScan => "ALL",
            _ => "unknown",
        }
    }

    /// True for the access types the scoring/index-synth/concurrency layers
    /// treat as "already optimal" — no table scan, const-time or
    /// single-row lookups.
    pub fn is_optimal(self) -> bool {
        matches!(self, AccessType::ConstRow | AccessType::ZeroRowConst | AccessType::SingleRowLookup)
    }

    /// Best-effort classification from raw driver-reported text, used when a
    /// [`crate::plan::PlanNode`] didn't already carry a typed access type
    /// (e.g. when built directly from a driver's `normalizeAccessType`).
    pub fn from_driver_str(s: &str) -> AccessType {
        match s.to_ascii_lowercase().as_str() {
            "const" | "system" => AccessType::ConstRow,
            "eq_ref" => AccessType::SingleRowLookup,
            "ref" => AccessType::IndexLookup,
            "fulltext" => AccessType::FulltextIndex,
            "range" => AccessType::IndexRangeScan,
            "index" => AccessType::IndexScan,
            "all" => AccessType::TableScan,
            "index_merge" => AccessType::IndexMerge,
            _ => AccessType::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_chain_is_monotone() {
        let chain = [
            AccessType::ZeroRowConst,
            AccessType::ConstRow,
            AccessType::SingleRowLookup,
            AccessType::CoveringIndexLookup,
            AccessType::IndexLookup,
            AccessType::IndexRangeScan,
            AccessType::IndexScan,
            AccessType::TableScan,
        ];
        for w in chain.windows(2) {
            assert!(w[0].io_severity().unwrap() < w[1].io_severity().unwrap());
        }
    }

    #[test]
    fn index_lookup_and_fulltext_tie() {
        assert_eq!(AccessType::IndexLookup.io_severity(), AccessType::FulltextIndex.io_severity());
    }

    #[test]
    fn flow_operators_are_not_io_nodes() {
        for t in [AccessType::NestedLoop, AccessType::HashJoin, AccessType::Limit, AccessType::Sort] {
            assert!(!t.is_io_node());
        }
    }
}
