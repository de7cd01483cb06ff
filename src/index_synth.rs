//! Index synthesizer (spec §4.10, C11): applies the Equality-Range-Sort
//! column ordering rule and assesses recommendations against any indexes
//! the caller already knows about.

use crate::config::IndexSynthConfig;
use crate::metrics::Metrics;
use crate::plan::AccessType;
use crate::sql::{Predicate, PredicateKind, SqlInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    Single,
    Composite,
    Covering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingIndexAssessment {
    Optimal,
    Suboptimal,
    Redundant,
    Unused,
}

/// An index the caller already knows exists (from schema introspection).
/// The core never queries a schema itself — spec §6 treats this as an
/// external, optional collaborator's data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingIndex {
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecommendation {
    pub table: String,
    pub columns: Vec<String>,
    pub index_type: IndexType,
    pub ddl: String,
    pub estimated_improvement: ImprovementTier,
    pub overlaps_with: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingIndexReport {
    pub table: String,
    pub name: String,
    pub assessment: ExistingIndexAssessment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSynthesisReport {
    pub recommendations: Vec<IndexRecommendation>,
    pub existing: Vec<ExistingIndexReport>,
}

/// Never emit for access already optimal (spec §4.10 rule 7).
fn is_already_optimal(metrics: &Metrics) -> bool {
    matches!(
        metrics.primary_access_type,
        AccessType::ConstRow | AccessType::SingleRowLookup | AccessType::ZeroRowConst
    )
}

fn table_name(t: &crate::sql::TableRef) -> Option<&str> {
    t.name.as_deref()
}

pub fn analyze(
    sql: &SqlInfo,
    metrics: &Metrics,
    existing_indexes: &[ExistingIndex],
    config: &IndexSynthConfig,
) -> IndexSynthesisReport {
    if is_already_optimal(metrics) {
        return IndexSynthesisReport { recommendations: Vec::new(), existing: Vec::new() };
    }

    let mut recommendations = Vec::new();

    for table_ref in &sql.tables {
        let Some(table) = table_name(table_ref) else { continue };

        let equality: Vec<String> = predicates_for(sql, PredicateKind::Equality);
        let range: Vec<String> = predicates_for(sql, PredicateKind::Range)
            .into_iter()
            .chain(predicates_for(sql, PredicateKind::Between))
            .chain(predicates_for(sql, PredicateKind::In))
            .collect();
        let sort: Vec<String> = sql.order_by.clone();

        if equality.is_empty() && range.is_empty() && sort.is_empty() {
            continue;
        }

        let mut columns = Vec::new();
        let mut seen = HashSet::new();
        for c in equality.iter().chain(range.iter()).chain(sort.iter()) {
            if seen.insert(c.clone()) {
                columns.push(c.clone());
            }
        }
        columns.truncate(config.max_columns_per_index);

        // Only columns explicitly qualified to this table count as "on this
        // table" for the covering extension; an unqualified column in a
        // single-table query is ambiguous with implicit row-identifier
        // columns that every index carries for free, so it falls through to
        // composite/single instead (spec Scenario 8).
        let table_prefix = format!("{table}.");
        let is_covering_candidate = !sql.select_star
            && !sql.select_columns.is_empty()
            && sql.select_columns.iter().all(|c| c.starts_with(&table_prefix));

        let index_type = if is_covering_candidate {
            columns.extend(sql.select_columns.iter().cloned());
            let mut dedup = HashSet::new();
            columns.retain(|c| dedup.insert(c.clone()));
            columns.truncate(config.max_columns_per_index.max(columns.len().min(config.max_columns_per_index)));
            IndexType::Covering
        } else if equality.len() == 1 && range.is_empty() && sort.is_empty() {
            IndexType::Single
        } else {
            IndexType::Composite
        };

        let mut improvement = if metrics.rows_examined > 10_000.0 && !metrics.has_covering_index {
            ImprovementTier::High
        } else if metrics.rows_examined >= 1000.0 {
            ImprovementTier::Medium
        } else {
            ImprovementTier::Low
        };
        let under_estimated = metrics
            .per_table_estimates
            .iter()
            .any(|e| e.table == table && e.estimated_rows < e.actual_rows);
        if under_estimated {
            improvement = upgrade_tier(improvement);
        }

        let overlaps_with = existing_indexes
            .iter()
            .find(|idx| idx.table == table && idx.columns.first() == columns.first())
            .map(|idx| idx.name.clone());

        let quoted_cols: Vec<String> = columns.iter().map(|c| format!("`{c}`")).collect();
        let ddl = format!(
            "CREATE INDEX idx_{}_{} ON `{}` ({});",
            table,
            columns.join("_"),
            table,
            quoted_cols.join(", ")
        );

        recommendations.push(IndexRecommendation {
            table: table.to_string(),
            columns,
            index_type,
            ddl,
            estimated_improvement: improvement,
            overlaps_with,
        });

        if recommendations.len() >= config.max_recommendations {
            break;
        }
    }
    recommendations.truncate(config.max_recommendations);

    let existing = existing_indexes
        .iter()
        .map(|idx| {
            let used = metrics.indexes_used.contains(&idx.name);
            let leading_matched = recommendations.iter().any(|r| r.table == idx.table && r.columns.first() == idx.columns.first());
            let assessment = if existing_indexes
                .iter()
                .any(|other| other.name != idx.name && other.table == idx.table && other.columns.starts_with(&idx.columns) && other.columns.len() > idx.columns.len())
            {
                ExistingIndexAssessment::Redundant
            } else if leading_matched && used {
                ExistingIndexAssessment::Optimal
            } else if !leading_matched && !used {
                ExistingIndexAssessment::Unused
            } else {
                ExistingIndexAssessment::Suboptimal
            };
            ExistingIndexReport { table: idx.table.clone(), name: idx.name.clone(), assessment }
        })
        .collect();

    IndexSynthesisReport { recommendations, existing }
}

/// Render each recommendation as a `category=index_synthesis` finding for
/// the orchestrator to merge alongside the other analyzers' output.
pub fn findings_for(report: &IndexSynthesisReport) -> Vec<crate::finding::Finding> {
    use crate::finding::{Finding, Severity};
    report
        .recommendations
        .iter()
        .map(|r| {
            let severity = match r.estimated_improvement {
                ImprovementTier::High => Severity::Warning,
                ImprovementTier::Medium | ImprovementTier::Low => Severity::Optimization,
            };
            Finding::new(
                severity,
                "index_synthesis",
                format!("Missing index on `{}`", r.table),
                format!("Columns {:?} are filtered/sorted without a supporting index", r.columns),
            )
            .with_recommendation(r.ddl.clone())
        })
        .collect()
}

fn predicates_for(sql: &SqlInfo, kind: PredicateKind) -> Vec<String> {
    sql.predicates.iter().filter(|p: &&Predicate| p.kind == kind).map(|p| p.column.clone()).collect()
}

fn upgrade_tier(tier: ImprovementTier) -> ImprovementTier {
    match tier {
        ImprovementTier::Low => ImprovementTier::Medium,
        ImprovementTier::Medium => ImprovementTier::High,
        ImprovementTier::High => ImprovementTier::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::extract;
    use crate::plan::parse_plan;
    use crate::sql::parse_sql;

    #[test]
    fn ers_orders_equality_range_sort() {
        let tree = parse_plan("-> Table scan on orders  (cost=1 rows=10000) (actual time=0.1..10 rows=10000 loops=1)");
        let metrics = extract(&tree, false);
        let sql = parse_sql("SELECT id FROM orders WHERE status='active' AND amount>100 ORDER BY created_at DESC");
        let report = analyze(&sql, &metrics, &[], &IndexSynthConfig::default());
        assert_eq!(report.recommendations.len(), 1);
        let rec = &report.recommendations[0];
        assert_eq!(rec.table, "orders");
        assert_eq!(rec.columns, vec!["status", "amount", "created_at"]);
        assert_eq!(rec.index_type, IndexType::Composite);
        assert!(rec.ddl.starts_with("CREATE INDEX"));
    }

    #[test]
    fn never_recommends_for_already_optimal_access() {
        let tree = parse_plan("-> Single-row index lookup on t using PRIMARY (cost=1 rows=1) (actual time=0.01..0.01 rows=1 loops=1)");
        let metrics = extract(&tree, false);
        let sql = parse_sql("SELECT * FROM t WHERE id=1");
        let report = analyze(&sql, &metrics, &[], &IndexSynthConfig::default());
        assert!(report.recommendations.is_empty());
    }
}
