//! Orchestrator (spec §4.16, C17): runs every analyzer, merges findings,
//! applies suppression/dedup/downgrade passes, and assembles the final
//! [`Report`].

use crate::cancellation::{Budget, CancellationToken};
use crate::config::Config;
use crate::confidence;
use crate::environment::{EnvironmentContext, ExecutionProfile};
use crate::error::{AnalysisError, AnalysisResult};
use crate::finding::{Finding, Severity};
use crate::index_synth::{self, ExistingIndex};
use crate::metrics::{self, Metrics};
use crate::plan::{parse_plan, AccessType};
use crate::regression::{self, BaselineStore};
use crate::report::{AnalysisResult as ReportResult, Diagnostic, Report};
use crate::scoring;
use crate::sql::parse_sql;
use crate::workload;
use crate::{antipattern, drift, fanout, memory, stability};
use sha2::{Digest, Sha256};

/// Everything the orchestrator needs for a single analysis call. Grouped
/// into one struct the way the teacher's request-handling entry points take
/// a single context object rather than a long parameter list.
pub struct AnalysisRequest<'a> {
    pub sql: String,
    pub plan_text: String,
    pub driver_name: String,
    pub env: EnvironmentContext,
    pub profile: Option<ExecutionProfile>,
    pub is_intentional_scan: bool,
    pub supports_analyze: bool,
    pub table_size: Option<f64>,
    pub existing_indexes: Vec<ExistingIndex>,
    pub sort_buffer_size: u64,
    pub config: &'a Config,
    pub baseline_store: &'a dyn BaselineStore,
    pub cancellation: Option<CancellationToken>,
    pub budget_ms: u64,
}

fn query_hash(sql: &str) -> String {
    let normalized = sql.trim().to_ascii_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{digest:x}")
}

/// Checks cancellation only. Cancellation is a hard abort (spec §5: "abort
/// with a Cancelled error. Partial state is discarded"); the caller asked
/// for the work to stop and nothing downstream should run.
fn check_cancelled(cancellation: &Option<CancellationToken>) -> AnalysisResult<()> {
    if let Some(token) = cancellation {
        if token.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
    }
    Ok(())
}

/// Checks the wall-clock budget only. Unlike cancellation, a timeout is not
/// a hard abort: spec §5 wants "best-effort results for completed
/// components with a Timeout marker in the report", so this records the
/// overrun on `timed_out` instead of unwinding `analyze()`.
fn check_budget(budget: &Budget, timed_out: &mut bool) {
    if budget.expired() {
        *timed_out = true;
    }
}

pub fn analyze(request: AnalysisRequest) -> AnalysisResult<Report> {
    let budget = Budget::new(request.budget_ms);
    let mut timed_out = false;
    tracing::debug!(driver = %request.driver_name, "starting analysis");

    check_cancelled(&request.cancellation)?;
    check_budget(&budget, &mut timed_out);
    let tree = parse_plan(&request.plan_text);
    let metrics = metrics::extract(&tree, request.is_intentional_scan);

    check_cancelled(&request.cancellation)?;
    check_budget(&budget, &mut timed_out);
    let sql = parse_sql(&request.sql);

    let mut findings: Vec<Finding> = Vec::new();
    if !metrics.parsing_valid {
        findings.push(Finding::new(
            Severity::Info,
            "plan_parse",
            "Plan could not be fully parsed",
            "The plan text yielded no node with a measurement block; metrics are a best-effort fallback",
        ));
    }
    findings.extend(no_index_findings(&metrics));

    check_cancelled(&request.cancellation)?;
    check_budget(&budget, &mut timed_out);
    let breakdown = scoring::score(&metrics, &request.config.scoring);

    check_cancelled(&request.cancellation)?;
    check_budget(&budget, &mut timed_out);
    let scalability = crate::scalability::project(&metrics, metrics.rows_examined, metrics.rows_examined * 10.0, &sql);

    let (_memory_estimate, memory_findings) = memory::analyze(
        &metrics,
        &request.env,
        request.profile.as_ref(),
        &request.config.memory,
        sql.tables.len().max(1) as u32,
        request.sort_buffer_size,
    );
    findings.extend(memory_findings);

    let (concurrency_profile, concurrency_findings) = crate::concurrency::analyze(&metrics, &sql, request.profile.as_ref());
    findings.extend(concurrency_findings);

    let (drift_report, drift_findings) = drift::analyze(&metrics, &request.config.drift);
    findings.extend(drift_findings);

    let stability_report = stability::analyze(&tree, &request.sql, &sql, Some(&drift_report));

    let antipattern_findings = antipattern::analyze(&sql, &metrics, &request.config.anti_pattern);
    findings.extend(antipattern_findings);

    check_cancelled(&request.cancellation)?;
    check_budget(&budget, &mut timed_out);
    let index_report = index_synth::analyze(&sql, &metrics, &request.existing_indexes, &request.config.index_synth);
    findings.extend(index_synth::findings_for(&index_report));

    let (fanout_report, fanout_findings) = fanout::analyze(&tree);
    findings.extend(fanout_findings);

    let join_count = sql.tables.len() as u32;
    let confidence_report = confidence::analyze(
        &metrics,
        &drift_report,
        &stability_report,
        Some(&request.env),
        request.supports_analyze,
        join_count,
    );
    if confidence_report.overall < 0.5 {
        findings.push(Finding::new(
            Severity::Warning,
            "confidence",
            "Low confidence in this analysis",
            "Multiple inputs (drift, sample size, plan stability) together push confidence below 0.5",
        ));
    } else if confidence_report.overall < 0.7 {
        findings.push(Finding::new(
            Severity::Optimization,
            "confidence",
            "Reduced confidence in this analysis",
            "Some inputs reduce confidence in the composite score",
        ));
    }

    check_cancelled(&request.cancellation)?;
    check_budget(&budget, &mut timed_out);
    let hash = query_hash(&request.sql);
    let (regression_report, regression_findings) = regression::analyze(
        request.baseline_store,
        &hash,
        &metrics,
        breakdown.composite_score,
        breakdown.grade.as_str(),
        request.env.is_cold_cache,
        request.table_size,
        request.env.buffer_pool_utilization,
        &request.config.regression,
    );
    findings.extend(regression_findings);

    let history = request.baseline_store.history(&hash, 200).unwrap_or_default();
    let (workload_report, workload_findings) = workload::analyze(&history, request.table_size, &request.config.workload);
    findings.extend(workload_findings);

    // --- Step 3: suppression for optimal access ---
    let is_optimal_access =
        matches!(metrics.primary_access_type, AccessType::ConstRow | AccessType::SingleRowLookup | AccessType::ZeroRowConst);
    if is_optimal_access {
        findings.retain(|f| {
            let is_index_category = matches!(f.category.as_str(), "index_synthesis" | "no_index" | "rule");
            let references_indexing = f.title.to_ascii_lowercase().contains("index");
            !(is_index_category && references_indexing)
        });
    }

    // --- Step 4: root-cause detection and suppression ---
    // function_on_column/leading_wildcard are the actual cause; no_index and
    // full_table_scan are generic symptoms of the same scan, not causes, so
    // only those are dropped. index_synthesis stays — it's the constructive
    // recommendation, not a symptom finding.
    let root_cause = detect_root_cause(&metrics, &sql);
    if matches!(root_cause, Some(RootCause::FunctionOnColumn) | Some(RootCause::LeadingWildcard)) {
        findings.retain(|f| !matches!(f.category.as_str(), "no_index" | "full_table_scan"));
    }

    // --- Step 5: dedup, keeping highest severity per (category,title,recommendation) ---
    findings = dedup(findings);
    if !index_report.recommendations.is_empty() {
        let recommended_tables: std::collections::HashSet<_> =
            index_report.recommendations.iter().map(|r| r.table.clone()).collect();
        findings.retain(|f| {
            !(f.category == "no_index"
                && f.metadata
                    .get("table")
                    .and_then(|v| v.as_str())
                    .map(|t| recommended_tables.contains(t))
                    .unwrap_or(false))
        });
    }

    // --- Step 6: intentional-scan regression downgrade ---
    if request.is_intentional_scan {
        for f in findings.iter_mut() {
            if f.category == "regression" {
                f.severity = Severity::Info;
            }
        }
    }

    // --- Step 7: top recommendation ---
    let mut recommendations: Vec<String> = Vec::new();
    if let Some(top) = top_recommendation(root_cause, &sql, &metrics) {
        recommendations.push(top);
    }
    for r in &index_report.recommendations {
        let rec = r.ddl.clone();
        if !recommendations.contains(&rec) {
            recommendations.push(rec);
        }
    }

    // --- Step 8: confidence gate ---
    let mut breakdown = breakdown;
    let has_critical = findings.iter().any(|f| f.severity == Severity::Critical);
    scoring::apply_confidence_gate(&mut breakdown, confidence_report.overall, has_critical);

    // --- Step 9: consistency validation ---
    let (_consistency_valid, violations) = crate::consistency::validate(
        &metrics,
        &findings,
        concurrency_profile.lock_scope,
        metrics.complexity.risk_level(),
        &sql,
        &regression_report.regressions,
        &request.config.regression,
    );

    let passed = !findings.iter().any(|f| f.severity == Severity::Critical);
    let execution_time_ms = metrics.execution_time_ms;
    let summary = build_summary(&metrics, &breakdown, &fanout_report, &scalability);

    let diagnostic = Some(Diagnostic {
        findings: findings.clone(),
        confidence: confidence_report,
        consistency_violations: violations,
        timed_out,
    });

    Ok(Report {
        result: ReportResult {
            sql: request.sql,
            driver: request.driver_name,
            plan_text: request.plan_text,
            metrics,
            scores: breakdown.clone(),
            findings,
            execution_time_ms,
        },
        grade: breakdown.grade.as_str().to_string(),
        passed,
        summary,
        recommendations,
        composite_score: breakdown.composite_score,
        analyzed_at: chrono::Utc::now(),
        diagnostic,
    })
}

/// The generic "this table is scanned without index backing" symptom,
/// independent of any more specific root cause (spec §4.16 step 4/5
/// contrasts this with `index_synthesis`'s constructive recommendation, and
/// step 3 suppresses it on already-optimal access).
fn no_index_findings(metrics: &Metrics) -> Vec<Finding> {
    if !metrics.has_table_scan || metrics.is_index_backed {
        return Vec::new();
    }
    let severity = if metrics.is_intentional_scan {
        Severity::Info
    } else if metrics.rows_examined > 100_000.0 {
        Severity::Critical
    } else {
        Severity::Warning
    };
    metrics
        .tables_accessed
        .iter()
        .map(|table| {
            Finding::new(
                severity,
                "no_index",
                "Full table scan without index",
                format!("`{table}` is scanned in full with no index backing the access path"),
            )
            .with_meta("table", table.clone())
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootCause {
    FunctionOnColumn,
    LeadingWildcard,
    MissingIndex,
    LargeScan,
}

fn detect_root_cause(metrics: &Metrics, sql: &crate::sql::SqlInfo) -> Option<RootCause> {
    if !sql.function_on_column.is_empty() {
        Some(RootCause::FunctionOnColumn)
    } else if sql.has_leading_wildcard_like {
        Some(RootCause::LeadingWildcard)
    } else if metrics.has_table_scan && !metrics.is_intentional_scan {
        Some(RootCause::MissingIndex)
    } else if metrics.rows_examined > 100_000.0 {
        Some(RootCause::LargeScan)
    } else {
        None
    }
}

fn top_recommendation(root_cause: Option<RootCause>, sql: &crate::sql::SqlInfo, metrics: &Metrics) -> Option<String> {
    match root_cause {
        Some(RootCause::FunctionOnColumn) => {
            Some("Remove LOWER()/UPPER() wrapping; add a functional index instead".to_string())
        }
        Some(RootCause::LeadingWildcard) => Some("Avoid leading `%` in LIKE patterns".to_string()),
        _ if sql.select_star && metrics.is_index_backed => {
            Some("Replace SELECT * with explicit columns".to_string())
        }
        _ if !metrics.has_covering_index => Some("Consider a covering index for this query".to_string()),
        _ => None,
    }
}

pub(crate) fn dedup(findings: Vec<Finding>) -> Vec<Finding> {
    use std::collections::HashMap;
    let mut best: HashMap<(String, String, Option<String>), Finding> = HashMap::new();
    for f in findings {
        let key = f.dedup_key();
        match best.get(&key) {
            Some(existing) if existing.severity >= f.severity => {}
            _ => {
                best.insert(key, f);
            }
        }
    }
    best.into_values().collect()
}

fn build_summary(
    metrics: &Metrics,
    breakdown: &scoring::ScoreBreakdown,
    fanout: &fanout::FanoutReport,
    scalability: &crate::scalability::ScalabilityEstimate,
) -> String {
    format!(
        "{} access, grade {}, composite {:.1}; {:.0} rows examined; fanout tier {:?}; scalability risk {:?}",
        metrics.mysql_access_type,
        breakdown.grade.as_str(),
        breakdown.composite_score,
        metrics.rows_examined,
        fanout.tier,
        scalability.risk,
    )
}
