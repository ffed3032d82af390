//! Response envelopes
//!
//! The JSON bodies a trigger returns, built from engine reports so that any
//! transport can hand them back verbatim.

use drillbooks_core::SourceDomain;
use drillbooks_engine::{DomainStats, InitializationReport, ReconciliationReport};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// `{success, message, summary, results}` for a reconciliation pass.
///
/// A failed pass carries `error` and an all-zero summary.
pub fn reconciliation_envelope(report: &ReconciliationReport) -> Value {
    let stat = |pick: fn(&DomainStats) -> u64| domain_map(&report.domains, pick);

    let mut body = json!({
        "success": report.success,
        "message": report.message,
        "summary": report.summary,
        "results": {
            "balance_check": report.balance_check,
            "discrepancies": report.discrepancies,
            "needs_review": report.needs_review,
            "auto_fixed": report.auto_fixed,
            "scanned": stat(|s| s.scanned),
            "processed": stat(|s| s.processed),
            "skipped": stat(|s| s.skipped),
            "rejected": stat(|s| s.rejected),
        },
    });
    if let (Some(error), Some(obj)) = (&report.error, body.as_object_mut()) {
        obj.insert("error".to_string(), Value::String(error.clone()));
    }
    body
}

/// `{success, message, results, summary}` for a bulk initialization
pub fn initialization_envelope(report: &InitializationReport) -> Value {
    let mut body = json!({
        "success": report.success,
        "message": report.message,
        "results": report.domains,
        "summary": {
            "total_processed": report.total_processed(),
            "total_skipped": report.total_skipped(),
        },
    });
    if let (Some(error), Some(obj)) = (&report.error, body.as_object_mut()) {
        obj.insert("error".to_string(), Value::String(error.clone()));
    }
    body
}

fn domain_map(
    domains: &BTreeMap<SourceDomain, DomainStats>,
    pick: fn(&DomainStats) -> u64,
) -> Value {
    let map: Map<String, Value> = domains
        .iter()
        .map(|(domain, stats)| (domain.as_str().to_string(), Value::from(pick(stats))))
        .collect();
    Value::Object(map)
}
