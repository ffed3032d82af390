//! Run history from the JSONL run log

use anyhow::{Context, Result};
use drillbooks_engine::EngineConfig;
use drillbooks_persistence::{RunFilter, RunLogReader};
use drillbooks_reports::RunHistoryReport;

use super::emit;
use crate::ReportFormat;

pub fn show(config: &EngineConfig, limit: usize, needs_review: bool, format: ReportFormat) -> Result<()> {
    let Some(dir) = &config.audit_dir else {
        println!("❌ No run log configured");
        println!("   Pass --audit-dir or set audit_dir in the config file");
        return Ok(());
    };

    let mut filter = RunFilter::new().limit(limit);
    if needs_review {
        filter = filter.only_needs_review();
    }
    let runs = RunLogReader::new(dir)
        .query(&filter)
        .with_context(|| format!("Failed to read run log in {:?}", dir))?;

    if runs.is_empty() {
        println!("No runs found matching criteria.");
        return Ok(());
    }

    let report = RunHistoryReport::new(runs);
    emit(&format.exporter().export(&report), None)
}
