//! Reconciliation orchestrator
//!
//! Drives one pass through its states:
//!
//! ```text
//! Provisioning → Scanning → Posting → Verifying → Detecting → Reporting → Done
//! ```
//!
//! Only a setup failure stops a pass early. Every later failure is captured
//! as a discrepancy and the pass still reaches Reporting.

use crate::adapters::{default_adapters, RecordState, ScanOutput, SourceAdapter};
use crate::context::EngineContext;
use crate::detector::{detect, DetectionInput};
use crate::error::{EngineError, EngineResult};
use crate::poster::{JournalPoster, PostOutcome};
use crate::provisioner::Provisioner;
use crate::report::{DomainInit, InitializationReport, ReconciliationReport};
use crate::verifier::BalanceVerifier;
use chrono::{NaiveDate, Utc};
use drillbooks_core::{Discrepancy, DiscrepancyKind, Fingerprint, SourceDomain};
use drillbooks_persistence::{JournalRepo, RunRecord, SchemaCapabilities};
use std::collections::HashSet;
use strum_macros::Display;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// States of a pass, never re-entered within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum PassState {
    Provisioning,
    Scanning,
    Posting,
    Verifying,
    Detecting,
    Reporting,
    Done,
}

/// Tracks the current state and logs each transition
struct Pass {
    run_id: Uuid,
    state: Option<PassState>,
}

impl Pass {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            state: None,
        }
    }

    fn enter(&mut self, next: PassState) {
        debug_assert!(self.state.map_or(true, |s| s < next), "pass state re-entered");
        info!(run_id = %self.run_id, state = %next, "Pass state");
        self.state = Some(next);
    }
}

/// Result of scanning one enabled domain
struct DomainScan {
    domain: SourceDomain,
    /// `None` when the domain could not be read at all
    output: Option<ScanOutput>,
}

/// Findings collected across the states of one pass
#[derive(Default)]
struct Findings {
    /// Classified discrepancies not yet auto-fixed
    open: Vec<Discrepancy>,
    auto_fixed: Vec<Discrepancy>,
    /// Domains or tables that were skipped
    warnings: Vec<Discrepancy>,
}

/// Runs reconciliation and initialization passes
pub struct Orchestrator {
    ctx: EngineContext,
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl Orchestrator {
    pub fn new(ctx: EngineContext) -> Self {
        Self::with_adapters(ctx, default_adapters())
    }

    pub fn with_adapters(ctx: EngineContext, adapters: Vec<Box<dyn SourceAdapter>>) -> Self {
        Self { ctx, adapters }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Run a full reconciliation pass.
    ///
    /// `since` limits scanning to records dated on or after it; orphan
    /// detection is skipped for such partial scans. Always returns a report.
    pub async fn reconcile(&self, since: Option<NaiveDate>) -> ReconciliationReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let report = match self.run_reconcile(run_id, started_at, since).await {
            Ok(report) => report,
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Reconciliation failed");
                ReconciliationReport::failed(run_id, started_at, e.to_string())
            }
        };

        self.record(&report.to_run_record());
        report
    }

    async fn run_reconcile(
        &self,
        run_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        since: Option<NaiveDate>,
    ) -> EngineResult<ReconciliationReport> {
        let config = self.ctx.config();
        let mut pass = Pass::new(run_id);
        let mut report = ReconciliationReport::new(run_id, started_at);
        let mut findings = Findings::default();

        pass.enter(PassState::Provisioning);
        let provisioned = Provisioner::new(&self.ctx).ensure_accounts().await?;
        findings.open.extend(provisioned.discrepancies);

        pass.enter(PassState::Scanning);
        let caps = self.probe().await?;
        let scans = self.scan_all(&caps, since, &mut findings).await;

        pass.enter(PassState::Posting);
        let poster = JournalPoster::load(&self.ctx).await?;
        let mut exclude: HashSet<Fingerprint> = HashSet::new();

        for scan in &scans {
            let stats = report.domains.entry(scan.domain).or_default();
            let Some(output) = &scan.output else {
                continue;
            };

            for item in &output.items {
                stats.scanned += 1;
                match &item.state {
                    RecordState::Intent(intent) => match poster.post(intent).await {
                        Ok(PostOutcome::Posted { .. }) => stats.processed += 1,
                        Ok(PostOutcome::Skipped) => stats.skipped += 1,
                        Ok(PostOutcome::Rejected { reason }) => {
                            stats.rejected += 1;
                            warn!(fingerprint = %item.fingerprint, reason = %reason, "Intent rejected");
                            exclude.insert(item.fingerprint.clone());
                            findings.open.push(
                                config
                                    .policy
                                    .classify(
                                        DiscrepancyKind::RejectedIntent,
                                        format!("Entry for {} was rejected: {}", item.fingerprint, reason),
                                    )
                                    .with_fingerprint(&item.fingerprint),
                            );
                        }
                        // Left for the detector, which reports it as a missing posting
                        Err(e) => {
                            warn!(fingerprint = %item.fingerprint, error = %e, "Posting failed");
                        }
                    },
                    RecordState::Malformed(reason) => {
                        stats.rejected += 1;
                        warn!(fingerprint = %item.fingerprint, reason = %reason, "Malformed source record");
                        exclude.insert(item.fingerprint.clone());
                        findings.open.push(
                            config
                                .policy
                                .classify(
                                    DiscrepancyKind::RecordMalformed,
                                    format!("Record {} cannot be posted: {}", item.fingerprint, reason),
                                )
                                .with_fingerprint(&item.fingerprint),
                        );
                    }
                    RecordState::Empty => {}
                }
            }

            info!(
                domain = %scan.domain,
                scanned = stats.scanned,
                processed = stats.processed,
                skipped = stats.skipped,
                rejected = stats.rejected,
                "Domain posted"
            );
        }

        pass.enter(PassState::Verifying);
        match BalanceVerifier::new(&self.ctx).verify().await {
            Ok(verification) => {
                report.balance_check = Some(verification.balance);
                findings.open.extend(verification.discrepancies);
            }
            Err(e) => {
                warn!(error = %e, "Balance check failed");
                findings.open.push(config.policy.classify(
                    DiscrepancyKind::BooksUnbalanced,
                    format!("Balance check failed: {}", e),
                ));
            }
        }

        pass.enter(PassState::Detecting);
        for scan in &scans {
            let Some(output) = &scan.output else {
                continue;
            };
            let ledger = match JournalRepo::entries_for_domain(self.ctx.pool(), scan.domain).await {
                Ok(ledger) => ledger,
                Err(e) => {
                    warn!(domain = %scan.domain, error = %e, "Cannot load posted entries");
                    findings.open.push(
                        config
                            .policy
                            .classify(
                                DiscrepancyKind::AdapterFailure,
                                format!("Posted entries for {} could not be read: {}", scan.domain, e),
                            )
                            .with_domain(scan.domain),
                    );
                    continue;
                }
            };

            let detected = detect(
                &config.policy,
                config.tolerance,
                &DetectionInput {
                    items: &output.items,
                    ledger: &ledger,
                    complete: output.complete && since.is_none(),
                    exclude: &exclude,
                },
            );

            for found in detected {
                let discrepancy = found.discrepancy;
                let fix = found.fix.filter(|_| discrepancy.auto_fixable);
                let Some(intent) = fix else {
                    warn!(kind = %discrepancy.kind, message = %discrepancy.message, "Discrepancy");
                    findings.open.push(discrepancy);
                    continue;
                };

                match poster.post(&intent).await {
                    // Skipped: a concurrent pass posted it first
                    Ok(PostOutcome::Posted { .. }) | Ok(PostOutcome::Skipped) => {
                        info!(fingerprint = %intent.fingerprint, "Auto-fixed missing posting");
                        findings.auto_fixed.push(discrepancy);
                    }
                    Ok(PostOutcome::Rejected { reason }) => {
                        warn!(fingerprint = %intent.fingerprint, reason = %reason, "Auto-fix rejected");
                        findings.open.push(discrepancy);
                    }
                    Err(e) => {
                        warn!(fingerprint = %intent.fingerprint, error = %e, "Auto-fix failed");
                        findings.open.push(discrepancy);
                    }
                }
            }
        }

        pass.enter(PassState::Reporting);
        let needs_review: Vec<Discrepancy> = findings
            .open
            .iter()
            .filter(|d| !d.auto_fixable)
            .chain(findings.warnings.iter())
            .cloned()
            .collect();

        let stats = report.domains.values();
        let (scanned, processed, skipped) = stats.fold((0, 0, 0), |(a, b, c), s| {
            (a + s.scanned, b + s.processed, c + s.skipped)
        });
        report.summary.total_scanned = scanned;
        report.summary.total_processed = processed;
        report.summary.total_skipped = skipped;
        report.summary.total_auto_fixed = findings.auto_fixed.len() as u64;
        report.summary.total_discrepancies = findings.open.len() as u64;
        report.summary.total_needs_review = needs_review.len() as u64;
        report.summary.is_balanced = report
            .balance_check
            .as_ref()
            .map_or(false, |b| b.is_balanced);

        report.discrepancies = findings.open;
        report.needs_review = needs_review;
        report.auto_fixed = findings.auto_fixed;
        report.success = true;
        report.message = format!(
            "Reconciliation complete! Scanned {} record(s), processed {} new entry(ies), found {} discrepancy(ies).",
            scanned, processed, report.summary.total_discrepancies
        );
        report.finished_at = Utc::now();

        info!(
            run_id = %run_id,
            scanned,
            processed,
            skipped,
            auto_fixed = report.summary.total_auto_fixed,
            discrepancies = report.summary.total_discrepancies,
            needs_review = report.summary.total_needs_review,
            is_balanced = report.summary.is_balanced,
            "Reconciliation complete"
        );
        pass.enter(PassState::Done);
        Ok(report)
    }

    // ========================================================================
    // Initialization
    // ========================================================================

    /// Bulk-post every existing source record.
    ///
    /// Runs Provisioning, Scanning and Posting only. Safe to repeat: records
    /// already posted are counted as skipped.
    pub async fn initialize(&self) -> InitializationReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let report = match self.run_initialize(run_id, started_at).await {
            Ok(report) => report,
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Initialization failed");
                InitializationReport::failed(run_id, started_at, e.to_string())
            }
        };

        self.record(&report.to_run_record());
        report
    }

    async fn run_initialize(
        &self,
        run_id: Uuid,
        started_at: chrono::DateTime<Utc>,
    ) -> EngineResult<InitializationReport> {
        let mut pass = Pass::new(run_id);
        let mut report = InitializationReport::new(run_id, started_at);

        pass.enter(PassState::Provisioning);
        let provisioned = Provisioner::new(&self.ctx).ensure_accounts().await?;
        for d in &provisioned.discrepancies {
            warn!(message = %d.message, "Provisioning issue");
        }

        pass.enter(PassState::Scanning);
        let caps = self.probe().await?;
        let mut findings = Findings::default();
        let scans = self.scan_all(&caps, None, &mut findings).await;

        pass.enter(PassState::Posting);
        let poster = JournalPoster::load(&self.ctx).await?;

        for scan in &scans {
            let domain = report.domains.entry(scan.domain).or_insert_with(DomainInit::default);
            let Some(output) = &scan.output else {
                continue;
            };

            for item in &output.items {
                match &item.state {
                    RecordState::Intent(intent) => match poster.post(intent).await {
                        Ok(PostOutcome::Posted { .. }) => domain.processed += 1,
                        Ok(PostOutcome::Skipped) => domain.skipped += 1,
                        Ok(PostOutcome::Rejected { reason }) => {
                            domain.errors.push(format!("{}: {}", item.fingerprint, reason));
                        }
                        Err(e) => domain.errors.push(format!("{}: {}", item.fingerprint, e)),
                    },
                    RecordState::Malformed(reason) => {
                        domain.errors.push(format!("{}: {}", item.fingerprint, reason));
                    }
                    RecordState::Empty => {}
                }
            }
        }

        // Scan problems belong to their domain's error list
        for d in findings.open.iter().chain(findings.warnings.iter()) {
            if let Some(domain) = d.domain {
                report.domains.entry(domain).or_default().errors.push(d.message.clone());
            }
        }

        report.success = true;
        report.message = format!(
            "Initialization complete! Processed {} transaction(s), skipped {} duplicate(s).",
            report.total_processed(),
            report.total_skipped()
        );
        report.finished_at = Utc::now();
        info!(
            run_id = %run_id,
            processed = report.total_processed(),
            skipped = report.total_skipped(),
            errors = report.total_errors(),
            "Initialization complete"
        );
        Ok(report)
    }

    // ========================================================================
    // Shared steps
    // ========================================================================

    async fn probe(&self) -> EngineResult<SchemaCapabilities> {
        let caps = SchemaCapabilities::probe(self.ctx.pool())
            .await
            .map_err(|e| EngineError::Setup(format!("cannot inspect source tables: {}", e)))?;
        debug!(?caps, "Schema capabilities");
        Ok(caps)
    }

    /// Scan every enabled domain. Unavailable tables become scan warnings
    /// and read failures adapter failures; neither stops the pass.
    async fn scan_all(
        &self,
        caps: &SchemaCapabilities,
        since: Option<NaiveDate>,
        findings: &mut Findings,
    ) -> Vec<DomainScan> {
        let config = self.ctx.config();
        let mut scans = Vec::new();

        for adapter in &self.adapters {
            let domain = adapter.domain();
            if !config.domains.is_enabled(domain) {
                debug!(domain = %domain, "Domain disabled");
                continue;
            }

            if let Some(reason) = adapter.unavailable(caps) {
                warn!(domain = %domain, reason = %reason, "Domain skipped");
                findings.warnings.push(
                    config
                        .policy
                        .classify(DiscrepancyKind::ScanWarning, reason)
                        .with_domain(domain),
                );
                scans.push(DomainScan {
                    domain,
                    output: None,
                });
                continue;
            }

            let output = match adapter.scan(&self.ctx, caps, since).await {
                Ok(mut output) => {
                    findings.open.append(&mut output.notes);
                    for reason in output.warnings.drain(..) {
                        findings.warnings.push(
                            config
                                .policy
                                .classify(DiscrepancyKind::ScanWarning, reason)
                                .with_domain(domain),
                        );
                    }
                    info!(domain = %domain, records = output.items.len(), "Domain scanned");
                    Some(output)
                }
                Err(e) => {
                    warn!(domain = %domain, error = %e, "Domain scan failed");
                    findings.open.push(
                        config
                            .policy
                            .classify(DiscrepancyKind::AdapterFailure, e.to_string())
                            .with_domain(domain),
                    );
                    None
                }
            };
            scans.push(DomainScan { domain, output });
        }

        scans
    }

    /// Append to the run log; a failure never fails the pass
    fn record(&self, record: &RunRecord) {
        let Some(log) = self.ctx.run_log() else {
            return;
        };
        match log.append(record) {
            Ok(()) => debug!(run_id = %record.run_id, "Run recorded"),
            Err(e) => warn!(run_id = %record.run_id, error = %e, "Failed to write run log"),
        }
    }
}
