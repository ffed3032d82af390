//! Discrepancy detector
//!
//! Compares what each source record yields now against what the ledger
//! holds for its fingerprint. Pure: no I/O, the orchestrator supplies both
//! sides and applies the fixes.

use crate::adapters::{RecordState, ScanItem};
use drillbooks_core::{
    ClassificationPolicy, Discrepancy, DiscrepancyKind, Fingerprint, JournalEntry, PostingIntent,
    Tolerance,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// A classified discrepancy plus the intent that fixes it, if any
#[derive(Debug, Clone)]
pub struct Detected {
    pub discrepancy: Discrepancy,
    pub fix: Option<PostingIntent>,
}

impl Detected {
    fn review(discrepancy: Discrepancy) -> Self {
        Self {
            discrepancy,
            fix: None,
        }
    }
}

/// Inputs for one domain
pub struct DetectionInput<'a> {
    pub items: &'a [ScanItem],
    /// Posted entries of the domain, keyed by fingerprint
    pub ledger: &'a BTreeMap<String, JournalEntry>,
    /// Every record of the domain was read; enables orphan detection
    pub complete: bool,
    /// Fingerprints already reported during posting
    pub exclude: &'a HashSet<Fingerprint>,
}

/// Detect discrepancies for one domain.
pub fn detect(
    policy: &ClassificationPolicy,
    tolerance: Tolerance,
    input: &DetectionInput<'_>,
) -> Vec<Detected> {
    let mut found = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    for item in input.items {
        let key = item.fingerprint.to_string();
        seen.insert(key.clone());
        if input.exclude.contains(&item.fingerprint) {
            continue;
        }
        let posted = input.ledger.get(&key);

        match (&item.state, posted) {
            (RecordState::Intent(intent), None) => {
                let d = policy
                    .classify(
                        DiscrepancyKind::MissingPosting,
                        format!(
                            "{} has no journal entry ({}, {})",
                            key,
                            intent.description,
                            intent.total_debits()
                        ),
                    )
                    .with_fingerprint(&item.fingerprint);
                found.push(Detected {
                    discrepancy: d,
                    fix: Some(intent.clone()),
                });
            }
            (RecordState::Intent(intent), Some(entry)) => {
                if !same_effect(tolerance, &intent.net_by_account(), &entry.net_by_account())
                    || !tolerance.approx_eq(intent.total_debits(), entry.total_debits())
                {
                    found.push(Detected::review(
                        policy
                            .classify(
                                DiscrepancyKind::AmountMismatch,
                                format!(
                                    "Source record {} changed after posting: entry {} has Debits {}, record now yields Debits {}",
                                    key,
                                    entry.id,
                                    entry.total_debits(),
                                    intent.total_debits()
                                ),
                            )
                            .with_fingerprint(&item.fingerprint),
                    ));
                }
            }
            (RecordState::Empty, Some(entry)) => {
                found.push(Detected::review(
                    policy
                        .classify(
                            DiscrepancyKind::AmountMismatch,
                            format!(
                                "Source record {} no longer has postable amounts: entry {} has Debits {}, record now yields Debits 0",
                                key,
                                entry.id,
                                entry.total_debits()
                            ),
                        )
                        .with_fingerprint(&item.fingerprint),
                ));
            }
            (RecordState::Empty, None) | (RecordState::Malformed(_), _) => {}
        }
    }

    if input.complete {
        for (key, entry) in input.ledger {
            if seen.contains(key) {
                continue;
            }
            found.push(Detected::review(
                policy
                    .classify(
                        DiscrepancyKind::OrphanedFingerprint,
                        format!(
                            "Entry {} ({}) references {} but the source record no longer exists",
                            entry.id, entry.description, key
                        ),
                    )
                    .with_fingerprint(&entry.fingerprint),
            ));
        }
    }

    found
}

/// Every account moves by the same net amount, within tolerance
fn same_effect(
    tolerance: Tolerance,
    a: &BTreeMap<String, Decimal>,
    b: &BTreeMap<String, Decimal>,
) -> bool {
    a.keys().chain(b.keys()).all(|code| {
        let x = a.get(code).copied().unwrap_or_default();
        let y = b.get(code).copied().unwrap_or_default();
        tolerance.approx_eq(x, y)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use drillbooks_core::{JournalLine, SourceDomain};
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn intent(id: i64, amount: Decimal) -> PostingIntent {
        PostingIntent::builder(Fingerprint::field_report(id), date(), "Field Report: A - B")
            .transfer("1000", "1100", amount, "Cash received from company")
            .build()
    }

    fn entry_for(intent: &PostingIntent, id: i64) -> JournalEntry {
        JournalEntry {
            id,
            entry_date: intent.entry_date,
            description: intent.description.clone(),
            reference: None,
            source_domain: SourceDomain::FieldReports,
            fingerprint: intent.fingerprint.clone(),
            created_at: Utc::now(),
            lines: intent
                .lines
                .iter()
                .enumerate()
                .map(|(i, l)| JournalLine {
                    id: i as i64 + 1,
                    entry_id: id,
                    account_id: i as i64 + 1,
                    account_code: l.account_code.clone(),
                    debit: l.debit,
                    credit: l.credit,
                    memo: l.memo.clone(),
                })
                .collect(),
        }
    }

    fn ledger(entries: Vec<JournalEntry>) -> BTreeMap<String, JournalEntry> {
        entries
            .into_iter()
            .map(|e| (e.fingerprint.to_string(), e))
            .collect()
    }

    fn run(items: &[ScanItem], ledger: &BTreeMap<String, JournalEntry>, complete: bool) -> Vec<Detected> {
        let exclude = HashSet::new();
        detect(
            &ClassificationPolicy::default(),
            Tolerance::default(),
            &DetectionInput {
                items,
                ledger,
                complete,
                exclude: &exclude,
            },
        )
    }

    #[test]
    fn test_matching_record_is_clean() {
        let posted = intent(1, dec!(1000));
        let ledger = ledger(vec![entry_for(&posted, 1)]);
        assert!(run(&[ScanItem::intent(posted)], &ledger, true).is_empty());
    }

    #[test]
    fn test_edited_record_is_amount_mismatch() {
        let ledger = ledger(vec![entry_for(&intent(1, dec!(1000)), 1)]);
        let found = run(&[ScanItem::intent(intent(1, dec!(800)))], &ledger, true);

        assert_eq!(found.len(), 1);
        let d = &found[0].discrepancy;
        assert_eq!(d.kind, DiscrepancyKind::AmountMismatch);
        assert!(d.is_critical());
        assert!(!d.auto_fixable);
        assert!(d.message.contains("1000") && d.message.contains("800"));
        assert!(found[0].fix.is_none());
    }

    #[test]
    fn test_missing_posting_carries_fix() {
        let pending = intent(2, dec!(50));
        let found = run(&[ScanItem::intent(pending.clone())], &BTreeMap::new(), true);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].discrepancy.kind, DiscrepancyKind::MissingPosting);
        assert!(found[0].discrepancy.auto_fixable);
        assert_eq!(found[0].fix.as_ref(), Some(&pending));
    }

    #[test]
    fn test_empty_record_with_entry_is_mismatch() {
        let posted = intent(3, dec!(75));
        let ledger = ledger(vec![entry_for(&posted, 9)]);
        let found = run(&[ScanItem::empty(posted.fingerprint.clone())], &ledger, true);
        assert_eq!(found[0].discrepancy.kind, DiscrepancyKind::AmountMismatch);
    }

    #[test]
    fn test_orphans_only_for_complete_scans() {
        let ledger = ledger(vec![entry_for(&intent(4, dec!(10)), 4)]);

        let found = run(&[], &ledger, true);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].discrepancy.kind, DiscrepancyKind::OrphanedFingerprint);
        assert_eq!(found[0].discrepancy.reference.as_deref(), Some("field_report:4"));

        assert!(run(&[], &ledger, false).is_empty());
    }

    #[test]
    fn test_excluded_fingerprints_are_not_reported_twice() {
        let pending = intent(5, dec!(20));
        let exclude: HashSet<Fingerprint> = [pending.fingerprint.clone()].into_iter().collect();
        let items = [ScanItem::intent(pending)];
        let found = detect(
            &ClassificationPolicy::default(),
            Tolerance::default(),
            &DetectionInput {
                items: &items,
                ledger: &BTreeMap::new(),
                complete: true,
                exclude: &exclude,
            },
        );
        assert!(found.is_empty());
    }
}
