//! Source adapters
//!
//! Each adapter reads one operational domain and turns every record into a
//! [`ScanItem`]: a self-balancing posting intent, an empty record, or a
//! malformed one. Adapters never write.

pub mod field_report;
pub mod loans;
pub mod materials;
pub mod payroll;

pub use field_report::FieldReportAdapter;
pub use loans::LoanAdapter;
pub use materials::MaterialsAdapter;
pub use payroll::PayrollAdapter;

use crate::context::EngineContext;
use crate::error::EngineResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use drillbooks_core::{round2, Discrepancy, Fingerprint, PostingIntent, SourceDomain};
use drillbooks_persistence::sqlite::parse_decimal;
use drillbooks_persistence::SchemaCapabilities;
use rust_decimal::Decimal;

/// What one source record currently yields
#[derive(Debug, Clone, PartialEq)]
pub enum RecordState {
    Intent(PostingIntent),
    /// The record exists but has no postable amounts
    Empty,
    /// The record cannot be posted safely
    Malformed(String),
}

/// One scanned source record
#[derive(Debug, Clone, PartialEq)]
pub struct ScanItem {
    pub fingerprint: Fingerprint,
    pub state: RecordState,
}

impl ScanItem {
    pub fn intent(intent: PostingIntent) -> Self {
        Self {
            fingerprint: intent.fingerprint.clone(),
            state: RecordState::Intent(intent),
        }
    }

    pub fn empty(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            state: RecordState::Empty,
        }
    }

    pub fn malformed(fingerprint: Fingerprint, reason: impl Into<String>) -> Self {
        Self {
            fingerprint,
            state: RecordState::Malformed(reason.into()),
        }
    }

    /// Build from a record conversion result
    pub fn from_result(fingerprint: Fingerprint, result: Result<Option<PostingIntent>, String>) -> Self {
        match result {
            Ok(Some(intent)) => Self::intent(intent),
            Ok(None) => Self::empty(fingerprint),
            Err(reason) => Self::malformed(fingerprint, reason),
        }
    }
}

/// Output of one adapter scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub items: Vec<ScanItem>,
    /// Non-blocking findings raised while reading (e.g. calculation mismatches)
    pub notes: Vec<Discrepancy>,
    /// Part of the domain could not be read; listed for review
    pub warnings: Vec<String>,
    /// False when part of the domain was skipped
    pub complete: bool,
}

impl ScanOutput {
    pub fn new() -> Self {
        Self {
            complete: true,
            ..Default::default()
        }
    }

    pub fn intents(&self) -> impl Iterator<Item = &PostingIntent> {
        self.items.iter().filter_map(|item| match &item.state {
            RecordState::Intent(intent) => Some(intent),
            _ => None,
        })
    }
}

/// A read-only source of posting intents
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn domain(&self) -> SourceDomain;

    /// Why the domain cannot be scanned in this database, if it cannot
    fn unavailable(&self, caps: &SchemaCapabilities) -> Option<String>;

    /// Read the domain's records dated on or after `since` (all when `None`)
    async fn scan(
        &self,
        ctx: &EngineContext,
        caps: &SchemaCapabilities,
        since: Option<NaiveDate>,
    ) -> EngineResult<ScanOutput>;
}

/// The four standard adapters, in scan order
pub fn default_adapters() -> Vec<Box<dyn SourceAdapter>> {
    vec![
        Box::new(FieldReportAdapter),
        Box::new(LoanAdapter),
        Box::new(MaterialsAdapter),
        Box::new(PayrollAdapter),
    ]
}

// === Record parsing helpers ===

/// Parse a non-negative amount column
pub(crate) fn amount(field: &str, raw: &str) -> Result<Decimal, String> {
    let value = parse_decimal(raw).map_err(|_| format!("{} is not a number: {}", field, raw))?;
    if value < Decimal::ZERO {
        return Err(format!("{} is negative: {}", field, value));
    }
    Ok(value)
}

/// Parse a non-negative money column, rounded to ledger precision.
///
/// Every line of a multi-line intent is derived from these rounded values so
/// the intent balances exactly.
pub(crate) fn money(field: &str, raw: &str) -> Result<Decimal, String> {
    amount(field, raw).map(round2)
}

pub(crate) fn overflow(what: &str) -> String {
    format!("{} overflows", what)
}

/// Reject an intent whose debit or credit side cannot be summed
pub(crate) fn checked_sides(intent: PostingIntent) -> Result<PostingIntent, String> {
    let debits = intent
        .lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.debit));
    let credits = intent
        .lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.credit));
    match (debits, credits) {
        (Some(_), Some(_)) => Ok(intent),
        _ => Err(overflow("entry total")),
    }
}

/// Parse a `YYYY-MM-DD` date, ignoring any time part
pub(crate) fn record_date(field: &str, raw: Option<&str>) -> Result<NaiveDate, String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| format!("{} is missing", field))?;
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| format!("{} is not a date: {}", field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_parsing() {
        assert_eq!(amount("contract_sum", "1000").unwrap(), dec!(1000));
        assert_eq!(amount("contract_sum", "0").unwrap(), dec!(0));
        assert!(amount("contract_sum", "-5").unwrap_err().contains("negative"));
        assert!(amount("contract_sum", "n/a").unwrap_err().contains("not a number"));
    }

    #[test]
    fn test_money_rounds_to_cents() {
        assert_eq!(money("amount", "0.005").unwrap(), dec!(0.01));
        assert_eq!(money("amount", "12.344").unwrap(), dec!(12.34));
        assert!(money("amount", "-0.01").is_err());
    }

    #[test]
    fn test_checked_sides_rejects_overflowing_total() {
        let huge = Decimal::MAX;
        let intent = PostingIntent::builder(
            Fingerprint::field_report(9),
            NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
            "Huge",
        )
        .transfer("1300", "4000", huge, "")
        .transfer("1000", "4020", huge, "")
        .build();
        assert_eq!(checked_sides(intent).unwrap_err(), "entry total overflows");
    }

    #[test]
    fn test_record_date() {
        let expected = NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();
        assert_eq!(record_date("report_date", Some("2026-04-02")).unwrap(), expected);
        assert_eq!(record_date("report_date", Some("2026-04-02 13:45:00")).unwrap(), expected);
        assert!(record_date("report_date", None).is_err());
        assert!(record_date("report_date", Some("02/04/2026")).is_err());
    }

    #[test]
    fn test_scan_item_from_result() {
        let fp = Fingerprint::field_report(1);
        assert_eq!(ScanItem::from_result(fp.clone(), Ok(None)).state, RecordState::Empty);
        assert_eq!(
            ScanItem::from_result(fp, Err("bad".into())).state,
            RecordState::Malformed("bad".into())
        );
    }
}
