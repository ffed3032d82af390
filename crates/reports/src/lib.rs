//! # Drillbooks Reports
//!
//! Report generation - trigger envelopes and read-only ledger views.
//!
//! ## Exporters
//!
//! - [`CsvExporter`] - CSV format with proper escaping
//! - [`JsonExporter`] - JSON format (pretty or compact)
//! - [`MarkdownExporter`] - Markdown tables for documentation
//!
//! ## Reports
//!
//! - [`TrialBalanceReport`] - Debit/credit totals per account
//! - [`JournalListing`] - Posted entries line by line
//! - [`RunHistoryReport`] - Logged reconciliation runs
//! - [`reconciliation_envelope`] / [`initialization_envelope`] - JSON bodies
//!   returned to the trigger
//!
//! ## Example
//!
//! ```rust,ignore
//! use drillbooks_reports::{CsvExporter, ReportExporter, TrialBalanceReport};
//!
//! let balances = JournalRepo::account_balances(db.pool()).await?;
//! let report = TrialBalanceReport::new(balances, Tolerance::default());
//! println!("{}", CsvExporter::new().export(&report));
//! ```

pub mod envelope;
pub mod exporters;

pub use envelope::{initialization_envelope, reconciliation_envelope};
pub use exporters::{
    exporter_for, CsvExporter, JournalListing, JsonExporter, MarkdownExporter, ReportData,
    ReportExporter, RunHistoryReport, TrialBalanceReport,
};
