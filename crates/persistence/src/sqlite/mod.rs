//! SQLite persistence module
//!
//! Repository pattern for the ledger tables plus read-only source readers.

pub mod repos;
pub mod schema;
pub mod sources;

pub use repos::{
    create_pool, init_database, memory_pool, run_migrations, AccountRepo, EntryFilter,
    InsertOutcome, JournalRepo,
};
pub use schema::{parse_decimal, AccountBalance, AccountRow, EntryTotals, JournalEntryRow, JournalLineRow};
pub use sources::{
    create_source_tables, FieldReportRow, LoanRow, MaterialsPurchaseRow, PayrollEntryRow,
    PayrollRunRow, RepaymentRow, SchemaCapabilities, SourceRepo,
};
