//! # Drillbooks Core
//!
//! Domain types for the Drillbooks ledger: the chart of accounts, source
//! fingerprints, posting intents, journal entries and discrepancies.
//!
//! ## Modules
//!
//! - `account` - Account types, roles and the canonical chart
//! - `fingerprint` - Source domains and idempotency keys
//! - `intent` - Posting intents and their validation
//! - `journal` - Posted entries and lines
//! - `discrepancy` - Discrepancy records and classification policy
//! - `run` - Balance snapshot and run summary
//! - `money` - Rounding and tolerance helpers
//! - `error` - Domain errors

pub mod account;
pub mod discrepancy;
pub mod error;
pub mod fingerprint;
pub mod intent;
pub mod journal;
pub mod money;
pub mod run;

pub use account::{Account, AccountCodes, AccountRole, AccountSpec, AccountType, ChartOfAccounts};
pub use discrepancy::{ClassificationPolicy, Discrepancy, DiscrepancyKind, PolicyRule, Severity};
pub use error::{CoreError, CoreResult};
pub use fingerprint::{Fingerprint, FingerprintKind, SourceDomain};
pub use intent::{IntentBuilder, PostingIntent, PostingLine, Side};
pub use journal::{JournalEntry, JournalLine};
pub use money::{round2, Tolerance, LEDGER_SCALE};
pub use run::{BalanceCheck, RunSummary};
