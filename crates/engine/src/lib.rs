//! # Drillbooks Engine
//!
//! Reconciliation engine - Provisioner, Source adapters, Journal poster,
//! Balance verifier, Discrepancy detector and the Orchestrator that drives
//! a pass.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use drillbooks_engine::{EngineConfig, EngineContext, Orchestrator};
//! use drillbooks_persistence::Database;
//!
//! let db = Database::open("sqlite:drillbooks.db", Some("data/runs")).await?;
//! let ctx = EngineContext::new(&db, EngineConfig::default());
//! let report = Orchestrator::new(ctx).reconcile(None).await;
//! println!("{}", report.message);
//! ```

pub mod adapters;
pub mod config;
pub mod context;
pub mod detector;
pub mod error;
pub mod orchestrator;
pub mod poster;
pub mod provisioner;
pub mod report;
pub mod verifier;

pub use adapters::{default_adapters, RecordState, ScanItem, ScanOutput, SourceAdapter};
pub use config::{DomainToggles, EngineConfig, TOLERANCE_ENV};
pub use context::EngineContext;
pub use detector::{detect, Detected, DetectionInput};
pub use error::{EngineError, EngineResult};
pub use orchestrator::{Orchestrator, PassState};
pub use poster::{JournalPoster, PostOutcome};
pub use provisioner::{ProvisionOutcome, Provisioner};
pub use report::{DomainInit, DomainStats, InitializationReport, ReconciliationReport};
pub use verifier::{BalanceVerifier, Verification};
