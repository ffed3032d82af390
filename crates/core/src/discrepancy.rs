//! Discrepancy records and their classification policy

use crate::fingerprint::{Fingerprint, SourceDomain};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter, EnumString};

/// Severity of a discrepancy, ordered low → critical
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// What went wrong
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// Source record without a posted entry
    MissingPosting,
    /// Source record edited after posting
    AmountMismatch,
    /// Posted entry whose source record is gone
    OrphanedFingerprint,
    /// Global Σdebit ≠ Σcredit
    BooksUnbalanced,
    RejectedIntent,
    UnbalancedEntry,
    /// Recorded net profit disagrees with income - expenses
    CalculationMismatch,
    RecordMalformed,
    AdapterFailure,
    ProvisioningFailure,
    AccountTypeConflict,
    /// Source domain skipped because its tables are missing
    ScanWarning,
}

impl DiscrepancyKind {
    /// Default (severity, auto-fixable) classification
    pub fn default_rule(&self) -> PolicyRule {
        use DiscrepancyKind::*;
        let (severity, auto_fix) = match self {
            MissingPosting => (Severity::High, true),
            AmountMismatch => (Severity::Critical, false),
            OrphanedFingerprint => (Severity::Medium, false),
            BooksUnbalanced => (Severity::Critical, false),
            RejectedIntent => (Severity::High, false),
            UnbalancedEntry => (Severity::High, false),
            CalculationMismatch => (Severity::Medium, false),
            RecordMalformed => (Severity::Medium, false),
            AdapterFailure => (Severity::High, false),
            ProvisioningFailure => (Severity::Critical, false),
            AccountTypeConflict => (Severity::Critical, false),
            ScanWarning => (Severity::Low, false),
        };
        PolicyRule { severity, auto_fix }
    }

    /// Whether the engine has an automatic fix for this kind.
    ///
    /// Only a missing posting can be fixed without touching an existing
    /// entry; an `auto_fix` flag on any other kind is ignored.
    pub fn has_fix(&self) -> bool {
        matches!(self, DiscrepancyKind::MissingPosting)
    }

    /// Suggested human action for review-only items
    pub fn action_required(&self) -> &'static str {
        use DiscrepancyKind::*;
        match self {
            MissingPosting => "Post the missing journal entry",
            AmountMismatch => "Review the source record and post an offsetting correction",
            OrphanedFingerprint => "Confirm the source record was deleted and reverse the entry",
            BooksUnbalanced => "Review all journal entries for errors",
            RejectedIntent => "Correct the source record so it produces a balanced entry",
            UnbalancedEntry => "Review and correct entry manually",
            CalculationMismatch => "Check the recorded net profit on the source record",
            RecordMalformed => "Correct the invalid amounts on the source record",
            AdapterFailure => "Check the source tables for this domain",
            ProvisioningFailure => "Create the missing ledger account",
            AccountTypeConflict => "Review the account type of the existing ledger account",
            ScanWarning => "Create the source tables or disable the domain",
        }
    }
}

/// Severity and auto-fix decision for one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub severity: Severity,
    #[serde(default)]
    pub auto_fix: bool,
}

/// Configurable classification of discrepancy kinds.
///
/// Kinds absent from the map use [`DiscrepancyKind::default_rule`].
/// Kinds without a fix (`books_unbalanced` among them) are never auto-fixed,
/// whatever the configuration says.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationPolicy {
    overrides: BTreeMap<DiscrepancyKind, PolicyRule>,
}

impl ClassificationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, kind: DiscrepancyKind, rule: PolicyRule) -> Self {
        self.overrides.insert(kind, rule);
        self
    }

    pub fn rule(&self, kind: DiscrepancyKind) -> PolicyRule {
        let mut rule = self
            .overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_rule());
        rule.auto_fix &= kind.has_fix();
        rule
    }

    /// Build a classified discrepancy
    pub fn classify(&self, kind: DiscrepancyKind, message: impl Into<String>) -> Discrepancy {
        let rule = self.rule(kind);
        Discrepancy {
            kind,
            severity: rule.severity,
            message: message.into(),
            action_required: kind.action_required().to_string(),
            auto_fixable: rule.auto_fix,
            domain: None,
            reference: None,
        }
    }
}

/// A classified discrepancy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    #[serde(rename = "type")]
    pub kind: DiscrepancyKind,
    pub severity: Severity,
    pub message: String,
    pub action_required: String,
    pub auto_fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<SourceDomain>,
    /// Fingerprint of the record or entry concerned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Discrepancy {
    pub fn with_domain(mut self, domain: SourceDomain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: &Fingerprint) -> Self {
        self.domain = Some(fingerprint.domain());
        self.reference = Some(fingerprint.to_string());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}
