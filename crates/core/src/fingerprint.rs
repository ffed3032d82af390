//! Source fingerprints
//!
//! A fingerprint is the idempotency key of a journal entry: `<kind>:<id>`,
//! e.g. `field_report:1042`. At most one entry exists per fingerprint.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

/// Operational domain a journal entry was derived from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SourceDomain {
    FieldReports,
    Loans,
    Materials,
    Payroll,
}

impl SourceDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceDomain::FieldReports => "field_reports",
            SourceDomain::Loans => "loans",
            SourceDomain::Materials => "materials",
            SourceDomain::Payroll => "payroll",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        Self::from_str(value).map_err(|_| CoreError::invalid_enum("source domain", value))
    }

    /// All domains in scan order
    pub fn all() -> impl Iterator<Item = SourceDomain> {
        <SourceDomain as strum::IntoEnumIterator>::iter()
    }
}

/// Kind of source event. Each kind belongs to exactly one domain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FingerprintKind {
    FieldReport,
    LoanDisbursement,
    LoanRepayment,
    MaterialsPurchase,
    PayrollRun,
}

impl FingerprintKind {
    pub fn domain(&self) -> SourceDomain {
        match self {
            FingerprintKind::FieldReport => SourceDomain::FieldReports,
            FingerprintKind::LoanDisbursement | FingerprintKind::LoanRepayment => {
                SourceDomain::Loans
            }
            FingerprintKind::MaterialsPurchase => SourceDomain::Materials,
            FingerprintKind::PayrollRun => SourceDomain::Payroll,
        }
    }
}

/// Deterministic idempotency key `<kind>:<id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint {
    kind: FingerprintKind,
    id: i64,
}

impl Fingerprint {
    pub fn new(kind: FingerprintKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn field_report(id: i64) -> Self {
        Self::new(FingerprintKind::FieldReport, id)
    }

    pub fn loan_disbursement(loan_id: i64) -> Self {
        Self::new(FingerprintKind::LoanDisbursement, loan_id)
    }

    pub fn loan_repayment(repayment_id: i64) -> Self {
        Self::new(FingerprintKind::LoanRepayment, repayment_id)
    }

    pub fn materials_purchase(id: i64) -> Self {
        Self::new(FingerprintKind::MaterialsPurchase, id)
    }

    pub fn payroll_run(id: i64) -> Self {
        Self::new(FingerprintKind::PayrollRun, id)
    }

    pub fn kind(&self) -> FingerprintKind {
        self.kind
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn domain(&self) -> SourceDomain {
        self.kind.domain()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for Fingerprint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidFingerprint(s.to_string()))?;
        let kind = FingerprintKind::from_str(kind)
            .map_err(|_| CoreError::UnknownFingerprintKind(kind.to_string()))?;
        let id = id
            .parse::<i64>()
            .map_err(|_| CoreError::InvalidFingerprint(s.to_string()))?;
        Ok(Self { kind, id })
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_string()
    }
}
