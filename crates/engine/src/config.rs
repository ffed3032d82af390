//! Engine configuration
//!
//! Everything a pass needs that used to be global state: account codes,
//! tolerance, enabled domains and the discrepancy policy. Every field has a
//! default, so a partial JSON file is valid.

use crate::error::{EngineError, EngineResult};
use drillbooks_core::{AccountCodes, ClassificationPolicy, SourceDomain, Tolerance};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable overriding [`EngineConfig::tolerance`]
pub const TOLERANCE_ENV: &str = "DRILLBOOKS_TOLERANCE";

/// Configuration for the reconciliation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rounding tolerance for every balance comparison
    #[serde(default)]
    pub tolerance: Tolerance,

    /// Role → account code overrides
    #[serde(default)]
    pub accounts: AccountCodes,

    /// Source domains to scan
    #[serde(default)]
    pub domains: DomainToggles,

    /// Severity and auto-fix per discrepancy kind
    #[serde(default)]
    pub policy: ClassificationPolicy,

    /// Directory for the JSONL run log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_dir: Option<PathBuf>,
}

/// Per-domain enablement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainToggles {
    #[serde(default = "default_enabled")]
    pub field_reports: bool,
    #[serde(default = "default_enabled")]
    pub loans: bool,
    #[serde(default = "default_enabled")]
    pub materials: bool,
    #[serde(default = "default_enabled")]
    pub payroll: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for DomainToggles {
    fn default() -> Self {
        Self {
            field_reports: true,
            loans: true,
            materials: true,
            payroll: true,
        }
    }
}

impl DomainToggles {
    pub fn is_enabled(&self, domain: SourceDomain) -> bool {
        match domain {
            SourceDomain::FieldReports => self.field_reports,
            SourceDomain::Loans => self.loans,
            SourceDomain::Materials => self.materials,
            SourceDomain::Payroll => self.payroll,
        }
    }

    pub fn set(&mut self, domain: SourceDomain, enabled: bool) {
        match domain {
            SourceDomain::FieldReports => self.field_reports = enabled,
            SourceDomain::Loans => self.loans = enabled,
            SourceDomain::Materials => self.materials = enabled,
            SourceDomain::Payroll => self.payroll = enabled,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            accounts: AccountCodes::default(),
            domains: DomainToggles::default(),
            policy: ClassificationPolicy::default(),
            audit_dir: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment overrides
    pub fn with_env_overrides(self) -> EngineResult<Self> {
        self.with_tolerance_override(std::env::var(TOLERANCE_ENV).ok().as_deref())
    }

    fn with_tolerance_override(mut self, value: Option<&str>) -> EngineResult<Self> {
        if let Some(raw) = value {
            let tolerance = Decimal::from_str(raw.trim()).map_err(|e| {
                EngineError::Config(format!("{} must be a decimal ({}): {}", TOLERANCE_ENV, raw, e))
            })?;
            self.tolerance = Tolerance::new(tolerance);
        }
        Ok(self)
    }

    pub fn with_audit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.audit_dir = Some(dir.into());
        self
    }

    pub fn with_domain(mut self, domain: SourceDomain, enabled: bool) -> Self {
        self.domains.set(domain, enabled);
        self
    }
}
