//! Chart of accounts
//!
//! Account types, the fixed set of account roles the engine posts against,
//! and the canonical chart the provisioner bootstraps.

use crate::error::CoreError;
use crate::intent::Side;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

/// Account type following standard accounting principles
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    /// Returns the normal balance side for this type.
    ///
    /// - Assets and Expenses increase on Debit
    /// - Liabilities, Equity, and Revenue increase on Credit
    pub fn normal_balance(&self) -> Side {
        match self {
            AccountType::Asset | AccountType::Expense => Side::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => Side::Credit,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Revenue => "revenue",
            AccountType::Expense => "expense",
        }
    }

    /// Parse the stored column value
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::from_str(value).map_err(|_| CoreError::invalid_enum("account type", value))
    }
}

/// Roles the adapters post against. Each role resolves to one account code
/// through [`AccountCodes`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Cash,
    Bank,
    MobileMoney,
    AccountsReceivable,
    MaterialsInventory,
    WorkerLoans,
    FixedAssets,
    LoansPayable,
    AccountsPayable,
    BenefitsPayable,
    OwnerEquity,
    ContractRevenue,
    RigFeeRevenue,
    MaterialsRevenue,
    OtherRevenue,
    MaterialsExpense,
    WagesExpense,
    OperatingExpense,
    OtherExpense,
}

impl AccountRole {
    /// Default (code, name, type) for the role
    pub fn defaults(&self) -> (&'static str, &'static str, AccountType) {
        use AccountType::*;
        match self {
            AccountRole::Cash => ("1000", "Cash on Hand", Asset),
            AccountRole::Bank => ("1100", "Bank Account", Asset),
            AccountRole::MobileMoney => ("1200", "Mobile Money", Asset),
            AccountRole::AccountsReceivable => ("1300", "Accounts Receivable", Asset),
            AccountRole::MaterialsInventory => ("1400", "Materials Inventory", Asset),
            AccountRole::WorkerLoans => ("1500", "Worker Loans Receivable", Asset),
            AccountRole::FixedAssets => ("1600", "Fixed Assets", Asset),
            AccountRole::LoansPayable => ("2000", "Loans Payable", Liability),
            AccountRole::AccountsPayable => ("2100", "Accounts Payable", Liability),
            AccountRole::BenefitsPayable => ("2200", "Benefits Payable", Liability),
            AccountRole::OwnerEquity => ("3000", "Owner's Equity", Equity),
            AccountRole::ContractRevenue => ("4000", "Contract Revenue", Revenue),
            AccountRole::RigFeeRevenue => ("4010", "Rig Fee Revenue", Revenue),
            AccountRole::MaterialsRevenue => ("4020", "Materials Sales Revenue", Revenue),
            AccountRole::OtherRevenue => ("4090", "Other Revenue", Revenue),
            AccountRole::MaterialsExpense => ("5000", "Materials Cost", Expense),
            AccountRole::WagesExpense => ("5100", "Wages & Salaries", Expense),
            AccountRole::OperatingExpense => ("5200", "Operating Expenses", Expense),
            AccountRole::OtherExpense => ("5990", "Other Expenses", Expense),
        }
    }

    pub fn default_code(&self) -> &'static str {
        self.defaults().0
    }

    pub fn name(&self) -> &'static str {
        self.defaults().1
    }

    pub fn account_type(&self) -> AccountType {
        self.defaults().2
    }

    /// All roles, in chart order
    pub fn all() -> impl Iterator<Item = AccountRole> {
        <AccountRole as strum::IntoEnumIterator>::iter()
    }
}

/// Role → account code mapping.
///
/// Only overridden roles need to appear in configuration; the rest keep the
/// default codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountCodes {
    overrides: BTreeMap<AccountRole, String>,
}

impl AccountCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the code used for a role
    pub fn with_code(mut self, role: AccountRole, code: impl Into<String>) -> Self {
        self.overrides.insert(role, code.into());
        self
    }

    /// Resolve the code for a role
    pub fn code(&self, role: AccountRole) -> &str {
        self.overrides
            .get(&role)
            .map(String::as_str)
            .unwrap_or_else(|| role.default_code())
    }
}

/// An account the provisioner must guarantee exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSpec {
    pub role: AccountRole,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
}

/// A provisioned ledger account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub is_active: bool,
}

/// The canonical chart of accounts.
#[derive(Debug, Clone)]
pub struct ChartOfAccounts {
    specs: Vec<AccountSpec>,
}

impl ChartOfAccounts {
    /// Build the chart from the configured codes
    pub fn from_codes(codes: &AccountCodes) -> Self {
        let specs = AccountRole::all()
            .map(|role| AccountSpec {
                role,
                code: codes.code(role).to_string(),
                name: role.name().to_string(),
                account_type: role.account_type(),
            })
            .collect();
        Self { specs }
    }

    pub fn specs(&self) -> &[AccountSpec] {
        &self.specs
    }

    pub fn get(&self, role: AccountRole) -> Option<&AccountSpec> {
        self.specs.iter().find(|s| s.role == role)
    }

    pub fn by_code(&self, code: &str) -> Option<&AccountSpec> {
        self.specs.iter().find(|s| s.code == code)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for ChartOfAccounts {
    fn default() -> Self {
        Self::from_codes(&AccountCodes::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_normal_balance() {
        assert_eq!(AccountType::Asset.normal_balance(), Side::Debit);
        assert_eq!(AccountType::Liability.normal_balance(), Side::Credit);
        assert_eq!(AccountType::Revenue.normal_balance(), Side::Credit);
        assert_eq!(AccountType::Expense.normal_balance(), Side::Debit);
    }

    #[test]
    fn test_parse_account_type() {
        assert_eq!(AccountType::parse("asset").unwrap(), AccountType::Asset);
        assert_eq!(AccountType::parse("Revenue").unwrap(), AccountType::Revenue);
        assert!(AccountType::parse("contra").is_err());
        assert_eq!(AccountType::Equity.to_string(), "equity");
    }

    #[test]
    fn test_default_chart_codes_are_unique() {
        let chart = ChartOfAccounts::default();
        let codes: HashSet<&str> = chart.specs().iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes.len(), chart.len());
        assert_eq!(chart.get(AccountRole::Cash).unwrap().code, "1000");
        assert_eq!(chart.by_code("5100").unwrap().role, AccountRole::WagesExpense);
    }

    #[test]
    fn test_code_override() {
        let codes = AccountCodes::new().with_code(AccountRole::Cash, "1010");
        assert_eq!(codes.code(AccountRole::Cash), "1010");
        assert_eq!(codes.code(AccountRole::Bank), "1100");

        let chart = ChartOfAccounts::from_codes(&codes);
        assert_eq!(chart.get(AccountRole::Cash).unwrap().code, "1010");
        assert!(chart.by_code("1000").is_none());
    }

    #[test]
    fn test_account_codes_deserialize_partial_map() {
        let codes: AccountCodes = serde_json::from_str(r#"{"wages_expense": "6100"}"#).unwrap();
        assert_eq!(codes.code(AccountRole::WagesExpense), "6100");
        assert_eq!(codes.code(AccountRole::Cash), "1000");
    }
}
