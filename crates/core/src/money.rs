//! # Money Module
//!
//! Amount helpers built on `rust_decimal`. Every ledger amount is rounded to
//! two decimal places and compared against a fixed rounding tolerance.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimal places kept on ledger amounts
pub const LEDGER_SCALE: u32 = 2;

/// Round an amount to ledger precision (half away from zero).
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(LEDGER_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounding tolerance used for every balance comparison.
///
/// # Examples
/// ```
/// use drillbooks_core::Tolerance;
/// use rust_decimal::Decimal;
///
/// let tol = Tolerance::default();
/// assert!(tol.is_zero(Decimal::new(1, 2)));      // 0.01
/// assert!(!tol.is_zero(Decimal::new(2, 2)));     // 0.02
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tolerance(Decimal);

impl Tolerance {
    /// Create a tolerance; negative values are taken as their magnitude.
    pub fn new(value: Decimal) -> Self {
        Self(value.abs())
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `|amount| <= tolerance`
    pub fn is_zero(&self, amount: Decimal) -> bool {
        amount.abs() <= self.0
    }

    /// Whether two amounts are equal within tolerance
    pub fn approx_eq(&self, a: Decimal, b: Decimal) -> bool {
        self.is_zero(a - b)
    }
}

impl Default for Tolerance {
    /// Two decimal places: 0.01
    fn default() -> Self {
        Self(Decimal::new(1, 2))
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
