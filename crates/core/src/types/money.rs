//! Money handling: currency codes and minor-unit conversion.
//!
//! Payment processors take amounts in the smallest currency unit (paise for
//! INR, cents for USD). The conversion lives here, in one place, so the
//! classic off-by-100 bug has exactly one spot to be wrong in - and that spot
//! is unit-tested.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ISO 4217 currency codes accepted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// ISO 4217 code as a string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    /// Number of minor units per major unit (paise per rupee, cents per
    /// dollar). All supported currencies are two-decimal.
    #[must_use]
    pub const fn minor_units_per_major(self) -> i64 {
        100
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors converting a decimal amount to processor minor units.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount must not be negative")]
    Negative,
    #[error("amount has sub-minor-unit precision")]
    SubMinorUnitPrecision,
    #[error("amount too large for minor-unit representation")]
    Overflow,
}

/// Convert a major-unit amount (e.g. rupees) to minor units (e.g. paise).
///
/// Rejects negative amounts, amounts with more precision than the currency's
/// minor unit can represent, and amounts that overflow `i64`.
///
/// # Errors
///
/// Returns [`MoneyError`] on any of the conditions above.
pub fn to_minor_units(amount: Decimal, currency: CurrencyCode) -> Result<i64, MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative);
    }

    let factor = Decimal::from(currency.minor_units_per_major());
    let minor = amount.checked_mul(factor).ok_or(MoneyError::Overflow)?;

    if !minor.fract().is_zero() {
        return Err(MoneyError::SubMinorUnitPrecision);
    }

    minor.to_i64().ok_or(MoneyError::Overflow)
}
