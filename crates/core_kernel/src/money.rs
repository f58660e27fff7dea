//! Money types with precise decimal arithmetic
//!
//! This module provides a type-safe representation of monetary values
//! using rust_decimal for precise calculations without floating-point errors.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use thiserror::Error;

/// Currency codes following ISO 4217
///
/// The utility bills in a single operating currency; the additional codes
/// exist for deployments outside the default region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    KES,
    TZS,
    UGX,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::UGX => 0,
            _ => 2,
        }
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::KES => "KSh",
            Currency::TZS => "TSh",
            Currency::UGX => "USh",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::KES => "KES",
            Currency::TZS => "TZS",
            Currency::UGX => "UGX",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "KES" => Ok(Currency::KES),
            "TZS" => Ok(Currency::TZS),
            "UGX" => Ok(Currency::UGX),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            other => Err(MoneyError::InvalidAmount(format!(
                "Unknown currency code: {}",
                other
            ))),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Division by zero")]
    DivisionByZero,
}

/// A monetary amount with associated currency
///
/// Money uses rust_decimal for precise arithmetic without floating-point
/// errors. Amounts are kept at 4 decimal places internally so that per-unit
/// charge calculations do not lose precision before the final rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(4),
            currency,
        }
    }

    /// Creates Money from an integer amount in minor units (e.g., cents)
    pub fn from_minor(minor_units: i64, currency: Currency) -> Self {
        let divisor = Decimal::new(10_i64.pow(currency.decimal_places()), 0);
        Self::new(Decimal::new(minor_units, 0) / divisor, currency)
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is positive
    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Returns the absolute value
    pub fn abs(&self) -> Self {
        Self {
            amount: self.amount.abs(),
            currency: self.currency,
        }
    }

    /// Rounds to the currency's standard decimal places
    pub fn round_to_currency(&self) -> Self {
        Self {
            amount: self.amount.round_dp(self.currency.decimal_places()),
            currency: self.currency,
        }
    }

    /// Rounds half-up to the given number of decimal places
    ///
    /// Billed totals use standard half-up rounding, not banker's rounding.
    pub fn round_half_up(&self, dp: u32) -> Self {
        Self {
            amount: self.amount.round_dp_with_strategy(
                dp,
                rust_decimal::RoundingStrategy::MidpointAwayFromZero,
            ),
            currency: self.currency,
        }
    }

    /// Checked addition that returns an error on currency mismatch
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    /// Checked subtraction that returns an error on currency mismatch
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    /// Multiplies by a scalar (e.g., for consumption charges)
    pub fn multiply(&self, factor: Decimal) -> Self {
        Self::new(self.amount * factor, self.currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{} {:.dp$}",
            self.currency.symbol(),
            self.amount,
            dp = dp as usize
        )
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.checked_add(&other)
            .expect("Currency mismatch in Money::add")
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self.checked_sub(&other)
            .expect("Currency mismatch in Money::sub")
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.amount, self.currency)
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, factor: Decimal) -> Self {
        self.multiply(factor)
    }
}

/// A per-unit tariff rate (currency per volume unit)
///
/// The billing engine multiplies this by consumed volume to obtain the
/// water charge. The rate is injected configuration, not a compile-time
/// constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRate {
    /// Amount charged per unit of consumption
    per_unit: Decimal,
    /// Billing currency
    currency: Currency,
}

impl UnitRate {
    /// Creates a rate from an amount per unit
    pub fn new(per_unit: Decimal, currency: Currency) -> Self {
        Self { per_unit, currency }
    }

    /// Returns the per-unit amount
    pub fn per_unit(&self) -> Decimal {
        self.per_unit
    }

    /// Returns the rate's currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Computes the charge for a consumed volume, rounded half-up to the
    /// currency's decimal places
    pub fn charge(&self, volume: Decimal) -> Money {
        Money::new(self.per_unit * volume, self.currency)
            .round_half_up(self.currency.decimal_places())
    }
}

impl fmt::Display for UnitRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/unit", self.currency.symbol(), self.per_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let m = Money::new(dec!(100.50), Currency::KES);
        assert_eq!(m.amount(), dec!(100.50));
        assert_eq!(m.currency(), Currency::KES);
    }

    #[test]
    fn test_money_from_minor() {
        let m = Money::from_minor(10050, Currency::KES);
        assert_eq!(m.amount(), dec!(100.50));
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(dec!(100.00), Currency::KES);
        let b = Money::new(dec!(50.00), Currency::KES);

        assert_eq!((a + b).amount(), dec!(150.00));
        assert_eq!((a - b).amount(), dec!(50.00));
    }

    #[test]
    fn test_currency_mismatch() {
        let kes = Money::new(dec!(100.00), Currency::KES);
        let usd = Money::new(dec!(100.00), Currency::USD);

        let result = kes.checked_add(&usd);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_round_half_up() {
        let m = Money::new(dec!(10.005), Currency::KES);
        assert_eq!(m.round_half_up(2).amount(), dec!(10.01));

        let m = Money::new(dec!(10.004), Currency::KES);
        assert_eq!(m.round_half_up(2).amount(), dec!(10.00));

        let m = Money::new(dec!(-10.005), Currency::KES);
        assert_eq!(m.round_half_up(2).amount(), dec!(-10.01));
    }

    #[test]
    fn test_negative_sign_checks() {
        assert!(Money::new(dec!(-1), Currency::KES).is_negative());
        assert!(!Money::zero(Currency::KES).is_negative());
        assert!(!Money::zero(Currency::KES).is_positive());
    }

    #[test]
    fn test_unit_rate_charge() {
        let rate = UnitRate::new(dec!(100), Currency::KES);
        let charge = rate.charge(dec!(50.0));
        assert_eq!(charge.amount(), dec!(5000.00));
    }

    #[test]
    fn test_unit_rate_charge_rounds_half_up() {
        let rate = UnitRate::new(dec!(0.125), Currency::KES);
        // 0.125 * 0.5 = 0.0625 -> 0.06; 0.125 * 1.0 = 0.125 -> 0.13
        assert_eq!(rate.charge(dec!(0.5)).amount(), dec!(0.06));
        assert_eq!(rate.charge(dec!(1.0)).amount(), dec!(0.13));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn money_add_sub_roundtrip(
            a in -1_000_000i64..1_000_000i64,
            b in -1_000_000i64..1_000_000i64
        ) {
            let ma = Money::from_minor(a, Currency::KES);
            let mb = Money::from_minor(b, Currency::KES);

            prop_assert_eq!((ma + mb) - mb, ma);
        }

        #[test]
        fn money_arithmetic_is_associative(
            a in -1_000_000i64..1_000_000i64,
            b in -1_000_000i64..1_000_000i64,
            c in -1_000_000i64..1_000_000i64
        ) {
            let ma = Money::from_minor(a, Currency::KES);
            let mb = Money::from_minor(b, Currency::KES);
            let mc = Money::from_minor(c, Currency::KES);

            prop_assert_eq!((ma + mb) + mc, ma + (mb + mc));
        }

        #[test]
        fn unit_rate_charge_is_monotonic(
            volume_a in 0i64..1_000_000i64,
            volume_b in 0i64..1_000_000i64
        ) {
            let rate = UnitRate::new(Decimal::new(100, 0), Currency::KES);
            let (lo, hi) = if volume_a <= volume_b { (volume_a, volume_b) } else { (volume_b, volume_a) };

            let charge_lo = rate.charge(Decimal::new(lo, 2));
            let charge_hi = rate.charge(Decimal::new(hi, 2));
            prop_assert!(charge_lo.amount() <= charge_hi.amount());
        }
    }
}
