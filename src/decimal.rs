use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::errors::{LedgerError, Result};

/// Money type with 8 decimal places of internal precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);
    /// one cent, the smallest amount the cash desk handles
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(8))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> std::result::Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?.round_dp(8)))
    }

    /// create from integer amount (dollars, so'm, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from minor amount (cents, tiyin, etc)
    pub fn from_minor(amount: i64, scale: u32) -> Self {
        let d = Decimal::from(amount) / Decimal::from(10_u64.pow(scale));
        Money(d.round_dp(8))
    }

    /// parse a human-entered amount
    ///
    /// accepts grouping spaces, `$`/`USD`/`so'm` markers and either `.` or
    /// `,` as the decimal separator: `"1 200,50"`, `"$1,200.50"`,
    /// `"1200.5 USD"`, `"500 000 so'm"`.
    pub fn parse_amount(input: &str) -> Result<Self> {
        let lowered = input.trim().to_lowercase();
        let mut cleaned = lowered.clone();
        for marker in ["usd", "uzs", "so'm", "som", "sum", "$"] {
            cleaned = cleaned.replace(marker, "");
        }
        let cleaned: String = cleaned
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '_')
            .collect();

        if cleaned.is_empty() {
            return Err(LedgerError::Validation {
                field: "amount".to_string(),
                message: format!("'{}' is not an amount", input.trim()),
            });
        }

        let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
            // both present: the later one is the decimal separator
            (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
            (Some(_), Some(_)) => cleaned.replace(',', ""),
            // lone comma followed by at most two digits is a decimal comma
            (None, Some(comma)) if cleaned.matches(',').count() == 1 && cleaned.len() - comma - 1 <= 2 => {
                cleaned.replace(',', ".")
            }
            (None, Some(_)) => cleaned.replace(',', ""),
            _ => cleaned,
        };

        Money::from_str_exact(&normalized).map_err(|_| LedgerError::Validation {
            field: "amount".to_string(),
            message: format!("'{}' is not an amount", input.trim()),
        })
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// round to specified decimal places
    pub fn round_dp(&self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

    /// round to whole cents
    pub fn to_cents(&self) -> Self {
        self.round_dp(2)
    }

    /// check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// absolute value
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// minimum of two values
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// maximum of two values
    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// clamp negative values to zero
    pub fn non_negative(self) -> Self {
        self.max(Money::ZERO)
    }

    /// equal within a tolerance
    pub fn approx_eq(&self, other: Money, tolerance: Money) -> bool {
        (*self - other).abs() <= tolerance
    }

    /// what share of `base` this amount is, in percent
    pub fn percent_of(&self, base: Money) -> Option<Decimal> {
        if base.is_zero() {
            return None;
        }
        Some((self.0 / base.0 * Decimal::from(100)).round_dp(4))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl From<u32> for Money {
    fn from(i: u32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money((self.0 + other.0).round_dp(8))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = (self.0 + other.0).round_dp(8);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money((self.0 - other.0).round_dp(8))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 = (self.0 - other.0).round_dp(8);
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money((self.0 * other).round_dp(8))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money((self.0 / other).round_dp(8))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

/// local-currency units per one base unit (so'm per dollar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    pub const DEFAULT: ExchangeRate = ExchangeRate(Decimal::from_parts(12500, 0, 0, false, 0));

    pub fn new(local_per_base: Decimal) -> Result<Self> {
        if local_per_base <= Decimal::ZERO {
            return Err(LedgerError::Validation {
                field: "exchange_rate".to_string(),
                message: "exchange rate must be positive".to_string(),
            });
        }
        Ok(ExchangeRate(local_per_base))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// convert a local amount into base currency
    pub fn to_base(&self, local: Money) -> Money {
        Money::from_decimal(local.as_decimal() / self.0)
    }
}

/// how a cash payment was physically handed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CashSplit {
    /// base-currency part
    pub dollar: Money,
    /// local-currency part
    pub sum: Money,
}

impl CashSplit {
    /// whole amount received in base currency
    pub fn dollars(amount: Money) -> Self {
        Self {
            dollar: amount,
            sum: Money::ZERO,
        }
    }

    /// value of the split expressed in base currency
    pub fn base_value(&self, rate: ExchangeRate) -> Money {
        self.dollar + rate.to_base(self.sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.123456789").unwrap();
        assert_eq!(m.to_string(), "100.12345679"); // rounded to 8 places
        assert_eq!(m.to_cents(), Money::from_decimal(dec!(100.12)));
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(Money::parse_amount("1 200,50").unwrap(), Money::from_decimal(dec!(1200.50)));
        assert_eq!(Money::parse_amount("$1,200.50").unwrap(), Money::from_decimal(dec!(1200.50)));
        assert_eq!(Money::parse_amount("1200.5 USD").unwrap(), Money::from_decimal(dec!(1200.5)));
        assert_eq!(Money::parse_amount("500 000 so'm").unwrap(), Money::from_major(500_000));
        assert_eq!(Money::parse_amount("1.200,75").unwrap(), Money::from_decimal(dec!(1200.75)));
        assert_eq!(Money::parse_amount("12,500").unwrap(), Money::from_major(12_500));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(Money::parse_amount("").is_err());
        assert!(Money::parse_amount("  $ ").is_err());
        assert!(Money::parse_amount("abc").is_err());
    }

    #[test]
    fn test_approx_eq_tolerance() {
        let a = Money::from_decimal(dec!(100.00));
        let tolerance = Money::CENT;
        assert!(a.approx_eq(Money::from_decimal(dec!(100.01)), tolerance));
        assert!(!a.approx_eq(Money::from_decimal(dec!(100.02)), tolerance));
    }

    #[test]
    fn test_exchange_rate_conversion() {
        let rate = ExchangeRate::new(dec!(12500)).unwrap();
        assert_eq!(rate.to_base(Money::from_major(25_000)), Money::from_major(2));

        let split = CashSplit {
            dollar: Money::from_major(50),
            sum: Money::from_major(625_000),
        };
        assert_eq!(split.base_value(rate), Money::from_major(100));

        assert!(ExchangeRate::new(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_percent_of() {
        let change = Money::from_major(60);
        assert_eq!(change.percent_of(Money::from_major(100)), Some(dec!(60)));
        assert_eq!(change.percent_of(Money::ZERO), None);
    }
}
