use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::IdError;

/// Money amount represented in cents to avoid floating point drift.
///
/// Budgets, prices and refunds all flow through this type. On the wire it
/// is rendered as a plain decimal (`988.02`); for people it is rendered
/// with a dollar sign (`$988.02`). Addition and subtraction saturate at the
/// `i64` bounds; totals use [`Money::checked_multiply`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// The largest representable amount.
    pub const MAX: Money = Money { cents: i64::MAX };

    /// Creates a new Money amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from whole dollars.
    pub const fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars.saturating_mul(100),
        }
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Returns the absolute amount.
    pub fn abs(&self) -> Money {
        Money {
            cents: self.cents.saturating_abs(),
        }
    }

    /// Multiplies by a quantity, or `None` if the total does not fit.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Plain decimal rendering used by the wire format, e.g. `5.99` or `-0.50`.
    pub fn to_decimal(&self) -> String {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }

    /// Parses a decimal amount with at most two fraction digits.
    ///
    /// Accepts `12`, `12.5`, `12.50` and `-0.25`.
    pub fn parse_decimal(s: &str) -> Result<Self, IdError> {
        let invalid = || IdError::InvalidAmount(s.to_string());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || fraction.len() > 2
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(invalid)?;
        Ok(Self {
            cents: if negative { -cents } else { cents },
        })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let abs = self.cents.unsigned_abs();
        if self.cents < 0 {
            write!(f, "-${}.{:02}", abs / 100, abs % 100)
        } else {
            write!(f, "${}.{:02}", abs / 100, abs % 100)
        }
    }
}

impl FromStr for Money {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_decimal(s)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_sub(rhs.cents),
        }
    }
}

impl std::ops::Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money {
            cents: self.cents.saturating_neg(),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(598).to_string(), "$5.98");
        assert_eq!(Money::from_cents(-50).to_string(), "-$0.50");
        assert_eq!(Money::from_dollars(1000).to_string(), "$1000.00");
    }

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(Money::from_cents(599).to_decimal(), "5.99");
        assert_eq!(Money::zero().to_decimal(), "0.00");
        assert_eq!(Money::from_cents(-1198).to_decimal(), "-11.98");
    }

    #[test]
    fn test_parse_decimal_forms() {
        assert_eq!(Money::parse_decimal("5.99").unwrap(), Money::from_cents(599));
        assert_eq!(Money::parse_decimal("1000.0").unwrap(), Money::from_dollars(1000));
        assert_eq!(Money::parse_decimal("12").unwrap(), Money::from_dollars(12));
        assert_eq!(Money::parse_decimal("-0.25").unwrap(), Money::from_cents(-25));
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        for bad in ["", ".5", "1.234", "abc", "1.2.3", "--1", "1e3"] {
            assert!(Money::parse_decimal(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_arithmetic() {
        let price = Money::from_cents(599);
        let total = price.checked_multiply(2).unwrap();
        assert_eq!(total, Money::from_cents(1198));
        assert_eq!(Money::from_dollars(1000) - total, Money::from_cents(98802));
        assert_eq!(-price, Money::from_cents(-599));
        assert_eq!((-price).abs(), price);
    }

    #[test]
    fn test_overflow_never_wraps() {
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.checked_multiply(3), None);
        assert_eq!(huge.checked_multiply(2), Some(Money::from_cents(i64::MAX - 1)));

        let mut budget = Money::MAX;
        budget += Money::from_cents(1);
        assert_eq!(budget, Money::MAX);
        assert_eq!(Money::from_cents(i64::MIN) - Money::from_cents(1), Money::from_cents(i64::MIN));
        assert_eq!(-Money::from_cents(i64::MIN), Money::MAX);
        assert_eq!(Money::from_dollars(i64::MAX), Money::MAX);
    }
}
