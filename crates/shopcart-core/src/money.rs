//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With float64 prices:                                                   │
//! │    3 × 0.1 = 0.30000000000000004  ❌ WRONG!                              │
//! │                                                                         │
//! │  An order total summed from floats drifts away from the sum of its     │
//! │  persisted lines.                                                       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    3 × 10 cents = 30 cents, exactly, every time                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shopcart_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//!
//! let line = price.checked_mul_quantity(3).unwrap(); // $32.97
//! assert_eq!(line.cents(), 3297);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: room for refunds, though checkout only produces
///   non-negative amounts
/// - **Single field tuple struct**: zero-cost wrapper, stored as an
///   `INTEGER` column
/// - **Checked arithmetic for quantities**: a line total that does not fit in
///   an `i64` is rejected rather than wrapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use shopcart_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -$5.50. Returns `None` when the amount
    /// does not fit in cents.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Option<Self> {
        let Some(major_cents) = major.checked_mul(100) else {
            return None;
        };
        let cents = if major < 0 {
            major_cents.checked_sub(minor)
        } else {
            major_cents.checked_add(minor)
        };
        match cents {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion, always 0-99.
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, returning `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use shopcart_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.checked_mul_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_mul_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, quantity: i64) -> Option<Self> {
        match self.0.checked_mul(quantity) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `$10.99`. For logs only; display formatting belongs to
/// whatever renders the receipt.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).unwrap().cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).unwrap().cents(), -550);
        assert!(Money::from_major_minor(i64::MAX / 100 + 1, 0).is_none());
        assert!(Money::from_major_minor(i64::MAX / 100, 99).is_none());
        assert!(Money::from_major_minor(i64::MIN / 100, 99).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_checked_quantity_multiplication() {
        let unit_price = Money::from_cents(299);
        assert_eq!(unit_price.checked_mul_quantity(3).unwrap().cents(), 897);
        assert_eq!(unit_price.checked_mul_quantity(0).unwrap(), Money::zero());
        assert!(Money::from_cents(i64::MAX / 2).checked_mul_quantity(3).is_none());
    }

    #[test]
    fn test_checked_addition() {
        let total = [100, 250, 1]
            .into_iter()
            .map(Money::from_cents)
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m));
        assert_eq!(total, Some(Money::from_cents(351)));
        assert!(Money::from_cents(i64::MAX)
            .checked_add(Money::from_cents(1))
            .is_none());
    }

    #[test]
    fn test_serializes_as_cents() {
        let json = serde_json::to_string(&Money::from_cents(1250)).unwrap();
        assert_eq!(json, "1250");
    }
}
