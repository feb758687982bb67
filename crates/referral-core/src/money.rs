//! # Money Module
//!
//! Monetary values as integer cents.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In floating point: 0.1 + 0.2 = 0.30000000000000004  ❌             │
//! │                                                                     │
//! │  Discounts stack here: 100 → 97 → 91.18 → 82.97 → 80.48 → ...       │
//! │  Tiny float drift would compound over every bonus step.             │
//! │                                                                     │
//! │  OUR SOLUTION: integer cents, rounded half-up to a whole cent at    │
//! │  every single step. 3% of 9118 cents is 273.54 → 274, exactly the   │
//! │  two-decimal currency rounding the invoices show.                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Signed so that defensive subtraction can go negative and be clamped
/// explicitly, rather than panicking on underflow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use referral_core::Money;
    ///
    /// let price = Money::from_cents(10000); // 100.00
    /// assert_eq!(price.cents(), 10000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money value.
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

    /// Clamps negative values to zero.
    ///
    /// Used when displaying discount amounts derived from stored data that
    /// may be stale or inconsistent (a correction notice must never show a
    /// negative discount).
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Computes a percentage of this amount, rounded half-up to whole cents.
    ///
    /// ## Arguments
    /// * `rate_bps` - Rate in basis points (300 = 3%)
    ///
    /// ## Example
    /// ```rust
    /// use referral_core::Money;
    ///
    /// // 6% of 97.00 = 5.82
    /// assert_eq!(Money::from_cents(9700).percent_of(600).cents(), 582);
    /// // 9% of 91.18 = 8.2062 → 8.21
    /// assert_eq!(Money::from_cents(9118).percent_of(900).cents(), 821);
    /// ```
    pub fn percent_of(&self, rate_bps: u32) -> Money {
        // i128 intermediate prevents overflow; +5000 rounds half-up at /10000
        let cents = (self.0 as i128 * rate_bps as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Applies a percentage reduction and returns the reduced amount.
    ///
    /// The discount amount itself is rounded to whole cents first, so the
    /// result always equals `self - self.percent_of(rate_bps)`.
    pub fn less_percent(&self, rate_bps: u32) -> Money {
        *self - self.percent_of(rate_bps)
    }

    /// Reconstructs the amount this value was reduced *from*.
    ///
    /// Inverse of [`less_percent`](Self::less_percent) up to cent rounding:
    /// given a final price and the rate that produced it, returns the
    /// approximate original price. Used only by the defensive read path when
    /// a stored original price is missing.
    pub fn before_percent(&self, rate_bps: u32) -> Money {
        if rate_bps >= 10000 {
            return *self;
        }
        let denom = (10000 - rate_bps) as i128;
        let cents = (self.0 as i128 * 10000 + denom / 2) / denom;
        Money::from_cents(cents as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Human-readable format for logs and email bodies, e.g. `82.97`.
///
/// Currency symbols are presentation concerns and are left to the templates.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
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
        let money = Money::from_cents(9118);
        assert_eq!(money.cents(), 9118);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(9118)), "91.18");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(300);

        assert_eq!((a + b).cents(), 1300);
        assert_eq!((a - b).cents(), 700);
    }

    #[test]
    fn test_percent_of_exact() {
        // 3% of 100.00 = 3.00, no rounding needed
        assert_eq!(Money::from_cents(10000).percent_of(300).cents(), 300);
        // 6% of 97.00 = 5.82
        assert_eq!(Money::from_cents(9700).percent_of(600).cents(), 582);
    }

    #[test]
    fn test_percent_of_rounds_half_up() {
        // 9% of 91.18 = 8.2062 → 8.21
        assert_eq!(Money::from_cents(9118).percent_of(900).cents(), 821);
        // 3% of 82.97 = 2.4891 → 2.49
        assert_eq!(Money::from_cents(8297).percent_of(300).cents(), 249);
    }

    #[test]
    fn test_less_percent_matches_delta() {
        let price = Money::from_cents(9118);
        let reduced = price.less_percent(900);
        assert_eq!(reduced, price - price.percent_of(900));
        assert_eq!(reduced.cents(), 8297);
    }

    #[test]
    fn test_before_percent_inverts() {
        // 97.00 was produced from 100.00 by a 3% step
        assert_eq!(Money::from_cents(9700).before_percent(300).cents(), 10000);
        // 91.18 from 97.00 by 6%
        assert_eq!(Money::from_cents(9118).before_percent(600).cents(), 9700);
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_cents(-10).clamp_non_negative().cents(), 0);
        assert_eq!(Money::from_cents(10).clamp_non_negative().cents(), 10);
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&Money::from_cents(8297)).unwrap();
        assert_eq!(json, "8297");
        let back: Money = serde_json::from_str("8297").unwrap();
        assert_eq!(back.cents(), 8297);
    }
}
