//! # Discount Math
//!
//! Pure price math for the staged referral discount.
//!
//! ## The staging model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  base 100.00                                                        │
//! │    │                                                                │
//! │    ├── referral 1:  -3% ──► 97.00     (staged)                      │
//! │    ├── referral 2:  -6% ──► 91.18     (staged, on 97.00)            │
//! │    ├── referral 3:  -9% ──► 82.97     (staged, on 91.18)            │
//! │    ├── referral 4:  -3% ──► 80.48     (bonus, flat, on 82.97)       │
//! │    └── referral 5:  -3% ──► 78.07     (bonus, flat, on 80.48)       │
//! │                                                                     │
//! │  Every step rounds to whole cents before the next one applies.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`discounted_price`] stops after the third staged step; that is the
//! contract the send pipeline relies on. [`price_at_level`] continues past
//! level 3 with flat bonus steps and exists for the display-time level
//! backfill and the delete recompute, which need canonical prices for
//! levels the stored records never reached.

use crate::money::Money;
use crate::{BONUS_RATE_BPS, MAX_STAGED_REFERRALS, STAGED_RATE_BPS};

/// Price after applying the staged reductions for `referral_count`
/// referrals, capped at three steps.
///
/// Total over non-negative inputs: `referral_count = 0` returns `base`
/// unchanged, and any count above 3 returns the same price as exactly 3.
///
/// ## Example
/// ```rust
/// use referral_core::{discount, Money};
///
/// let base = Money::from_cents(10000);
/// assert_eq!(discount::discounted_price(base, 2).cents(), 9118);
/// assert_eq!(discount::discounted_price(base, 3), discount::discounted_price(base, 10));
/// ```
pub fn discounted_price(base: Money, referral_count: i64) -> Money {
    price_at_level(base, referral_count.min(MAX_STAGED_REFERRALS))
}

/// Price after `level` referral steps, continuing past the staged cap.
///
/// Levels 1–3 are the staged 3%/6%/9% steps; every level beyond 3 applies
/// one flat 3% bonus step to the price of the previous level. Non-positive
/// levels return `base` unchanged.
pub fn price_at_level(base: Money, level: i64) -> Money {
    let mut price = base;
    for step in 1..=level.max(0) {
        price = price.less_percent(step_rate_bps(step));
    }
    price
}

/// Discount applied by a single step at `level`, as `(amount, new_price)`,
/// where `previous` is the price the step starts from.
pub fn step_from(previous: Money, level: i64) -> (Money, Money) {
    let amount = previous.percent_of(step_rate_bps(level));
    (amount, previous - amount)
}

/// Rate of the step that produces `level`, in basis points.
///
/// 300/600/900 for the staged levels, 300 for every bonus level beyond.
pub fn step_rate_bps(level: i64) -> u32 {
    if (1..=MAX_STAGED_REFERRALS).contains(&level) {
        STAGED_RATE_BPS[(level - 1) as usize]
    } else {
        BONUS_RATE_BPS
    }
}

/// Rate of the step that produces `level`, as a whole percent (3, 6 or 9).
pub fn step_rate_percent(level: i64) -> i64 {
    (step_rate_bps(level) / 100) as i64
}

/// Cumulative discount earned across the staged reduction.
///
/// Sum of the per-step discount amounts for `min(referral_count, 3)` staged
/// steps. Reporting value only; transaction records carry their own
/// per-step amounts.
pub fn total_earnings(base: Money, referral_count: i64) -> Money {
    base - discounted_price(base, referral_count)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Money {
        Money::from_cents(10000)
    }

    #[test]
    fn test_zero_referrals_returns_base() {
        assert_eq!(discounted_price(base(), 0), base());
    }

    #[test]
    fn test_staged_values() {
        // 100 → 97.00 → 91.18 → 82.97, rounding at each step
        assert_eq!(discounted_price(base(), 1).cents(), 9700);
        assert_eq!(discounted_price(base(), 2).cents(), 9118);
        assert_eq!(discounted_price(base(), 3).cents(), 8297);
    }

    #[test]
    fn test_caps_at_three_steps() {
        let at_three = discounted_price(base(), 3);
        for count in [3, 4, 5, 10] {
            assert_eq!(discounted_price(base(), count), at_three);
        }
    }

    #[test]
    fn test_price_at_level_continues_with_bonus_steps() {
        // level 4: 82.97 - 3% (2.4891 → 2.49) = 80.48
        assert_eq!(price_at_level(base(), 4).cents(), 8048);
        // level 5: 80.48 - 3% (2.4144 → 2.41) = 78.07
        assert_eq!(price_at_level(base(), 5).cents(), 7807);
    }

    #[test]
    fn test_price_at_level_agrees_with_discounted_price() {
        for count in 0..=3 {
            assert_eq!(price_at_level(base(), count), discounted_price(base(), count));
        }
    }

    #[test]
    fn test_step_rates() {
        assert_eq!(step_rate_bps(1), 300);
        assert_eq!(step_rate_bps(2), 600);
        assert_eq!(step_rate_bps(3), 900);
        assert_eq!(step_rate_bps(4), 300);
        assert_eq!(step_rate_bps(9), 300);
        assert_eq!(step_rate_percent(3), 9);
    }

    #[test]
    fn test_step_from() {
        let (amount, new_price) = step_from(Money::from_cents(9700), 2);
        assert_eq!(amount.cents(), 582);
        assert_eq!(new_price.cents(), 9118);
    }

    #[test]
    fn test_total_earnings() {
        // 3.00 + 5.82 + 8.21 = 17.03
        assert_eq!(total_earnings(base(), 3).cents(), 1703);
        assert_eq!(total_earnings(base(), 0).cents(), 0);
        // staged earnings cap with the staged price
        assert_eq!(total_earnings(base(), 10), total_earnings(base(), 3));
    }

    #[test]
    fn test_deterministic_over_zero_base() {
        assert_eq!(discounted_price(Money::zero(), 3), Money::zero());
        assert_eq!(price_at_level(Money::zero(), 5), Money::zero());
    }
}
