//! # Money Module
//!
//! Monetary values and percentage rates for PharmaPOS.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Computing invoice totals in floats and patching the result at         │
//! │  display time is fine for a prototype and unacceptable for a           │
//! │  system of record.                                                     │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount is an i64 number of cents. Rounding happens exactly    │
//! │    once per published figure, in i128, half-up.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pharma_core::money::{Money, Rate};
//!
//! let price = Money::from_cents(1099); // $10.99
//! let tax = price.apply_rate(Rate::from_percent(7.0));
//! assert_eq!(tax.cents(), 77);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support plus `Eq`/`Ord` so totals compare exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
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

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
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
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative amounts to zero.
    ///
    /// The dashboard clamps negative price and fee inputs to zero instead
    /// of rejecting them, and the calculator preserves that behavior.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Returns `max(self, other)`.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// Returns `min(self, other)`.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// Applies a percentage rate and rounds half-up to whole cents.
    ///
    /// ## Implementation
    /// Integer math in i128: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides half-up rounding (5000/10000 = 0.5), the i128
    /// widening prevents overflow on large amounts.
    ///
    /// ## Example
    /// ```rust
    /// use pharma_core::money::{Money, Rate};
    ///
    /// let subtotal = Money::from_cents(2497); // $24.97
    /// let tax = subtotal.apply_rate(Rate::from_percent(7.0));
    /// // $24.97 × 7% = $1.7479 → rounds to $1.75
    /// assert_eq!(tax.cents(), 175);
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Money {
        let cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Rate Type
// =============================================================================

/// A percentage rate in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 700 bps = 7% sales tax and
/// 1000 bps = a 10% discount. Integer bps keep rate math exact.
///
/// ## Clamping
/// The dashboard clamps rate inputs with `Math.max(0, Math.min(100, x))`
/// rather than rejecting them. Constructors here do the same: any input
/// lands inside [0, 10000] bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

/// Upper bound: 10000 bps = 100%.
pub const MAX_RATE_BPS: u32 = 10_000;

impl Rate {
    /// Creates a rate from basis points, clamped into [0, 10000].
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        if bps > MAX_RATE_BPS {
            Rate(MAX_RATE_BPS)
        } else {
            Rate(bps)
        }
    }

    /// Creates a rate from a percentage, clamped into [0, 100].
    pub fn from_percent(pct: f64) -> Self {
        let clamped = pct.clamp(0.0, 100.0);
        Rate((clamped * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the complementary rate (100% minus this rate).
    #[inline]
    pub const fn complement(&self) -> Self {
        Rate(MAX_RATE_BPS - self.0)
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display. Use frontend formatting for actual UI display
/// to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_cents(-550).clamp_non_negative().cents(), 0);
        assert_eq!(Money::from_cents(550).clamp_non_negative().cents(), 550);
    }

    #[test]
    fn test_apply_rate_basic() {
        // $10.00 at 10% = $1.00
        let amount = Money::from_cents(1000);
        assert_eq!(amount.apply_rate(Rate::from_bps(1000)).cents(), 100);
    }

    #[test]
    fn test_apply_rate_rounds_half_up() {
        // $24.97 at 7% = $1.7479 → $1.75
        let amount = Money::from_cents(2497);
        assert_eq!(amount.apply_rate(Rate::from_bps(700)).cents(), 175);

        // $10.00 at 8.25% = $0.825 → $0.83
        let amount = Money::from_cents(1000);
        assert_eq!(amount.apply_rate(Rate::from_bps(825)).cents(), 83);
    }

    #[test]
    fn test_rate_clamping() {
        assert_eq!(Rate::from_bps(20_000).bps(), 10_000);
        assert_eq!(Rate::from_percent(150.0).bps(), 10_000);
        assert_eq!(Rate::from_percent(-5.0).bps(), 0);
        assert_eq!(Rate::from_percent(7.0).bps(), 700);
    }

    #[test]
    fn test_rate_complement() {
        assert_eq!(Rate::from_bps(1000).complement().bps(), 9000);
        assert_eq!(Rate::zero().complement().bps(), 10_000);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(599);
        assert_eq!(unit_price.multiply_quantity(2).cents(), 1198);
    }
}
