//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely, plus the
//! bill-total arithmetic that freezes a bill at finalization.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    All amounts are i64 cents; rounding happens exactly once per         │
//! │    percentage application, and it is explicit.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vendra_core::money::{Money, RateBps};
//!
//! let subtotal = Money::from_cents(40_000); // $400.00
//! let discount = subtotal.percent_of(RateBps::from_bps(1000)); // 10%
//! assert_eq!(discount.cents(), 4_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Rate (basis points)
// =============================================================================

/// A percentage rate in basis points (bps).
///
/// 1 basis point = 0.01% = 1/10000. 1000 bps = 10%. Used for both the bill
/// discount percentage and the flat tax percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBps(u32);

impl RateBps {
    /// 100% expressed in basis points.
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        RateBps(bps)
    }

    /// Creates a rate from a percentage (display/config convenience).
    pub fn from_percentage(pct: f64) -> Self {
        RateBps((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        RateBps(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for RateBps {
    fn default() -> Self {
        RateBps::zero()
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: allows negative values for adjustments and refunds
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
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

    /// Multiplies money by a line quantity.
    ///
    /// ## Example
    /// ```rust
    /// use vendra_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(10_000); // $100.00
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 20_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Applies a percentage rate and returns the resulting amount,
    /// rounded half-up to whole cents.
    ///
    /// ## Implementation
    /// Integer math in i128 to prevent overflow:
    /// `(cents * bps + 5000) / 10000` — the +5000 rounds the half case up.
    ///
    /// ## Example
    /// ```rust
    /// use vendra_core::money::{Money, RateBps};
    ///
    /// let taxable = Money::from_cents(36_000); // $360.00
    /// let tax = taxable.percent_of(RateBps::from_bps(500)); // 5%
    /// assert_eq!(tax.cents(), 1_800);
    /// ```
    pub fn percent_of(&self, rate: RateBps) -> Money {
        let amount = (self.0 as i128 * rate.bps() as i128 + 5_000) / 10_000;
        Money::from_cents(amount as i64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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
// Bill Totals
// =============================================================================

/// The frozen monetary breakdown of a finalized bill.
///
/// ## Computation Order
/// ```text
/// subtotal = Σ(quantity × unit_price)
/// discount = subtotal × discount_bps / 10000       (rounded to cents)
/// tax      = (subtotal − discount) × tax_bps / 10000 (rounded to cents)
/// total    = subtotal − discount + tax
/// ```
/// Discount applies before tax; the tax base is the discounted subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillTotals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl BillTotals {
    /// Computes the total breakdown for a subtotal and the two rates.
    pub fn compute(subtotal: Money, discount: RateBps, tax: RateBps) -> BillTotals {
        let discount_amount = subtotal.percent_of(discount);
        let taxable = subtotal - discount_amount;
        let tax_amount = taxable.percent_of(tax);
        let total = taxable + tax_amount;

        BillTotals {
            subtotal_cents: subtotal.cents(),
            discount_cents: discount_amount.cents(),
            tax_cents: tax_amount.cents(),
            total_cents: total.cents(),
        }
    }

    /// A zeroed breakdown (draft bills before any item is added).
    pub const fn zero() -> BillTotals {
        BillTotals {
            subtotal_cents: 0,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: 0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
