//! # Money Module
//!
//! The money codec: decimal currency strings ↔ integer cents.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    "10.00" ──to_minor──► 1000                                           │
//! │    1000 / 3 = 333 (rounded once, per line, explicitly)                 │
//! │    2601 ──from_minor──► "26.01"                                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Documents carry money as strings ("10.00"). Line and total arithmetic
//! in pricing, promotion rules and invoices runs on [`Money`], integer cents
//! with saturating operators, and is formatted back exactly once.
//!
//! ## Usage
//! ```rust
//! use banquet_core::money::{from_minor, to_minor, Money};
//!
//! assert_eq!(to_minor("10.99").unwrap(), 1099);
//! assert_eq!(from_minor(-550), "-5.50");
//!
//! let line = Money::from_cents(867) * 3;
//! assert_eq!(line.to_string(), "26.01");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Maximum number of integer digits accepted by [`to_minor`].
pub const MAX_INTEGER_DIGITS: usize = 5;

/// Largest amount [`to_minor`] can produce: 99999.99.
pub const MAX_AMOUNT_CENTS: i64 = 9_999_999;

// =============================================================================
// Codec
// =============================================================================

/// Parses a signed decimal money string into cents.
///
/// ## Rules
/// - Optional leading `+` or `-`
/// - At most 5 integer digits, at least one digit overall
/// - Any number of fraction digits; the value is rounded to the nearest
///   cent, half away from zero
///
/// ## Example
/// ```rust
/// use banquet_core::money::to_minor;
///
/// assert_eq!(to_minor("26.01").unwrap(), 2601);
/// assert_eq!(to_minor("-0.5").unwrap(), -50);
/// assert_eq!(to_minor("1.005").unwrap(), 101);
/// assert!(to_minor("123456").is_err());
/// ```
pub fn to_minor(input: &str) -> CoreResult<i64> {
    let trimmed = input.trim();
    let invalid = |reason: &str| CoreError::InvalidMoney {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        Some(_) => (false, trimmed),
        None => return Err(invalid("empty amount")),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid("no digits"));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid("only digits and a single decimal point are allowed"));
    }
    if int_part.len() > MAX_INTEGER_DIGITS {
        return Err(invalid("more than 5 integer digits"));
    }

    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse()
            .map_err(|_| invalid("integer part out of range"))?
    };

    let frac_bytes = frac_part.as_bytes();
    let digit = |i: usize| frac_bytes.get(i).map_or(0, |b| i64::from(b - b'0'));
    let mut cents = whole * 100 + digit(0) * 10 + digit(1);
    // Half away from zero: the sign is applied after rounding the magnitude.
    if digit(2) >= 5 {
        cents += 1;
    }

    Ok(if negative { -cents } else { cents })
}

/// Formats cents as a fixed two-decimal string, sign preserved.
///
/// ```rust
/// use banquet_core::money::from_minor;
///
/// assert_eq!(from_minor(2601), "26.01");
/// assert_eq!(from_minor(-5), "-0.05");
/// assert_eq!(from_minor(0), "0.00");
/// ```
pub fn from_minor(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Integer division rounding half away from zero.
///
/// Used for every money rounding in the pricing core (per-unit discounts,
/// percentages, VAT). A zero divisor yields zero; a quotient outside `i64`
/// saturates.
///
/// ```rust
/// use banquet_core::money::div_round;
///
/// assert_eq!(div_round(1000, 3), 333);
/// assert_eq!(div_round(5, 2), 3);
/// assert_eq!(div_round(-5, 2), -3);
/// ```
pub fn div_round(numerator: i128, denominator: i128) -> i64 {
    if denominator == 0 {
        return 0;
    }
    let negative = (numerator < 0) != (denominator < 0);
    let (n, d) = (numerator.abs(), denominator.abs());
    let q = (n + d / 2) / d;
    let signed = if negative { -q } else { q };
    signed.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: supplements and refunds can be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Saturating arithmetic**: promotion payloads are user data; an absurd
///   value pins at `i64::MIN`/`i64::MAX` instead of wrapping or panicking
/// - **Display/FromStr**: go through [`from_minor`] / [`to_minor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Parses a money string ("10.99").
    pub fn parse(input: &str) -> CoreResult<Self> {
        to_minor(input).map(Money)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

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
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use banquet_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(867).multiply_quantity(3).cents(), 2601);
    /// assert_eq!(Money::from_cents(i64::MAX).multiply_quantity(2).cents(), i64::MAX);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Takes a percentage expressed in basis points (1000 = 10 %), rounded
    /// half away from zero.
    pub fn percentage(&self, bps: u32) -> Money {
        Money(div_round(self.0 as i128 * bps as i128, 10_000))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&from_minor(self.0))
    }
}

impl FromStr for Money {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_minor_basic() {
        assert_eq!(to_minor("10.00").unwrap(), 1000);
        assert_eq!(to_minor("10.5").unwrap(), 1050);
        assert_eq!(to_minor("10").unwrap(), 1000);
        assert_eq!(to_minor(".75").unwrap(), 75);
        assert_eq!(to_minor("0.01").unwrap(), 1);
        assert_eq!(to_minor("99999.99").unwrap(), 9_999_999);
    }

    #[test]
    fn test_to_minor_signed() {
        assert_eq!(to_minor("-2.00").unwrap(), -200);
        assert_eq!(to_minor("+2.00").unwrap(), 200);
        assert_eq!(to_minor("-0.05").unwrap(), -5);
    }

    #[test]
    fn test_to_minor_rounds_half_away_from_zero() {
        assert_eq!(to_minor("1.005").unwrap(), 101);
        assert_eq!(to_minor("1.004").unwrap(), 100);
        assert_eq!(to_minor("-1.005").unwrap(), -101);
        assert_eq!(to_minor("0.999").unwrap(), 100);
    }

    #[test]
    fn test_to_minor_rejects_garbage() {
        assert!(to_minor("").is_err());
        assert!(to_minor("-").is_err());
        assert!(to_minor(".").is_err());
        assert!(to_minor("12a.00").is_err());
        assert!(to_minor("1.2.3").is_err());
        assert!(to_minor("100000.00").is_err());
        assert!(matches!(
            to_minor("abc"),
            Err(CoreError::InvalidMoney { .. })
        ));
    }

    #[test]
    fn test_from_minor() {
        assert_eq!(from_minor(1099), "10.99");
        assert_eq!(from_minor(500), "5.00");
        assert_eq!(from_minor(-550), "-5.50");
        assert_eq!(from_minor(-5), "-0.05");
        assert_eq!(from_minor(0), "0.00");
    }

    #[test]
    fn test_div_round() {
        assert_eq!(div_round(1000, 3), 333);
        assert_eq!(div_round(2000, 3), 667);
        assert_eq!(div_round(15, 10), 2);
        assert_eq!(div_round(-15, 10), -2);
        assert_eq!(div_round(14, 10), 1);
        assert_eq!(div_round(7, 0), 0);
    }

    #[test]
    fn test_arithmetic_and_display() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!("12.34".parse::<Money>().unwrap().cents(), 1234);
        assert_eq!(Money::from_cents(-1).non_negative(), Money::zero());
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Money::from_cents(i64::MAX / 2);

        assert_eq!(huge.multiply_quantity(3).cents(), i64::MAX);
        assert_eq!((huge + huge + huge).cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - Money::from_cents(1)).cents(), i64::MIN);
        assert_eq!(Money::from_cents(i64::MAX).percentage(u32::MAX).cents(), i64::MAX);
        assert_eq!(div_round(i128::from(i64::MAX) * 4, 2), i64::MAX);
    }

    #[test]
    fn test_percentage_bps() {
        assert_eq!(Money::from_cents(10000).percentage(1000).cents(), 1000);
        // 8.25 % of 10.00 = 0.825 → 0.83
        assert_eq!(Money::from_cents(1000).percentage(825).cents(), 83);
    }

    proptest! {
        #[test]
        fn prop_round_trip_canonical(cents in -9_999_999i64..=9_999_999i64) {
            let s = from_minor(cents);
            prop_assert_eq!(to_minor(&s).unwrap(), cents);
            prop_assert_eq!(from_minor(to_minor(&s).unwrap()), s);
        }
    }
}
