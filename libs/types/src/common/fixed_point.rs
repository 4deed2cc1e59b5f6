//! Fixed-point arithmetic types for the curve engine
//!
//! Two representations cover every number the engine touches:
//!
//! - [`Fixed64x64`]: signed binary fixed point with 64 fractional bits stored
//!   in an `i128`. All pricing math (normalized balances, fees, weights, curve
//!   parameters) runs in this type.
//! - [`Fixed18`]: unsigned decimal fixed point with 18 fractional digits stored
//!   in a `u128`. Used for token-like quantities that cross the API boundary
//!   (LP shares, deposit amounts, 18-decimal USD values).
//!
//! ## Design Principles
//!
//! - **Checked Everywhere**: every operation returns `Result`; overflow,
//!   underflow and division by zero are reported, never saturated
//! - **Truncation Toward Zero**: `mul` and `div` drop the fractional remainder
//! - **Wide Intermediates**: products are formed in 256 bits before scaling
//!   back, so only the final result has to fit
//! - **Transparency**: `to_f64` exists for logs and test assertions only

use crate::common::errors::FixedPointError;
use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type FixedResult<T> = Result<T, FixedPointError>;

const TWO_POW_64: u128 = 1 << 64;

#[inline]
fn two_pow_64() -> U256 {
    U256::from(TWO_POW_64)
}

/// 10^exp as u128 (exp ≤ 38)
pub fn pow10(exp: u32) -> FixedResult<u128> {
    10u128
        .checked_pow(exp)
        .ok_or(FixedPointError::overflow("pow10"))
}

fn signed_from_magnitude(
    magnitude: U256,
    negative: bool,
    operation: &'static str,
) -> FixedResult<i128> {
    let max = U256::from(i128::MAX as u128);
    if negative {
        let min_magnitude = max + U256::one();
        if magnitude > min_magnitude {
            return Err(FixedPointError::overflow(operation));
        }
        if magnitude == min_magnitude {
            return Ok(i128::MIN);
        }
        Ok(-(magnitude.low_u128() as i128))
    } else {
        if magnitude > max {
            return Err(FixedPointError::overflow(operation));
        }
        Ok(magnitude.low_u128() as i128)
    }
}

fn unsigned_from_wide(value: U256, operation: &'static str) -> FixedResult<u128> {
    if value.bits() > 128 {
        return Err(FixedPointError::overflow(operation));
    }
    Ok(value.low_u128())
}

/// Signed 64.64 binary fixed-point number
///
/// The raw value is `x * 2^64`. Range is roughly ±1.7e19 with a resolution
/// of 5.4e-20, comfortably covering USD-normalized pool balances.
///
/// ```
/// use types::Fixed64x64;
///
/// let half = Fixed64x64::from_ratio(1, 2).unwrap();
/// let three = Fixed64x64::from_int(3);
/// assert_eq!(three.checked_mul(half).unwrap(), Fixed64x64::from_ratio(3, 2).unwrap());
/// assert!(three.checked_div(Fixed64x64::ZERO).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Fixed64x64(pub i128);

impl Fixed64x64 {
    /// Number of fractional bits
    pub const FRACTIONAL_BITS: u32 = 64;

    pub const ZERO: Self = Self(0);

    pub const ONE: Self = Self(TWO_POW_64 as i128);

    pub const MAX: Self = Self(i128::MAX);

    pub const MIN: Self = Self(i128::MIN);

    /// Create from raw scaled integer (advanced usage)
    #[inline]
    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    /// Get the raw scaled integer value
    #[inline]
    pub const fn raw_value(self) -> i128 {
        self.0
    }

    /// Integer conversion; every `i64` is representable
    #[inline]
    pub const fn from_int(value: i64) -> Self {
        Self((value as i128) << 64)
    }

    /// `numerator / denominator`, truncated toward zero
    pub fn from_ratio(numerator: u128, denominator: u128) -> FixedResult<Self> {
        Self::from_ratio_wide(U256::from(numerator), U256::from(denominator))
    }

    /// `numerator / denominator` for 256-bit operands
    pub fn from_ratio_wide(numerator: U256, denominator: U256) -> FixedResult<Self> {
        if denominator.is_zero() {
            return Err(FixedPointError::DivisionByZero);
        }
        let shifted = numerator
            .checked_mul(two_pow_64())
            .ok_or(FixedPointError::overflow("from_ratio"))?;
        signed_from_magnitude(shifted / denominator, false, "from_ratio").map(Self)
    }

    /// Convert an 18-decimal value into 64.64
    pub fn from_fixed18(value: Fixed18) -> FixedResult<Self> {
        Self::from_ratio(value.raw_value(), Fixed18::SCALE)
    }

    /// Convert into an 18-decimal value, truncating; negative values underflow
    pub fn to_fixed18(self) -> FixedResult<Fixed18> {
        self.mul_u128(Fixed18::SCALE).map(Fixed18::from_raw)
    }

    /// Exact parse of a `rust_decimal` value (truncated to 64 fractional bits)
    pub fn from_decimal(value: Decimal) -> FixedResult<Self> {
        let mantissa = value.mantissa();
        let magnitude = Self::from_ratio(mantissa.unsigned_abs(), pow10(value.scale())?)?;
        if mantissa < 0 {
            magnitude.checked_neg()
        } else {
            Ok(magnitude)
        }
    }

    /// Create from a decimal string with exact parsing
    pub fn from_decimal_str(s: &str) -> FixedResult<Self> {
        let decimal = Decimal::from_str(s).map_err(|_| FixedPointError::InvalidDecimal {
            input: s.to_string(),
        })?;
        Self::from_decimal(decimal)
    }

    // CHECKED ARITHMETIC

    pub fn checked_add(self, rhs: Self) -> FixedResult<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(FixedPointError::overflow("add"))
    }

    pub fn checked_sub(self, rhs: Self) -> FixedResult<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(FixedPointError::overflow("sub"))
    }

    /// Product truncated toward zero; fails if the true product is out of range
    pub fn checked_mul(self, rhs: Self) -> FixedResult<Self> {
        let negative = (self.0 < 0) != (rhs.0 < 0);
        let product = U256::from(self.0.unsigned_abs()) * U256::from(rhs.0.unsigned_abs());
        signed_from_magnitude(product / two_pow_64(), negative, "mul").map(Self)
    }

    /// Quotient truncated toward zero
    pub fn checked_div(self, rhs: Self) -> FixedResult<Self> {
        if rhs.0 == 0 {
            return Err(FixedPointError::DivisionByZero);
        }
        let negative = (self.0 < 0) != (rhs.0 < 0);
        let numerator = U256::from(self.0.unsigned_abs()) * two_pow_64();
        let quotient = numerator / U256::from(rhs.0.unsigned_abs());
        signed_from_magnitude(quotient, negative, "div").map(Self)
    }

    pub fn checked_neg(self) -> FixedResult<Self> {
        self.0
            .checked_neg()
            .map(Self)
            .ok_or(FixedPointError::overflow("neg"))
    }

    pub fn checked_abs(self) -> FixedResult<Self> {
        self.0
            .checked_abs()
            .map(Self)
            .ok_or(FixedPointError::overflow("abs"))
    }

    /// `self * rhs` for an unsigned integer, truncated; `self` must be non-negative
    pub fn mul_u128(self, rhs: u128) -> FixedResult<u128> {
        if self.0 < 0 {
            return Err(FixedPointError::underflow("mul_u128"));
        }
        let product = U256::from(self.0 as u128) * U256::from(rhs);
        unsigned_from_wide(product / two_pow_64(), "mul_u128")
    }

    /// `self * rhs` rounded up; used where the pool must never receive less
    pub fn mul_u128_ceil(self, rhs: u128) -> FixedResult<u128> {
        if self.0 < 0 {
            return Err(FixedPointError::underflow("mul_u128_ceil"));
        }
        let product = U256::from(self.0 as u128) * U256::from(rhs);
        let rounded = (product + two_pow_64() - U256::one()) / two_pow_64();
        unsigned_from_wide(rounded, "mul_u128_ceil")
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Convert to f64 for display or test tolerances
    ///
    /// # Warning
    /// Never feed the result back into pricing.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / TWO_POW_64 as f64
    }
}

impl fmt::Display for Fixed64x64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.12}", self.to_f64())
    }
}

/// Unsigned fixed-point value with 18 decimal places
///
/// Scale factor: 10^18, matching the LP share and normalized-value
/// conventions of ERC-20 style ledgers.
///
/// ```
/// use types::Fixed18;
///
/// let amount = Fixed18::from_decimal_str("1.5").unwrap();
/// assert_eq!(amount.raw_value(), 1_500_000_000_000_000_000);
/// assert_eq!(amount.to_string(), "1.5");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Fixed18(pub u128);

impl Fixed18 {
    pub const DECIMALS: u32 = 18;

    /// Scale factor for 18 decimal places
    pub const SCALE: u128 = 1_000_000_000_000_000_000;

    pub const ZERO: Self = Self(0);

    pub const ONE: Self = Self(Self::SCALE);

    pub const MAX: Self = Self(u128::MAX);

    #[inline]
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw_value(self) -> u128 {
        self.0
    }

    /// Whole units (compile-time constant)
    #[inline]
    pub const fn from_units(units: u64) -> Self {
        Self(units as u128 * Self::SCALE)
    }

    /// Exact parse of a non-negative decimal; digits beyond 18 places are truncated
    pub fn from_decimal(value: Decimal) -> FixedResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(FixedPointError::underflow("from_decimal"));
        }
        let mantissa = value.mantissa().unsigned_abs();
        let scale = value.scale();
        let raw = if scale <= Self::DECIMALS {
            mantissa
                .checked_mul(pow10(Self::DECIMALS - scale)?)
                .ok_or(FixedPointError::overflow("from_decimal"))?
        } else {
            mantissa / pow10(scale - Self::DECIMALS)?
        };
        Ok(Self(raw))
    }

    /// Create from a decimal string with exact parsing
    pub fn from_decimal_str(s: &str) -> FixedResult<Self> {
        let decimal = Decimal::from_str(s).map_err(|_| FixedPointError::InvalidDecimal {
            input: s.to_string(),
        })?;
        Self::from_decimal(decimal)
    }

    /// Lossless conversion to `Decimal` when the mantissa fits in 96 bits
    pub fn to_decimal(self) -> Option<Decimal> {
        Decimal::try_from_i128_with_scale(i128::try_from(self.0).ok()?, Self::DECIMALS).ok()
    }

    // CHECKED ARITHMETIC

    pub fn checked_add(self, rhs: Self) -> FixedResult<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(FixedPointError::overflow("add"))
    }

    pub fn checked_sub(self, rhs: Self) -> FixedResult<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(FixedPointError::underflow("sub"))
    }

    /// `self * rhs / 10^18`, truncated
    pub fn checked_mul(self, rhs: Self) -> FixedResult<Self> {
        let product = U256::from(self.0) * U256::from(rhs.0);
        unsigned_from_wide(product / U256::from(Self::SCALE), "mul").map(Self)
    }

    /// `self * 10^18 / rhs`, truncated
    pub fn checked_div(self, rhs: Self) -> FixedResult<Self> {
        if rhs.0 == 0 {
            return Err(FixedPointError::DivisionByZero);
        }
        let numerator = U256::from(self.0) * U256::from(Self::SCALE);
        unsigned_from_wide(numerator / U256::from(rhs.0), "div").map(Self)
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Convert to f64 for display or test tolerances
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl fmt::Display for Fixed18 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::SCALE;
        let fraction = self.0 % Self::SCALE;
        if fraction == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:018}", fraction);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}
