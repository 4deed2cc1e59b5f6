//! Precision handling for raw token amounts
//!
//! Tokens keep their native decimals (6 for USDC, 18 for CADC) everywhere a
//! balance is stored. Conversions into the 18-decimal normalized world happen
//! only through the helpers below, so every precision change is explicit.
//!
//! ```rust
//! use types::precision::{format_units, parse_units, normalize_to_18};
//!
//! let usdc = parse_units("1.25", 6).unwrap();
//! assert_eq!(usdc, 1_250_000);
//! assert_eq!(format_units(usdc, 6), "1.25");
//! assert_eq!(normalize_to_18(usdc, 6).unwrap().to_string(), "1.25");
//! ```

use crate::common::errors::FixedPointError;
use crate::common::fixed_point::{pow10, Fixed18, FixedResult};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Largest supported decimals count for tokens and oracles
pub const MAX_DECIMALS: u8 = 36;

/// Scale factor for a token or oracle with `decimals` fractional digits
pub fn scale_factor(decimals: u8) -> FixedResult<u128> {
    if decimals > MAX_DECIMALS {
        return Err(FixedPointError::Overflow {
            operation: "scale_factor",
        });
    }
    pow10(decimals as u32)
}

/// Parse a human-readable amount into raw token units, truncating extra digits
pub fn parse_units(amount: &str, decimals: u8) -> FixedResult<u128> {
    let decimal = Decimal::from_str(amount).map_err(|_| FixedPointError::InvalidDecimal {
        input: amount.to_string(),
    })?;
    let normalized = Fixed18::from_decimal(decimal)?;
    denormalize_from_18(normalized, decimals)
}

/// Render raw token units as a trimmed decimal string
pub fn format_units(raw: u128, decimals: u8) -> String {
    let Ok(scale) = scale_factor(decimals) else {
        return raw.to_string();
    };
    let whole = raw / scale;
    let fraction = raw % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Raw token units → 18-decimal value (exact for decimals ≤ 18)
pub fn normalize_to_18(raw: u128, decimals: u8) -> FixedResult<Fixed18> {
    let target = Fixed18::DECIMALS as u8;
    if decimals <= target {
        raw.checked_mul(scale_factor(target - decimals)?)
            .map(Fixed18::from_raw)
            .ok_or(FixedPointError::Overflow {
                operation: "normalize_to_18",
            })
    } else {
        Ok(Fixed18::from_raw(raw / scale_factor(decimals - target)?))
    }
}

/// 18-decimal value → raw token units, truncating toward zero
pub fn denormalize_from_18(value: Fixed18, decimals: u8) -> FixedResult<u128> {
    let target = Fixed18::DECIMALS as u8;
    if decimals <= target {
        Ok(value.raw_value() / scale_factor(target - decimals)?)
    } else {
        value
            .raw_value()
            .checked_mul(scale_factor(decimals - target)?)
            .ok_or(FixedPointError::Overflow {
                operation: "denormalize_from_18",
            })
    }
}
