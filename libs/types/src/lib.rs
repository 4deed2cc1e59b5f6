//! # FXCurve Types Library
//!
//! Numeric core and identifiers shared by every FXCurve crate.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: All financial values stored as scaled integers
//! - **Explicit Failure**: Overflow, underflow and division by zero surface as
//!   [`FixedPointError`] instead of saturating
//! - **Type Safety**: Distinct types for signed pricing math ([`Fixed64x64`]),
//!   unsigned 18-decimal quantities ([`Fixed18`]) and raw token units (`u128`)
//! - **Clear Boundaries**: Conversions between native token decimals and the
//!   18-decimal normalized scale live in [`precision`]
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{Address, Fixed18, Fixed64x64};
//!
//! let weight = Fixed64x64::from_decimal_str("0.5").unwrap();
//! let balance = Fixed64x64::from_int(200);
//! assert_eq!(balance.checked_mul(weight).unwrap(), Fixed64x64::from_int(100));
//!
//! let shares = Fixed18::from_decimal_str("12.5").unwrap();
//! assert_eq!(shares.to_string(), "12.5");
//!
//! let token: Address = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".parse().unwrap();
//! assert_eq!(token.to_string(), "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
//! ```

pub mod common;
pub mod precision;

pub use common::errors::{FixedPointError, ValidationError};
pub use common::fixed_point::{pow10, Fixed18, Fixed64x64, FixedResult};
pub use common::identifiers::{Address, Hash256};
pub use common::quote::QuoteKind;

/// Re-exported so downstream crates share one 256-bit integer type
pub use primitive_types::U256;
