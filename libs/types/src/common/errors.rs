//! Error types for fixed-point arithmetic and address parsing
//!
//! Every arithmetic failure in the curve engine bottoms out in one of these
//! variants. Nothing saturates silently: callers propagate with `?`.

use thiserror::Error;

/// Errors that can occur during fixed-point arithmetic operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FixedPointError {
    /// Result exceeds the maximum representable value for the type
    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: &'static str },

    /// Result is below the minimum representable value for the type
    #[error("Arithmetic underflow in {operation}")]
    Underflow { operation: &'static str },

    /// Division by zero in fixed-point arithmetic
    #[error("Division by zero in fixed-point arithmetic")]
    DivisionByZero,

    /// Invalid decimal string format
    #[error("Invalid decimal string: '{input}' - expected numeric format")]
    InvalidDecimal { input: String },
}

impl FixedPointError {
    pub(crate) const fn overflow(operation: &'static str) -> Self {
        Self::Overflow { operation }
    }

    pub(crate) const fn underflow(operation: &'static str) -> Self {
        Self::Underflow { operation }
    }
}

/// Errors that can occur while parsing typed identifiers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Hex string has the wrong number of bytes
    #[error("Expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex string could not be decoded
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}
