//! Curve parameters and their derived 64.64 form
//!
//! Parameters are supplied as 18-decimal fractions (`0.8` = 80%) and
//! validated before they reach the pricing math:
//!
//! - `alpha`: halt band half-width, `0 < alpha < 1`
//! - `beta`: fee-free band half-width, `beta < alpha`
//! - `max`: fee charged at the halt boundary, `max ≤ 0.5`
//! - `epsilon`: flat swap fee, `epsilon ≤ 0.01`
//! - `lambda`: share of fee reduction paid back as a bonus, `lambda ≤ 1`

use crate::error::{CurveError, CurveResult};
use serde::{Deserialize, Serialize};
use types::{Fixed18, Fixed64x64};

const MAX_FEE_AT_HALT: Fixed18 = Fixed18::from_raw(500_000_000_000_000_000);
const MAX_EPSILON: Fixed18 = Fixed18::from_raw(10_000_000_000_000_000);

/// One wei of 64.64 (~1e-18), added to delta so it never rounds to zero
const ONE_WEI: Fixed64x64 = Fixed64x64::from_raw(0x12);

/// Owner-supplied curve parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveParams {
    pub alpha: Fixed18,
    pub beta: Fixed18,
    /// Fee at the halt boundary; determines `delta`
    pub max: Fixed18,
    pub epsilon: Fixed18,
    pub lambda: Fixed18,
}

impl CurveParams {
    /// Parse from decimal strings, e.g. `("0.8", "0.5", "0.15", "0.0005", "0.3")`
    pub fn from_decimal_strs(
        alpha: &str,
        beta: &str,
        max: &str,
        epsilon: &str,
        lambda: &str,
    ) -> CurveResult<Self> {
        Ok(Self {
            alpha: Fixed18::from_decimal_str(alpha)?,
            beta: Fixed18::from_decimal_str(beta)?,
            max: Fixed18::from_decimal_str(max)?,
            epsilon: Fixed18::from_decimal_str(epsilon)?,
            lambda: Fixed18::from_decimal_str(lambda)?,
        })
    }

    pub fn validate(&self) -> CurveResult<()> {
        if self.alpha.is_zero() || self.alpha >= Fixed18::ONE {
            return Err(CurveError::InvalidParams(format!(
                "alpha {} outside (0, 1)",
                self.alpha
            )));
        }
        if self.beta >= self.alpha {
            return Err(CurveError::InvalidParams(format!(
                "beta {} not below alpha {}",
                self.beta, self.alpha
            )));
        }
        if self.max > MAX_FEE_AT_HALT {
            return Err(CurveError::InvalidParams(format!(
                "max {} above {}",
                self.max, MAX_FEE_AT_HALT
            )));
        }
        if self.epsilon > MAX_EPSILON {
            return Err(CurveError::InvalidParams(format!(
                "epsilon {} above {}",
                self.epsilon, MAX_EPSILON
            )));
        }
        if self.lambda > Fixed18::ONE {
            return Err(CurveError::InvalidParams(format!(
                "lambda {} above 1",
                self.lambda
            )));
        }
        Ok(())
    }

    /// Validate and convert into the form the pricing math consumes
    ///
    /// Each fraction is nudged up by one 18-decimal unit before conversion,
    /// and `delta = max / (2·(alpha − beta))`.
    pub fn derive(&self) -> CurveResult<DerivedParams> {
        self.validate()?;

        let alpha = nudged(self.alpha)?;
        let beta = nudged(self.beta)?;
        let epsilon = nudged(self.epsilon)?;
        let lambda = nudged(self.lambda)?;
        let band = Fixed64x64::from_int(2).checked_mul(alpha.checked_sub(beta)?)?;
        let delta = Fixed64x64::from_fixed18(self.max)?
            .checked_div(band)?
            .checked_add(ONE_WEI)?;

        Ok(DerivedParams {
            alpha,
            beta,
            delta,
            epsilon,
            lambda,
        })
    }
}

impl Default for CurveParams {
    /// CADC/USDC launch parameters
    fn default() -> Self {
        Self {
            alpha: Fixed18::from_raw(800_000_000_000_000_000),
            beta: Fixed18::from_raw(500_000_000_000_000_000),
            max: Fixed18::from_raw(150_000_000_000_000_000),
            epsilon: Fixed18::from_raw(500_000_000_000_000),
            lambda: Fixed18::from_raw(300_000_000_000_000_000),
        }
    }
}

fn nudged(value: Fixed18) -> CurveResult<Fixed64x64> {
    let value = value.checked_add(Fixed18::from_raw(1))?;
    Ok(Fixed64x64::from_fixed18(value)?)
}

/// Parameters in 64.64 as used by the invariant math
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedParams {
    pub alpha: Fixed64x64,
    pub beta: Fixed64x64,
    pub delta: Fixed64x64,
    pub epsilon: Fixed64x64,
    pub lambda: Fixed64x64,
}
