//! Invariant and penalty model for two-asset pegged curves
//!
//! All quantities are numeraire values in 64.64. The pool's fair-value
//! baseline for asset `i` is `gross · w_i`. Balances inside
//! `[ideal·(1−beta), ideal·(1+beta)]` are fee-free; beyond that each asset
//! carries a quadratic micro fee, and beyond `ideal·(1±alpha)` the asset is
//! halted (it may only move back toward ideal).
//!
//! A trade is priced by fixed-point iteration: the output is the input net of
//! the change in total fee (`psi − omega`). A trade that raises the fee pays
//! the whole increase; one that lowers it earns `lambda` of the decrease,
//! capped by the penalty reserve accumulated from earlier trades.

use crate::error::{CurveError, CurveResult};
use crate::params::DerivedParams;
use serde::Serialize;
use tracing::debug;
use types::Fixed64x64;

/// Number of assets in a curve
pub const ASSET_COUNT: usize = 2;

/// Upper bound on the per-unit micro fee (0.25)
pub const MAX_MICRO_FEE: Fixed64x64 = Fixed64x64::from_raw(0x4000_0000_0000_0000);

/// Allowed utility decrease from rounding (−1e-6)
pub const INVARIANT_TOLERANCE: Fixed64x64 = Fixed64x64::from_raw(-0x10C6_F7A0_B5EE);

const MAX_ITERATIONS: usize = 32;

/// Successive outputs agreeing after division by this many raw units converge
const CONVERGENCE_GRANULARITY: i128 = 10_000_000_000_000;

/// Gross value and per-asset balances of a pool, in numeraire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Liquidity {
    pub gross: Fixed64x64,
    pub balances: [Fixed64x64; ASSET_COUNT],
}

impl Liquidity {
    pub fn from_balances(balances: [Fixed64x64; ASSET_COUNT]) -> CurveResult<Self> {
        let gross = balances
            .iter()
            .try_fold(Fixed64x64::ZERO, |acc, balance| acc.checked_add(*balance))?;
        Ok(Self { gross, balances })
    }
}

/// Result of pricing one trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeOutcome {
    /// Signed output leg; negative for an amount leaving the pool
    pub amount: Fixed64x64,
    /// Fee before the trade
    pub omega: Fixed64x64,
    /// Fee after the trade
    pub psi: Fixed64x64,
    /// Fee increase charged to the trader
    pub penalty: Fixed64x64,
    /// Bonus paid to the trader out of the penalty reserve
    pub bonus: Fixed64x64,
    pub new_liquidity: Liquidity,
}

/// Invariant math for curves; stateless
pub struct CurveMath;

impl CurveMath {
    /// Fee carried by a single balance relative to its ideal
    pub fn calculate_micro_fee(
        balance: Fixed64x64,
        ideal: Fixed64x64,
        beta: Fixed64x64,
        delta: Fixed64x64,
    ) -> CurveResult<Fixed64x64> {
        let margin = if balance < ideal {
            let threshold = ideal.checked_mul(Fixed64x64::ONE.checked_sub(beta)?)?;
            if balance >= threshold {
                return Ok(Fixed64x64::ZERO);
            }
            threshold.checked_sub(balance)?
        } else {
            let threshold = ideal.checked_mul(Fixed64x64::ONE.checked_add(beta)?)?;
            if balance <= threshold {
                return Ok(Fixed64x64::ZERO);
            }
            balance.checked_sub(threshold)?
        };

        let rate = margin.checked_div(ideal)?.checked_mul(delta)?;
        Ok(rate.min(MAX_MICRO_FEE).checked_mul(margin)?)
    }

    /// Sum of micro fees across assets
    pub fn calculate_fee(
        liquidity: &Liquidity,
        weights: &[Fixed64x64; ASSET_COUNT],
        beta: Fixed64x64,
        delta: Fixed64x64,
    ) -> CurveResult<Fixed64x64> {
        let mut fee = Fixed64x64::ZERO;
        for (balance, weight) in liquidity.balances.iter().zip(weights) {
            let ideal = liquidity.gross.checked_mul(*weight)?;
            fee = fee.checked_add(Self::calculate_micro_fee(*balance, ideal, beta, delta)?)?;
        }
        Ok(fee)
    }

    /// `gross − fee`, the quantity swaps must not decrease
    pub fn utility(
        liquidity: &Liquidity,
        weights: &[Fixed64x64; ASSET_COUNT],
        params: &DerivedParams,
    ) -> CurveResult<Fixed64x64> {
        let fee = Self::calculate_fee(liquidity, weights, params.beta, params.delta)?;
        Ok(liquidity.gross.checked_sub(fee)?)
    }

    /// Solve for the output leg of a trade
    ///
    /// `new` is the initial guess of post-trade liquidity (input applied,
    /// output assumed equal to `−input`). `input` is signed: positive for an
    /// origin swap, negative (the wanted output) for a target swap.
    pub fn calculate_trade(
        params: &DerivedParams,
        weights: &[Fixed64x64; ASSET_COUNT],
        old: &Liquidity,
        mut new: Liquidity,
        input: Fixed64x64,
        output_index: usize,
        penalty_reserve: Fixed64x64,
    ) -> CurveResult<TradeOutcome> {
        let omega = Self::calculate_fee(old, weights, params.beta, params.delta)?;
        let mut output = input.checked_neg()?;

        for iteration in 0..MAX_ITERATIONS {
            let psi = Self::calculate_fee(&new, weights, params.beta, params.delta)?;
            let previous = output;

            let (penalty, bonus) = if omega < psi {
                (psi.checked_sub(omega)?, Fixed64x64::ZERO)
            } else {
                let earned = params.lambda.checked_mul(omega.checked_sub(psi)?)?;
                (Fixed64x64::ZERO, earned.min(penalty_reserve.max(Fixed64x64::ZERO)))
            };
            output = input
                .checked_sub(penalty)?
                .checked_add(bonus)?
                .checked_neg()?;

            new.gross = old.gross.checked_add(input)?.checked_add(output)?;
            new.balances[output_index] = old.balances[output_index].checked_add(output)?;

            if output.raw_value() / CONVERGENCE_GRANULARITY
                == previous.raw_value() / CONVERGENCE_GRANULARITY
            {
                debug!(
                    iterations = iteration + 1,
                    omega = %omega,
                    psi = %psi,
                    output = %output,
                    "Trade converged"
                );
                Self::enforce_halts(params.alpha, old, &new, weights)?;
                Self::enforce_swap_invariant(old, omega, &new, psi)?;
                return Ok(TradeOutcome {
                    amount: output,
                    omega,
                    psi,
                    penalty,
                    bonus,
                    new_liquidity: new,
                });
            }
        }

        Err(CurveError::SwapConvergenceFailed)
    }

    /// A balance outside `ideal·(1±alpha)` may only move back toward ideal
    pub fn enforce_halts(
        alpha: Fixed64x64,
        old: &Liquidity,
        new: &Liquidity,
        weights: &[Fixed64x64; ASSET_COUNT],
    ) -> CurveResult<()> {
        let upper = Fixed64x64::ONE.checked_add(alpha)?;
        let lower = Fixed64x64::ONE.checked_sub(alpha)?;

        for index in 0..ASSET_COUNT {
            let weight = weights[index];
            let (old_balance, new_balance) = (old.balances[index], new.balances[index]);
            let new_ideal = new.gross.checked_mul(weight)?;

            if new_balance > new_ideal {
                let new_halt = new_ideal.checked_mul(upper)?;
                if new_balance > new_halt {
                    let old_halt = old.gross.checked_mul(weight)?.checked_mul(upper)?;
                    if old_balance < old_halt
                        || new_balance.checked_sub(new_halt)? > old_balance.checked_sub(old_halt)?
                    {
                        return Err(CurveError::UpperHalt { index });
                    }
                }
            } else {
                let new_halt = new_ideal.checked_mul(lower)?;
                if new_balance < new_halt {
                    let old_halt = old.gross.checked_mul(weight)?.checked_mul(lower)?;
                    if old_balance > old_halt
                        || new_halt.checked_sub(new_balance)? > old_halt.checked_sub(old_balance)?
                    {
                        return Err(CurveError::LowerHalt { index });
                    }
                }
            }
        }
        Ok(())
    }

    /// Utility after a swap may not fall below utility before it
    pub fn enforce_swap_invariant(
        old: &Liquidity,
        omega: Fixed64x64,
        new: &Liquidity,
        psi: Fixed64x64,
    ) -> CurveResult<()> {
        let previous = old.gross.checked_sub(omega)?;
        let next = new.gross.checked_sub(psi)?;
        let diff = next.checked_sub(previous)?;
        if diff.is_positive() || diff >= INVARIANT_TOLERANCE {
            Ok(())
        } else {
            Err(CurveError::SwapInvariantViolation)
        }
    }

    /// Utility per share may not fall when liquidity is added or removed
    ///
    /// `new_shares` is signed: negative for a withdrawal. Skipped when the
    /// pool is empty before or after the change.
    pub fn enforce_liquidity_invariant(
        total_shares: Fixed64x64,
        new_shares: Fixed64x64,
        old_gross: Fixed64x64,
        new_gross: Fixed64x64,
        omega: Fixed64x64,
        psi: Fixed64x64,
    ) -> CurveResult<()> {
        let after = total_shares.checked_add(new_shares)?;
        if total_shares.is_zero() || after.is_zero() {
            return Ok(());
        }
        let previous = old_gross.checked_sub(omega)?.checked_div(total_shares)?;
        let next = new_gross.checked_sub(psi)?.checked_div(after)?;
        let diff = next.checked_sub(previous)?;
        if diff.is_positive() || diff >= INVARIANT_TOLERANCE {
            Ok(())
        } else {
            Err(CurveError::LiquidityInvariantViolation)
        }
    }
}
