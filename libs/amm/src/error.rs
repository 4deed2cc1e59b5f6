//! Error taxonomy for the curve engine
//!
//! Every failure aborts the whole operation: pools only mutate after the
//! token settlement succeeded, so an `Err` always means "nothing happened".

use thiserror::Error;
use types::{Address, Fixed18, FixedPointError};

pub type CurveResult<T> = Result<T, CurveError>;

/// Token movement rejected by the ledger
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient {token} balance for {holder}: needed {needed}, available {available}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        needed: u128,
        available: u128,
    },

    #[error(
        "insufficient {token} allowance from {owner} to {spender}: needed {needed}, approved {approved}"
    )]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        needed: u128,
        approved: u128,
    },

    #[error("{token} balance of {holder} would overflow")]
    BalanceOverflow { token: Address, holder: Address },
}

/// Errors surfaced by curves, the factory and the router
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("deadline {deadline} passed (now {now})")]
    Expired { deadline: u64, now: u64 },

    #[error("slippage bound violated: limit {limit}, actual {actual}")]
    SlippageExceeded { limit: u128, actual: u128 },

    #[error(transparent)]
    Arithmetic(#[from] FixedPointError),

    #[error("token transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    #[error("{account} is not whitelisted")]
    NotWhitelisted { account: Address },

    #[error("whitelist cap {cap} exceeded by {account}: cumulative deposit would be {attempted}")]
    WhitelistCapExceeded {
        account: Address,
        cap: Fixed18,
        attempted: Fixed18,
    },

    #[error("whitelisting period has ended")]
    WhitelistPeriodEnded,

    #[error("curve {curve} already exists for pair {base}/{quote}")]
    PairExists {
        base: Address,
        quote: Address,
        curve: Address,
    },

    #[error("invalid curve parameters: {0}")]
    InvalidParams(String),

    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    #[error("{caller} is not the owner")]
    PermissionDenied { caller: Address },

    #[error("curve parameters have not been set")]
    ParamsNotSet,

    #[error("new parameters would increase the pool fee")]
    ParamsIncreaseFee,

    #[error("curve is frozen")]
    Frozen,

    #[error("curve is in emergency mode")]
    Emergency,

    #[error("curve is not in emergency mode")]
    NotEmergency,

    #[error("{0} is not an asset of this curve")]
    UnknownAsset(Address),

    #[error("no curve at {0}")]
    UnknownCurve(Address),

    #[error("assimilator for {actual} bound where {expected} was expected")]
    AssimilatorMismatch { expected: Address, actual: Address },

    #[error("no assimilator registered for {token} against {quote}")]
    MissingAssimilator { token: Address, quote: Address },

    #[error("no oracle registered at {0}")]
    MissingOracle(Address),

    #[error("oracle {oracle} returned unusable answer {answer}")]
    InvalidOracleAnswer { oracle: Address, answer: i128 },

    #[error("asset {index} would cross its upper halt")]
    UpperHalt { index: usize },

    #[error("asset {index} would cross its lower halt")]
    LowerHalt { index: usize },

    #[error("swap would decrease pool utility")]
    SwapInvariantViolation,

    #[error("liquidity change would decrease utility per share")]
    LiquidityInvariantViolation,

    #[error("swap did not converge")]
    SwapConvergenceFailed,

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("curve has no liquidity")]
    NoLiquidity,

    #[error("{account} holds {available} shares, {requested} requested")]
    InsufficientShares {
        account: Address,
        requested: Fixed18,
        available: Fixed18,
    },

    #[error("{spender} may move {approved} shares of {owner}, {requested} requested")]
    InsufficientShareAllowance {
        owner: Address,
        spender: Address,
        requested: Fixed18,
        approved: Fixed18,
    },

    #[error("no route from {origin} to {target}")]
    NoPath { origin: Address, target: Address },
}

impl CurveError {
    /// Economic rejections can succeed if resubmitted with adjusted bounds;
    /// everything else is structural and should be abandoned.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SlippageExceeded { .. } | Self::WhitelistCapExceeded { .. }
        )
    }
}
