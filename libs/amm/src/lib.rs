//! # FXCurve AMM Library
//!
//! ## Purpose
//!
//! Oracle-assisted automated market maker for pairs of pegged assets
//! (stablecoins and FX-backed tokens). Each curve holds two assets at fixed
//! target weights and prices trades near the oracle rate, charging a growing
//! fee as the pool drifts from balance and refusing trades that push it past
//! hard halt boundaries.
//!
//! ## Architecture
//!
//! - [`assimilator`]: converts raw token amounts to and from the shared
//!   numeraire (USD value, 64.64 fixed point) using [`oracle`] rates
//! - [`curve_math`]: stateless fee, trade-solving, halt and invariant math
//! - [`pool`]: the [`Curve`] state machine, including LP shares, deposits,
//!   withdrawals, swaps and owner administration
//! - [`factory`]: deterministic curve creation and the pair registry
//! - [`router`]: direct and two-hop swaps through a quote currency
//! - [`ledger`]: the token balance seam; operations produce a [`Settlement`]
//!   that the [`TokenLedger`] applies all-or-nothing
//! - [`whitelist`]: merkle allowlist for the guarded launch phase
//!
//! ## Quick Start
//!
//! ```rust
//! use amm::{
//!     Assimilator, AssimilatorConfig, CurveFactory, CurveParams, ExecutionContext,
//!     InMemoryLedger, NewCurve, TokenLedger,
//! };
//! use std::sync::Arc;
//! use types::{Address, Fixed18};
//!
//! let (owner, usdc, usdt) = (
//!     Address::from_low_u64_be(1),
//!     Address::from_low_u64_be(0xa0),
//!     Address::from_low_u64_be(0xb0),
//! );
//! let ctx = ExecutionContext::new(owner, 1_000);
//! let mut ledger = InMemoryLedger::new();
//! let mut factory = CurveFactory::new();
//!
//! let half = Fixed18::from_decimal_str("0.5").unwrap();
//! let curve = factory
//!     .new_curve(
//!         &ctx,
//!         NewCurve {
//!             name: "USDC/USDT".into(),
//!             symbol: "FXC-USD".into(),
//!             base: usdc,
//!             quote: usdt,
//!             base_weight: half,
//!             quote_weight: half,
//!             base_assimilator: Arc::new(
//!                 Assimilator::new(AssimilatorConfig::pegged(usdc, 6), None).unwrap(),
//!             ),
//!             quote_assimilator: Arc::new(
//!                 Assimilator::new(AssimilatorConfig::pegged(usdt, 6), None).unwrap(),
//!             ),
//!         },
//!     )
//!     .unwrap();
//!
//! let pool = factory.curve_mut(curve).unwrap();
//! pool.set_params(&ctx, &ledger, CurveParams::default()).unwrap();
//! pool.turn_off_whitelisting(&ctx).unwrap();
//!
//! for token in [usdc, usdt] {
//!     ledger.mint(token, owner, 1_000_000_000).unwrap();
//!     ledger.approve(token, owner, curve, u128::MAX);
//! }
//! let quote = pool
//!     .deposit(&ctx, &mut ledger, Fixed18::from_units(200), 2_000)
//!     .unwrap();
//! assert_eq!(quote.shares, Fixed18::from_units(200));
//! assert_eq!(quote.amounts, [100_000_000, 100_000_000]);
//! ```

pub mod assimilator;
pub mod curve_math;
pub mod error;
pub mod events;
pub mod factory;
pub mod ledger;
pub mod oracle;
pub mod params;
pub mod pool;
pub mod router;
pub mod whitelist;

pub use assimilator::{Assimilator, AssimilatorConfig, AssimilatorRegistry};
pub use curve_math::{CurveMath, Liquidity, TradeOutcome, ASSET_COUNT};
pub use error::{CurveError, CurveResult, TransferError};
pub use events::{CurveEvent, FactoryEvent};
pub use factory::{CurveFactory, NewCurve, PairKey};
pub use ledger::{InMemoryLedger, Settlement, TokenLedger, TokenMovement, UNLIMITED_ALLOWANCE};
pub use oracle::{FixedRateOracle, OracleRegistry, PriceOracle};
pub use params::{CurveParams, DerivedParams};
pub use pool::{
    Curve, CurveAsset, CurveSnapshot, CurveStage, ExecutionContext, LiquidityQuote, SwapQuote,
    BASE, QUOTE,
};
pub use router::{Route, Router};
pub use whitelist::{
    leaf_hash, AllowlistClaim, AllowlistVerifier, DenyAll, MerkleAllowlist, MerkleTree,
    SpentTracker,
};
