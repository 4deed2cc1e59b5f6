//! Assimilators: per-asset adapters between raw token units and numeraire
//!
//! The numeraire is USD expressed as a [`Fixed64x64`]. An assimilator knows
//! its token's native decimals and how to read the asset's oracle; it owns no
//! balances itself. The side-effecting variants only *plan* transfers into a
//! [`Settlement`], which the curve later hands to the ledger in one batch.
//!
//! Conversions reduce to a single ratio `numeraire = raw · num / den`:
//!
//! | quote kind | num | den |
//! |---|---|---|
//! | `UsdPerAsset` | `rate` | `10^token · 10^oracle` |
//! | `AssetPerUsd` | `10^oracle` | `10^token · rate` |
//! | `Pegged` | `1` | `10^token` |

use crate::error::{CurveError, CurveResult};
use crate::ledger::{Settlement, TokenLedger};
use crate::oracle::PriceOracle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use types::precision::scale_factor;
use types::{Address, Fixed64x64, FixedPointError, QuoteKind, U256};

/// Deployment-specific wiring injected at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssimilatorConfig {
    pub token: Address,
    pub token_decimals: u8,
    /// Numeraire-side token this adapter prices against (USDC)
    pub quote: Address,
    pub oracle: Option<Address>,
    pub oracle_decimals: u8,
    pub quote_kind: QuoteKind,
}

impl AssimilatorConfig {
    /// Adapter for the quote token itself, valued 1:1
    pub fn pegged(token: Address, token_decimals: u8) -> Self {
        Self {
            token,
            token_decimals,
            quote: token,
            oracle: None,
            oracle_decimals: 0,
            quote_kind: QuoteKind::Pegged,
        }
    }

    /// Adapter for an asset whose oracle quotes USD per asset unit
    pub fn usd_per_asset(
        token: Address,
        token_decimals: u8,
        quote: Address,
        oracle: Address,
        oracle_decimals: u8,
    ) -> Self {
        Self {
            token,
            token_decimals,
            quote,
            oracle: Some(oracle),
            oracle_decimals,
            quote_kind: QuoteKind::UsdPerAsset,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Assimilator {
    config: AssimilatorConfig,
    oracle: Option<Arc<dyn PriceOracle>>,
}

impl Assimilator {
    /// Bind a configuration to its oracle feed
    ///
    /// Pegged adapters take no oracle; every other quote kind requires one
    /// whose address matches the configuration.
    pub fn new(
        config: AssimilatorConfig,
        oracle: Option<Arc<dyn PriceOracle>>,
    ) -> CurveResult<Self> {
        scale_factor(config.token_decimals)?;
        scale_factor(config.oracle_decimals)?;

        match (config.quote_kind.requires_oracle(), &oracle, config.oracle) {
            (false, None, _) => {}
            (true, Some(feed), Some(expected)) if feed.address() == expected => {}
            (true, Some(feed), Some(expected)) => {
                return Err(CurveError::InvalidParams(format!(
                    "oracle {} bound where {} was configured",
                    feed.address(),
                    expected
                )))
            }
            (true, _, expected) => {
                return Err(CurveError::MissingOracle(expected.unwrap_or_default()))
            }
            (false, Some(_), _) => {
                return Err(CurveError::InvalidParams(
                    "pegged assimilator takes no oracle".to_string(),
                ))
            }
        }

        Ok(Self { config, oracle })
    }

    pub fn config(&self) -> &AssimilatorConfig {
        &self.config
    }

    pub fn token(&self) -> Address {
        self.config.token
    }

    pub fn token_decimals(&self) -> u8 {
        self.config.token_decimals
    }

    /// Current oracle rate, or `None` for a pegged asset
    pub fn rate(&self) -> CurveResult<Option<u128>> {
        let Some(oracle) = &self.oracle else {
            return Ok(None);
        };
        let answer = oracle.latest_answer();
        if answer < 0 {
            return Err(CurveError::InvalidOracleAnswer {
                oracle: oracle.address(),
                answer,
            });
        }
        Ok(Some(answer as u128))
    }

    /// `(num, den)` such that `numeraire = raw · num / den`
    fn conversion(&self) -> CurveResult<(U256, U256)> {
        let token_scale = U256::from(scale_factor(self.config.token_decimals)?);
        let oracle_scale = U256::from(scale_factor(self.config.oracle_decimals)?);
        let rate = self.rate()?.map(U256::from).unwrap_or_else(U256::one);

        let pair = match self.config.quote_kind {
            QuoteKind::Pegged => (U256::one(), token_scale),
            QuoteKind::UsdPerAsset => (rate, token_scale * oracle_scale),
            QuoteKind::AssetPerUsd => (oracle_scale, token_scale * rate),
        };
        Ok(pair)
    }

    /// Raw token units → numeraire, truncated
    pub fn view_numeraire_amount(&self, raw: u128) -> CurveResult<Fixed64x64> {
        let (num, den) = self.conversion()?;
        let scaled = U256::from(raw)
            .checked_mul(num)
            .ok_or(FixedPointError::Overflow {
                operation: "view_numeraire_amount",
            })?;
        Ok(Fixed64x64::from_ratio_wide(scaled, den)?)
    }

    /// Numeraire → raw token units, truncated toward zero
    pub fn view_raw_amount(&self, numeraire: Fixed64x64) -> CurveResult<u128> {
        self.raw_amount(numeraire, false)
    }

    /// Numeraire → raw token units, rounded up so the pool is never short
    pub fn view_raw_amount_ceil(&self, numeraire: Fixed64x64) -> CurveResult<u128> {
        self.raw_amount(numeraire, true)
    }

    fn raw_amount(&self, numeraire: Fixed64x64, round_up: bool) -> CurveResult<u128> {
        if numeraire.is_negative() {
            return Err(FixedPointError::Underflow {
                operation: "view_raw_amount",
            }
            .into());
        }
        let (num, den) = self.conversion()?;
        let overflow = FixedPointError::Overflow {
            operation: "view_raw_amount",
        };
        let numerator = U256::from(numeraire.raw_value() as u128)
            .checked_mul(den)
            .ok_or(overflow.clone())?;
        let divisor = num
            .checked_mul(U256::from(1u128 << 64))
            .ok_or(overflow.clone())?;
        if divisor.is_zero() {
            return Err(FixedPointError::DivisionByZero.into());
        }
        let quotient = if round_up {
            (numerator + divisor - U256::one()) / divisor
        } else {
            numerator / divisor
        };
        if quotient.bits() > 128 {
            return Err(overflow.into());
        }
        Ok(quotient.low_u128())
    }

    /// Numeraire value of `holder`'s balance of this asset
    pub fn view_numeraire_balance(
        &self,
        ledger: &dyn TokenLedger,
        holder: Address,
    ) -> CurveResult<Fixed64x64> {
        self.view_numeraire_amount(ledger.balance_of(self.config.token, holder))
    }

    /// Balance valued from the quote reserve and the weight ratio instead of
    /// the oracle, so deposits into a funded pool follow its raw reserve ratio
    pub fn view_numeraire_balance_lp_ratio(
        &self,
        ledger: &dyn TokenLedger,
        holder: Address,
        quote_numeraire_balance: Fixed64x64,
        weight: Fixed64x64,
        quote_weight: Fixed64x64,
    ) -> CurveResult<Fixed64x64> {
        if ledger.balance_of(self.config.token, holder) == 0 {
            return Ok(Fixed64x64::ZERO);
        }
        Ok(quote_numeraire_balance
            .checked_div(quote_weight)?
            .checked_mul(weight)?)
    }

    /// Plan a pull of `raw` tokens from `payer`; returns the numeraire credited
    pub fn intake_raw(
        &self,
        settlement: &mut Settlement,
        payer: Address,
        pool: Address,
        raw: u128,
    ) -> CurveResult<Fixed64x64> {
        let numeraire = self.view_numeraire_amount(raw)?;
        settlement.pull(self.config.token, payer, pool, pool, raw);
        Ok(numeraire)
    }

    /// Plan a pull worth `numeraire`, rounded up; returns the raw amount
    pub fn intake_numeraire(
        &self,
        settlement: &mut Settlement,
        payer: Address,
        pool: Address,
        numeraire: Fixed64x64,
    ) -> CurveResult<u128> {
        let raw = self.view_raw_amount_ceil(numeraire)?;
        settlement.pull(self.config.token, payer, pool, pool, raw);
        Ok(raw)
    }

    /// Plan a pull of `numeraire` valued at the reserve ratio:
    /// `raw = ceil(pool_raw · numeraire / lp_ratio_balance)`
    pub fn intake_numeraire_lp_ratio(
        &self,
        settlement: &mut Settlement,
        ledger: &dyn TokenLedger,
        payer: Address,
        pool: Address,
        numeraire: Fixed64x64,
        lp_ratio_balance: Fixed64x64,
    ) -> CurveResult<u128> {
        if !lp_ratio_balance.is_positive() {
            return Err(FixedPointError::DivisionByZero.into());
        }
        if numeraire.is_negative() {
            return Err(FixedPointError::Underflow {
                operation: "intake_numeraire_lp_ratio",
            }
            .into());
        }
        let pool_raw = U256::from(ledger.balance_of(self.config.token, pool));
        let numerator = pool_raw * U256::from(numeraire.raw_value() as u128);
        let divisor = U256::from(lp_ratio_balance.raw_value() as u128);
        let raw = (numerator + divisor - U256::one()) / divisor;
        if raw.bits() > 128 {
            return Err(FixedPointError::Overflow {
                operation: "intake_numeraire_lp_ratio",
            }
            .into());
        }
        let raw = raw.low_u128();
        settlement.pull(self.config.token, payer, pool, pool, raw);
        Ok(raw)
    }

    /// Plan a push of `raw` tokens to `recipient`; returns the numeraire paid
    pub fn output_raw(
        &self,
        settlement: &mut Settlement,
        pool: Address,
        recipient: Address,
        raw: u128,
    ) -> CurveResult<Fixed64x64> {
        let numeraire = self.view_numeraire_amount(raw)?;
        settlement.push(self.config.token, pool, recipient, raw);
        Ok(numeraire)
    }

    /// Plan a push worth `numeraire`, truncated; returns the raw amount
    pub fn output_numeraire(
        &self,
        settlement: &mut Settlement,
        pool: Address,
        recipient: Address,
        numeraire: Fixed64x64,
    ) -> CurveResult<u128> {
        let raw = self.view_raw_amount(numeraire)?;
        settlement.push(self.config.token, pool, recipient, raw);
        Ok(raw)
    }
}

/// Assimilators keyed by `(token, quote)`
#[derive(Debug, Default, Clone)]
pub struct AssimilatorRegistry {
    assimilators: HashMap<(Address, Address), Arc<Assimilator>>,
}

impl AssimilatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for the same pair
    pub fn register(&mut self, assimilator: Assimilator) -> Arc<Assimilator> {
        let key = (assimilator.config.token, assimilator.config.quote);
        let assimilator = Arc::new(assimilator);
        self.assimilators.insert(key, Arc::clone(&assimilator));
        assimilator
    }

    pub fn get(&self, token: Address, quote: Address) -> CurveResult<Arc<Assimilator>> {
        self.assimilators
            .get(&(token, quote))
            .cloned()
            .ok_or(CurveError::MissingAssimilator { token, quote })
    }

    pub fn len(&self) -> usize {
        self.assimilators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assimilators.is_empty()
    }
}
