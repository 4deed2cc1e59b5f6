//! Curve factory and pair registry
//!
//! Pairs are keyed canonically: `(A, B)` and `(B, A)` resolve to the same
//! curve, so a pair can only ever be listed once. The curve address is
//! derived from the canonical pair, which makes it deterministic.

use crate::assimilator::{Assimilator, AssimilatorConfig, AssimilatorRegistry};
use crate::error::{CurveError, CurveResult};
use crate::events::FactoryEvent;
use crate::ledger::TokenLedger;
use crate::oracle::OracleRegistry;
use crate::params::CurveParams;
use crate::pool::{Curve, CurveAsset, ExecutionContext};
use crate::whitelist::MerkleAllowlist;
use sha3::{Digest, Keccak256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use types::{Address, Fixed18};

const CURVE_ADDRESS_DOMAIN: &[u8] = b"fxcurve";

/// Order-insensitive key for a token pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(Address, Address);

impl PairKey {
    pub fn new(a: Address, b: Address) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    pub fn tokens(&self) -> (Address, Address) {
        (self.0, self.1)
    }

    /// Deterministic curve address: low 20 bytes of
    /// `keccak256("fxcurve" ‖ lower ‖ higher)`
    pub fn curve_address(&self) -> Address {
        let mut hasher = Keccak256::new();
        hasher.update(CURVE_ADDRESS_DOMAIN);
        hasher.update(self.0.as_bytes());
        hasher.update(self.1.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        let mut address = [0u8; Address::LEN];
        address.copy_from_slice(&digest[32 - Address::LEN..]);
        Address::new(address)
    }
}

/// Arguments of [`CurveFactory::new_curve`]
#[derive(Debug, Clone)]
pub struct NewCurve {
    pub name: String,
    pub symbol: String,
    pub base: Address,
    pub quote: Address,
    pub base_weight: Fixed18,
    pub quote_weight: Fixed18,
    pub base_assimilator: Arc<Assimilator>,
    pub quote_assimilator: Arc<Assimilator>,
}

#[derive(Debug, Default)]
pub struct CurveFactory {
    curves: HashMap<Address, Curve>,
    pairs: HashMap<PairKey, Address>,
    assimilators: AssimilatorRegistry,
    events: Vec<FactoryEvent>,
}

impl CurveFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an assimilator for later lookup by `(token, quote)`
    pub fn register_assimilator(&mut self, assimilator: Assimilator) -> Arc<Assimilator> {
        self.assimilators.register(assimilator)
    }

    pub fn assimilator(&self, token: Address, quote: Address) -> CurveResult<Arc<Assimilator>> {
        self.assimilators.get(token, quote)
    }

    /// Create a curve for a pair not yet listed; the caller becomes its owner
    pub fn new_curve(&mut self, ctx: &ExecutionContext, request: NewCurve) -> CurveResult<Address> {
        for (token, assimilator) in [
            (request.base, &request.base_assimilator),
            (request.quote, &request.quote_assimilator),
        ] {
            if assimilator.token() != token {
                return Err(CurveError::AssimilatorMismatch {
                    expected: token,
                    actual: assimilator.token(),
                });
            }
        }

        let key = PairKey::new(request.base, request.quote);
        if let Some(existing) = self.pairs.get(&key) {
            return Err(CurveError::PairExists {
                base: request.base,
                quote: request.quote,
                curve: *existing,
            });
        }

        let address = key.curve_address();
        let curve = Curve::new(
            address,
            request.name,
            request.symbol,
            ctx.caller,
            CurveAsset::new(request.base_assimilator, request.base_weight),
            CurveAsset::new(request.quote_assimilator, request.quote_weight),
        )?;

        info!(
            curve = %address,
            caller = %ctx.caller,
            base = %request.base,
            quote = %request.quote,
            name = curve.name(),
            "New curve"
        );
        self.curves.insert(address, curve);
        self.pairs.insert(key, address);
        self.events.push(FactoryEvent::NewCurve {
            caller: ctx.caller,
            curve: address,
            base: request.base,
            quote: request.quote,
        });
        Ok(address)
    }

    /// Build, parameterize and register a curve from configuration
    ///
    /// Assimilators are created for both assets (oracles looked up in
    /// `oracles`) and registered in the factory; parameters and whitelisting
    /// settings are applied with `ctx.caller` as owner.
    pub fn new_curve_from_config(
        &mut self,
        ctx: &ExecutionContext,
        ledger: &dyn TokenLedger,
        config: &config::CurveConfig,
        oracles: &OracleRegistry,
    ) -> CurveResult<Address> {
        let invalid = |err: anyhow::Error| CurveError::InvalidParams(format!("{:#}", err));

        let quote_token = config.quote.token_address().map_err(invalid)?;
        let mut bound = Vec::with_capacity(2);
        for asset in [&config.base, &config.quote] {
            let token = asset.token_address().map_err(invalid)?;
            let oracle_address = asset.oracle_address().map_err(invalid)?;
            let oracle = match oracle_address {
                Some(address) => Some(
                    oracles
                        .get(&address)
                        .ok_or(CurveError::MissingOracle(address))?,
                ),
                None => None,
            };
            let assimilator = Assimilator::new(
                AssimilatorConfig {
                    token,
                    token_decimals: asset.decimals,
                    quote: quote_token,
                    oracle: oracle_address,
                    oracle_decimals: asset.oracle_decimals,
                    quote_kind: asset.quote_kind,
                },
                oracle,
            )?;
            let weight = Fixed18::from_decimal(asset.weight)?;
            bound.push((token, self.register_assimilator(assimilator), weight));
        }

        let (quote, quote_assimilator, quote_weight) = bound.remove(1);
        let (base, base_assimilator, base_weight) = bound.remove(0);
        let address = self.new_curve(
            ctx,
            NewCurve {
                name: config.name.clone(),
                symbol: config.symbol.clone(),
                base,
                quote,
                base_weight,
                quote_weight,
                base_assimilator,
                quote_assimilator,
            },
        )?;

        let params = &config.params;
        let params = CurveParams {
            alpha: Fixed18::from_decimal(params.alpha)?,
            beta: Fixed18::from_decimal(params.beta)?,
            max: Fixed18::from_decimal(params.max)?,
            epsilon: Fixed18::from_decimal(params.epsilon)?,
            lambda: Fixed18::from_decimal(params.lambda)?,
        };
        let whitelisting = &config.whitelisting;
        let merkle_root = whitelisting.merkle_root().map_err(invalid)?;

        let curve = self.curve_mut(address)?;
        curve.set_params(ctx, ledger, params)?;
        if let Some(root) = merkle_root {
            curve.set_allowlist(ctx, Arc::new(MerkleAllowlist::new(root)))?;
        }
        if let Some(deadline) = whitelisting.deadline {
            curve.set_whitelisting_deadline(ctx, deadline)?;
        }
        if !whitelisting.enabled {
            curve.turn_off_whitelisting(ctx)?;
        }
        Ok(address)
    }

    /// Curve listed for the pair, in either order
    pub fn get_curve(&self, a: Address, b: Address) -> Option<Address> {
        self.pairs.get(&PairKey::new(a, b)).copied()
    }

    pub fn curve(&self, address: Address) -> CurveResult<&Curve> {
        self.curves
            .get(&address)
            .ok_or(CurveError::UnknownCurve(address))
    }

    pub fn curve_mut(&mut self, address: Address) -> CurveResult<&mut Curve> {
        self.curves
            .get_mut(&address)
            .ok_or(CurveError::UnknownCurve(address))
    }

    pub fn curves(&self) -> impl Iterator<Item = &Curve> {
        self.curves.values()
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn events(&self) -> &[FactoryEvent] {
        &self.events
    }
}
