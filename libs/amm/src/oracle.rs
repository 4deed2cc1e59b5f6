//! Price oracle interface
//!
//! An oracle exposes a scaled integer answer and a fixed decimals count, the
//! Chainlink `latestAnswer()`/`decimals()` contract. The engine reads it on
//! every valuation and caches nothing, so staleness is bounded only by how
//! often the feed itself is updated.

use crate::error::{CurveError, CurveResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use types::{Address, Fixed18, FixedPointError, FixedResult};

/// Read-only rate feed shared between assimilators
pub trait PriceOracle: Send + Sync + fmt::Debug {
    /// Address the feed is registered under
    fn address(&self) -> Address;

    /// Latest scaled answer
    fn latest_answer(&self) -> i128;

    /// Number of decimals in the answer
    fn decimals(&self) -> u8;
}

/// In-process feed whose answer is set explicitly
///
/// Used for simulation and tests; the answer only changes when
/// [`FixedRateOracle::set_answer`] is called.
#[derive(Debug)]
pub struct FixedRateOracle {
    address: Address,
    decimals: u8,
    answer: RwLock<i128>,
}

impl FixedRateOracle {
    pub fn new(address: Address, answer: i128, decimals: u8) -> Self {
        Self {
            address,
            decimals,
            answer: RwLock::new(answer),
        }
    }

    /// Build from a human-readable rate such as `"0.79"`
    pub fn from_decimal_str(address: Address, rate: &str, decimals: u8) -> FixedResult<Self> {
        Self::from_rate(address, Fixed18::from_decimal_str(rate)?, decimals)
    }

    pub fn from_rate(address: Address, rate: Fixed18, decimals: u8) -> FixedResult<Self> {
        let answer = types::precision::denormalize_from_18(rate, decimals)?;
        let answer = i128::try_from(answer).map_err(|_| FixedPointError::Overflow {
            operation: "oracle_answer",
        })?;
        Ok(Self::new(address, answer, decimals))
    }

    pub fn set_answer(&self, answer: i128) {
        *self.answer.write() = answer;
    }
}

impl PriceOracle for FixedRateOracle {
    fn address(&self) -> Address {
        self.address
    }

    fn latest_answer(&self) -> i128 {
        *self.answer.read()
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }
}

/// Oracles indexed by address, used when wiring curves from configuration
#[derive(Debug, Default, Clone)]
pub struct OracleRegistry {
    oracles: HashMap<Address, Arc<dyn PriceOracle>>,
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed-rate feeds for every configured oracle
    pub fn from_config(oracles: &[config::OracleConfig]) -> CurveResult<Self> {
        let mut registry = Self::new();
        for oracle in oracles {
            let address = oracle
                .oracle_address()
                .map_err(|e| CurveError::InvalidParams(format!("{:#}", e)))?;
            let rate = Fixed18::from_decimal(oracle.rate)?;
            registry.register(Arc::new(FixedRateOracle::from_rate(
                address,
                rate,
                oracle.decimals,
            )?));
        }
        Ok(registry)
    }

    pub fn register(&mut self, oracle: Arc<dyn PriceOracle>) {
        self.oracles.insert(oracle.address(), oracle);
    }

    pub fn get(&self, address: &Address) -> Option<Arc<dyn PriceOracle>> {
        self.oracles.get(address).cloned()
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }
}
