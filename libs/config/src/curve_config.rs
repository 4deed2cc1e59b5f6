//! Curve deployment configuration
//!
//! Loads oracle and curve definitions from a TOML file, layered with
//! `FXCURVE_`-prefixed environment overrides. Addresses and roots stay as
//! strings until validation so they can reference environment variables
//! (`token = "${CADC_ADDRESS}"`).

use crate::defaults;
use crate::logging::LogFormat;
use anyhow::{bail, ensure, Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use types::{Address, Hash256, QuoteKind};

/// Root of an FXCurve configuration file
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FxCurveConfig {
    #[serde(default)]
    pub global: GlobalConfig,

    #[serde(default)]
    pub oracles: Vec<OracleConfig>,

    #[serde(default)]
    pub curves: Vec<CurveConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Intermediate currency for two-hop routes
    pub quote_token: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::loader::LOG_LEVEL.to_string(),
            log_format: LogFormat::default(),
            quote_token: None,
        }
    }
}

impl GlobalConfig {
    pub fn quote_token_address(&self) -> Result<Option<Address>> {
        self.quote_token
            .as_deref()
            .map(|value| parse_field("quote_token", value))
            .transpose()
    }
}

/// Fixed-rate price feed
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OracleConfig {
    pub address: String,
    /// Answer as a decimal, e.g. `0.79` USD per CAD
    pub rate: Decimal,
    #[serde(default = "default_oracle_decimals")]
    pub decimals: u8,
    #[serde(default)]
    pub description: Option<String>,
}

impl OracleConfig {
    pub fn oracle_address(&self) -> Result<Address> {
        parse_field("oracle address", &self.address)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CurveConfig {
    pub name: String,
    pub symbol: String,
    pub base: AssetConfig,
    pub quote: AssetConfig,
    #[serde(default)]
    pub params: ParamsConfig,
    #[serde(default)]
    pub whitelisting: WhitelistingConfig,
}

/// One side of a curve
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssetConfig {
    pub token: String,
    pub decimals: u8,
    /// Target share of pool value, e.g. `0.5`
    pub weight: Decimal,
    #[serde(default)]
    pub oracle: Option<String>,
    #[serde(default = "default_oracle_decimals")]
    pub oracle_decimals: u8,
    #[serde(default = "default_quote_kind")]
    pub quote_kind: QuoteKind,
}

impl AssetConfig {
    pub fn token_address(&self) -> Result<Address> {
        parse_field("token", &self.token)
    }

    pub fn oracle_address(&self) -> Result<Option<Address>> {
        self.oracle
            .as_deref()
            .map(|value| parse_field("oracle", value))
            .transpose()
    }
}

/// Curve parameters as decimal fractions
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParamsConfig {
    pub alpha: Decimal,
    pub beta: Decimal,
    pub max: Decimal,
    pub epsilon: Decimal,
    pub lambda: Decimal,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            alpha: defaults::params::ALPHA,
            beta: defaults::params::BETA,
            max: defaults::params::MAX,
            epsilon: defaults::params::EPSILON,
            lambda: defaults::params::LAMBDA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WhitelistingConfig {
    /// Start in the guarded launch phase
    pub enabled: bool,
    /// Last timestamp at which whitelisted deposits are accepted
    pub deadline: Option<u64>,
    pub merkle_root: Option<String>,
}

impl Default for WhitelistingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            deadline: None,
            merkle_root: None,
        }
    }
}

impl WhitelistingConfig {
    pub fn merkle_root(&self) -> Result<Option<Hash256>> {
        self.merkle_root
            .as_deref()
            .map(|value| parse_field("merkle_root", value))
            .transpose()
    }
}

fn default_oracle_decimals() -> u8 {
    defaults::assets::ORACLE_DECIMALS
}

fn default_quote_kind() -> QuoteKind {
    QuoteKind::Pegged
}

fn parse_field<T>(field: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid {} '{}'", field, value))
}

fn expand(value: &mut String, what: &str) -> Result<()> {
    let expanded = shellexpand::env(value.as_str())
        .with_context(|| format!("Failed to expand {}", what))?;
    *value = expanded.into_owned();
    Ok(())
}

fn expand_opt(value: &mut Option<String>, what: &str) -> Result<()> {
    match value {
        Some(value) => expand(value, what),
        None => Ok(()),
    }
}

impl FxCurveConfig {
    /// Load configuration from a TOML file with environment overrides
    ///
    /// Nested keys are overridden with `FXCURVE_<SECTION>__<KEY>`, e.g.
    /// `FXCURVE_GLOBAL__LOG_LEVEL=debug`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or(Path::new(defaults::loader::CONFIG_PATH));
        info!("Loading configuration: {:?}", path);

        let config = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(
                Environment::with_prefix(defaults::loader::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(defaults::loader::ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Parse configuration from TOML text without environment layering
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Expand environment variables in address and root values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        expand_opt(&mut self.global.quote_token, "quote token")?;
        for oracle in &mut self.oracles {
            expand(&mut oracle.address, "oracle address")?;
        }
        for curve in &mut self.curves {
            for asset in [&mut curve.base, &mut curve.quote] {
                expand(&mut asset.token, "token address")?;
                expand_opt(&mut asset.oracle, "oracle address")?;
            }
            expand_opt(&mut curve.whitelisting.merkle_root, "merkle root")?;
        }
        Ok(())
    }

    /// Check addresses, oracle bindings, weights and parameter ordering
    ///
    /// Upper bounds on fees are enforced again when parameters are applied
    /// to a curve.
    pub fn validate(&self) -> Result<()> {
        self.global.quote_token_address()?;

        let mut oracles = HashSet::new();
        for oracle in &self.oracles {
            let address = oracle.oracle_address()?;
            ensure!(
                oracle.rate > Decimal::ZERO,
                "Oracle {} rate must be positive, got {}",
                address,
                oracle.rate
            );
            ensure!(oracles.insert(address), "Oracle {} declared twice", address);
        }

        for curve in &self.curves {
            curve
                .validate(&oracles)
                .with_context(|| format!("Invalid curve '{}'", curve.name))?;
        }
        debug!(
            oracles = self.oracles.len(),
            curves = self.curves.len(),
            "Configuration validated"
        );
        Ok(())
    }

    pub fn curve(&self, name: &str) -> Option<&CurveConfig> {
        self.curves.iter().find(|curve| curve.name == name)
    }
}

impl CurveConfig {
    fn validate(&self, oracles: &HashSet<Address>) -> Result<()> {
        ensure!(!self.symbol.is_empty(), "Symbol must not be empty");
        let base = self.base.validate(oracles).context("base asset")?;
        let quote = self.quote.validate(oracles).context("quote asset")?;
        ensure!(base != quote, "Base and quote are the same token {}", base);
        ensure!(
            self.base.weight + self.quote.weight == Decimal::ONE,
            "Weights {} and {} do not sum to 1",
            self.base.weight,
            self.quote.weight
        );

        let params = &self.params;
        ensure!(
            params.alpha > Decimal::ZERO && params.alpha < Decimal::ONE,
            "alpha {} outside (0, 1)",
            params.alpha
        );
        ensure!(
            params.beta >= Decimal::ZERO && params.beta < params.alpha,
            "beta {} must be non-negative and below alpha {}",
            params.beta,
            params.alpha
        );
        for (name, value) in [
            ("max", params.max),
            ("epsilon", params.epsilon),
            ("lambda", params.lambda),
        ] {
            ensure!(value >= Decimal::ZERO, "{} {} is negative", name, value);
        }

        self.whitelisting.merkle_root()?;
        Ok(())
    }
}

impl AssetConfig {
    fn validate(&self, oracles: &HashSet<Address>) -> Result<Address> {
        let token = self.token_address()?;
        ensure!(
            self.decimals <= defaults::assets::MAX_TOKEN_DECIMALS,
            "{} decimals exceed {}",
            self.decimals,
            defaults::assets::MAX_TOKEN_DECIMALS
        );
        ensure!(
            self.weight > Decimal::ZERO,
            "Weight must be positive, got {}",
            self.weight
        );
        match (self.quote_kind.requires_oracle(), self.oracle_address()?) {
            (true, None) => bail!("Quote kind {:?} needs an oracle", self.quote_kind),
            (false, Some(oracle)) => bail!("Pegged asset must not name oracle {}", oracle),
            (true, Some(oracle)) => {
                ensure!(oracles.contains(&oracle), "Oracle {} is not declared", oracle)
            }
            (false, None) => {}
        }
        Ok(token)
    }
}

/// Load, expand and validate configuration
pub fn load_config(path: Option<&Path>) -> Result<FxCurveConfig> {
    let mut config = FxCurveConfig::load(path)?;
    config.expand_env_vars()?;
    config.validate()?;
    Ok(config)
}
