//! Test fixtures: a deployable sample market and well-known accounts


pub use market::{router_address, Market, TokenInfo, DEADLINE_WINDOW};

use anyhow::Result;
use config::FxCurveConfig;
use types::Address;

/// Block time every scenario starts from
pub const GENESIS_TIME: u64 = 1_700_000_000;

pub const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const CADC: &str = "0xcadc0acd4b445166f12d2c07eac6e2544fbe2eef";
pub const EURS: &str = "0xdb25f211ab05b1c97d595516f45794528a807ad8";
pub const CAD_USD_ORACLE: &str = "0xa34317db73e77d453b1b8d04550c44d10e981c8e";
pub const EUR_USD_ORACLE: &str = "0xb49f677943bc038e9857d61e7d053caa2c1734c1";

/// CADC/USDC and EURS/USDC at 0.79 and 1.08 USD, default parameters,
/// whitelisting off
pub const SAMPLE_MARKET_TOML: &str = r#"
[global]
log_level = "info"
quote_token = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"

[[oracles]]
address = "0xa34317db73e77d453b1b8d04550c44d10e981c8e"
rate = "0.79"
description = "CAD / USD"

[[oracles]]
address = "0xb49f677943bc038e9857d61e7d053caa2c1734c1"
rate = "1.08"
description = "EUR / USD"

[[curves]]
name = "CADC/USDC"
symbol = "FXC-CADC"

[curves.base]
token = "0xcadc0acd4b445166f12d2c07eac6e2544fbe2eef"
decimals = 18
weight = "0.5"
oracle = "0xa34317db73e77d453b1b8d04550c44d10e981c8e"
quote_kind = "usd_per_asset"

[curves.quote]
token = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
decimals = 6
weight = "0.5"

[curves.whitelisting]
enabled = false

[[curves]]
name = "EURS/USDC"
symbol = "FXC-EURS"

[curves.base]
token = "0xdb25f211ab05b1c97d595516f45794528a807ad8"
decimals = 2
weight = "0.5"
oracle = "0xb49f677943bc038e9857d61e7d053caa2c1734c1"
quote_kind = "usd_per_asset"

[curves.quote]
token = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
decimals = 6
weight = "0.5"

[curves.whitelisting]
enabled = false
"#;

pub fn sample_config() -> Result<FxCurveConfig> {
    FxCurveConfig::from_toml_str(SAMPLE_MARKET_TOML)
}

/// Deployer and owner of every sample curve
pub fn deployer() -> Address {
    Address::from_low_u64_be(0xde9)
}

pub fn alice() -> Address {
    Address::from_low_u64_be(0xa11ce)
}

pub fn bob() -> Address {
    Address::from_low_u64_be(0xb0b)
}

pub fn trader() -> Address {
    Address::from_low_u64_be(0x7ade)
}
