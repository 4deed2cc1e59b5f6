//! Default configuration values
//!
//! Curve defaults mirror the CADC/USDC launch deployment.

/// Curve parameter defaults
pub mod params {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Halt band half-width
    pub const ALPHA: Decimal = dec!(0.8);

    /// Fee-free band half-width
    pub const BETA: Decimal = dec!(0.5);

    /// Fee charged at the halt boundary
    pub const MAX: Decimal = dec!(0.15);

    /// Flat swap fee (5 bps)
    pub const EPSILON: Decimal = dec!(0.0005);

    /// Share of fee reduction paid back as a bonus
    pub const LAMBDA: Decimal = dec!(0.3);
}

/// Asset defaults
pub mod assets {
    /// Decimals of Chainlink-style USD feeds
    pub const ORACLE_DECIMALS: u8 = 8;

    /// Largest token decimals accepted
    pub const MAX_TOKEN_DECIMALS: u8 = 36;
}

/// Loader defaults
pub mod loader {
    /// Configuration file read when no path is given
    pub const CONFIG_PATH: &str = "config/fxcurve.toml";

    /// Prefix of environment variable overrides (`FXCURVE_GLOBAL__LOG_LEVEL`)
    pub const ENV_PREFIX: &str = "FXCURVE";

    /// Separator between nested keys in environment overrides
    pub const ENV_SEPARATOR: &str = "__";

    pub const LOG_LEVEL: &str = "info";
}
