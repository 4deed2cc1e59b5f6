//! # FXCurve Configuration
//!
//! Deployment configuration for FXCurve: oracle feeds, curve definitions,
//! parameters and whitelisting, loaded from TOML with environment overrides.
//!
//! ## Usage
//!
//! ```rust
//! use config::{defaults, FxCurveConfig};
//!
//! let config = FxCurveConfig::from_toml_str(
//!     r#"
//! [[curves]]
//! name = "USDC/USDT"
//! symbol = "FXC-USD"
//! base = { token = "0x00000000000000000000000000000000000000a0", decimals = 6, weight = "0.5" }
//! quote = { token = "0x00000000000000000000000000000000000000b0", decimals = 6, weight = "0.5" }
//! "#,
//! )
//! .unwrap();
//! config.validate().unwrap();
//! assert_eq!(config.curves[0].params.alpha, defaults::params::ALPHA);
//! ```

pub mod curve_config;
pub mod defaults;
pub mod logging;

// Re-export commonly used types
pub use curve_config::{
    load_config, AssetConfig, CurveConfig, FxCurveConfig, GlobalConfig, OracleConfig,
    ParamsConfig, WhitelistingConfig,
};
pub use logging::{init_logging, LogFormat};
