//! Markets deployed from configuration files on disk

use amm::{CurveStage, Route};
use fxcurve_e2e_tests::{
    deployer, sample_config, trader, CadcUsdcSwapTest, Market, TestConfig, TestFramework, CADC,
    GENESIS_TIME, SAMPLE_MARKET_TOML, USDC,
};
use std::fs;
use tempfile::tempdir;
use tracing_test::traced_test;
use types::Address;

#[test]
fn test_sample_market_deploys_both_curves() {
    let config = sample_config().unwrap();
    let market = Market::from_config(&config, deployer(), GENESIS_TIME).unwrap();

    assert_eq!(market.factory.len(), 2);
    assert_eq!(market.oracles.len(), 2);
    assert_eq!(market.router.quote_currency(), USDC.parse::<Address>().unwrap());
    for curve in market.factory.curves() {
        assert_eq!(curve.owner(), deployer());
        assert_eq!(curve.stage(), CurveStage::WhitelistingDisabled);
    }
    assert_eq!(market.token("CADC").unwrap(), CADC.parse::<Address>().unwrap());
    assert_eq!(market.info(market.token("EURS").unwrap()).unwrap().decimals, 2);
    assert!(matches!(
        market.route("CADC", "EURS").unwrap(),
        Route::TwoHop { .. }
    ));
}

#[test]
fn test_market_from_config_file_with_env_expansion() {
    std::env::set_var("FXCURVE_E2E_CADC", CADC);
    let toml = SAMPLE_MARKET_TOML.replacen(
        &format!("token = \"{}\"", CADC),
        "token = \"${FXCURVE_E2E_CADC}\"",
        1,
    );
    let dir = tempdir().unwrap();
    let path = dir.path().join("market.toml");
    fs::write(&path, toml).unwrap();

    let framework = TestFramework::new(TestConfig {
        market_config: Some(path),
        ..TestConfig::default()
    });
    let market = framework.market().unwrap();
    assert_eq!(market.token("CADC").unwrap(), CADC.parse::<Address>().unwrap());

    let result = framework.run_scenario(&CadcUsdcSwapTest::default());
    assert!(result.success, "{:?}", result.error_message);
}

#[test]
fn test_invalid_market_config_fails_setup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("market.toml");
    // weights no longer sum to one
    fs::write(&path, SAMPLE_MARKET_TOML.replacen("weight = \"0.5\"", "weight = \"0.6\"", 1)).unwrap();

    let framework = TestFramework::new(TestConfig {
        market_config: Some(path),
        ..TestConfig::default()
    });
    assert!(framework.market().is_err());

    let result = framework.run_scenario(&CadcUsdcSwapTest::default());
    assert!(!result.success);
    assert!(result.error_message.unwrap().starts_with("Setup failed"));
}

#[test]
fn test_missing_config_file_fails_setup() {
    let dir = tempdir().unwrap();
    let framework = TestFramework::new(TestConfig {
        market_config: Some(dir.path().join("absent.toml")),
        ..TestConfig::default()
    });
    let err = framework.market().err().unwrap();
    assert!(format!("{:#}", err).contains("absent.toml"));
}

#[test]
#[traced_test]
fn test_market_operations_are_logged() {
    let mut market = Market::from_config(&sample_config().unwrap(), deployer(), GENESIS_TIME).unwrap();
    assert!(logs_contain("New curve"));
    assert!(logs_contain("Deployed curve"));

    let curve = market.curve_for("CADC", "USDC").unwrap();
    let owner = market.owner;
    market.fund(owner, "CADC", "1000").unwrap();
    market.fund(owner, "USDC", "1000").unwrap();
    market.deposit(owner, curve, 200).unwrap();
    assert!(logs_contain("Proportional deposit"));

    market.fund(trader(), "CADC", "1").unwrap();
    let received = market.swap(trader(), "CADC", "USDC", "1").unwrap();
    assert!(received > rust_decimal::Decimal::ZERO);
    assert!(logs_contain("Swap executed"));
    assert!(logs_contain("Routed swap"));
}
