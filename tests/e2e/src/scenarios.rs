//! End-to-end test scenarios

pub mod cross_currency_route;
pub mod equal_providers;
pub mod liquidity_providers;

pub use cadc_usdc_swap::CadcUsdcSwapTest;
pub use cross_currency_route::CrossCurrencyRouteTest;
pub use equal_providers::EqualProvidersTest;
pub use liquidity_providers::LiquidityProvidersTest;

use crate::framework::TestScenario;

/// Every scenario with its default settings, in run order
pub fn all_scenarios() -> Vec<Box<dyn TestScenario>> {
    vec![
        Box::new(CadcUsdcSwapTest::default()),
        Box::new(EqualProvidersTest::default()),
        Box::new(LiquidityProvidersTest::default()),
        Box::new(CrossCurrencyRouteTest::default()),
    ]
}
