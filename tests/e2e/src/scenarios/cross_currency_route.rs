//! CADC to EURS through USDC: two curves, one settlement

use crate::fixtures::{trader, Market};
use crate::framework::{TestFramework, TestResult, TestScenario, ValidationResult, ValidationSeverity};
use crate::validation::{deviation_bps, expect_close};
use amm::Route;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

pub struct CrossCurrencyRouteTest {
    pub deposit: u64,
    /// Whole CADC sold for EURS
    pub sell_amount: Decimal,
    /// Whole EURS bought with CADC
    pub buy_amount: Decimal,
    /// Allowed gap from the cross rate, in USD
    pub tolerance: Decimal,
}

impl Default for CrossCurrencyRouteTest {
    fn default() -> Self {
        Self {
            deposit: 200,
            sell_amount: dec!(10),
            buy_amount: dec!(5),
            tolerance: dec!(0.04),
        }
    }
}

impl TestScenario for CrossCurrencyRouteTest {
    fn name(&self) -> &str {
        "cross_currency_route"
    }

    fn description(&self) -> &str {
        "Route CADC to EURS through both USDC curves"
    }

    fn execute(&self, _framework: &TestFramework, market: &mut Market) -> Result<TestResult> {
        let mut result = TestResult::new(self.name());
        let cadc_curve = market.curve_for("CADC", "USDC")?;
        let eurs_curve = market.curve_for("EURS", "USDC")?;
        let owner = market.owner;

        market.fund(owner, "CADC", "1000")?;
        market.fund(owner, "EURS", "1000")?;
        market.fund(owner, "USDC", "2000")?;
        for curve in [cadc_curve, eurs_curve] {
            market.deposit(owner, curve, self.deposit)?;
            result.metrics.liquidity_operations += 1;
        }

        let route = market.route("CADC", "EURS")?;
        let expected_route = Route::TwoHop {
            first: cadc_curve,
            second: eurs_curve,
        };
        result.record(if route == expected_route {
            ValidationResult::pass("route", "CADC to EURS hops through USDC")
        } else {
            ValidationResult::fail(
                "route",
                format!("expected {:?}, got {:?}", expected_route, route),
                ValidationSeverity::Error,
            )
        });

        let epsilon = market
            .factory
            .curve(cadc_curve)?
            .params()
            .and_then(|params| params.epsilon.to_decimal())
            .context("curve has no parameters")?;
        let two_fees = (Decimal::ONE - epsilon) * (Decimal::ONE - epsilon);
        let cadc_usd = market.usd_value("CADC", Decimal::ONE)?;
        let eurs_usd = market.usd_value("EURS", Decimal::ONE)?;

        let trader = trader();
        market.fund(trader, "CADC", "100")?;
        market.approve_all(trader, "EURS")?;

        let received = market.swap(trader, "CADC", "EURS", &self.sell_amount.to_string())?;
        result.metrics.swaps_executed += 1;
        let expected = self.sell_amount * cadc_usd / eurs_usd * two_fees;
        info!(%received, %expected, "CADC sold for EURS");
        result.metrics.max_deviation_bps = deviation_bps(received, expected);
        result.record(expect_close(
            "cadc_to_eurs",
            received,
            expected,
            self.tolerance / eurs_usd,
        ));

        let eurs_before = market.balance(trader, "EURS")?;
        let paid = market.buy(trader, "CADC", "EURS", &self.buy_amount.to_string())?;
        result.metrics.swaps_executed += 1;
        let eurs_bought = market.balance(trader, "EURS")? - eurs_before;
        result.record(expect_close("eurs_bought", eurs_bought, self.buy_amount, Decimal::ZERO));

        let expected_paid = self.buy_amount * eurs_usd / cadc_usd / two_fees;
        info!(%paid, expected = %expected_paid, "EURS bought with CADC");
        result.metrics.max_deviation_bps = result
            .metrics
            .max_deviation_bps
            .max(deviation_bps(paid, expected_paid));
        result.record(expect_close(
            "eurs_price_in_cadc",
            paid,
            expected_paid,
            self.tolerance / cadc_usd,
        ));

        Ok(result)
    }
}
