//! Two providers share a curve through a round of trading and leave whole

use crate::fixtures::{alice, bob, trader, Market};
use crate::framework::{TestFramework, TestResult, TestScenario, ValidationResult, ValidationSeverity};
use crate::validation::{deviation_bps, expect_close};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;
use types::Address;

pub struct LiquidityProvidersTest {
    pub first_deposit: u64,
    pub second_deposit: u64,
    /// CADC sold, then bought back, per round
    pub trade_size: Decimal,
    pub rounds: u32,
    /// Allowed gap between value deposited and withdrawn, in USD
    pub tolerance: Decimal,
}

impl Default for LiquidityProvidersTest {
    fn default() -> Self {
        Self {
            first_deposit: 200,
            second_deposit: 100,
            trade_size: dec!(5),
            rounds: 3,
            tolerance: dec!(0.04),
        }
    }
}

impl LiquidityProvidersTest {
    fn withdraw_value(market: &mut Market, provider: Address, curve: Address) -> Result<Decimal> {
        let [cadc, usdc] = market.withdraw_all(provider, curve)?;
        let cadc = market.human(market.token("CADC")?, cadc)?;
        let usdc = market.human(market.token("USDC")?, usdc)?;
        Ok(market.usd_value("CADC", cadc)? + market.usd_value("USDC", usdc)?)
    }
}

impl TestScenario for LiquidityProvidersTest {
    fn name(&self) -> &str {
        "liquidity_providers"
    }

    fn description(&self) -> &str {
        "Two deposits, several round-trip trades, two full withdrawals"
    }

    fn execute(&self, _framework: &TestFramework, market: &mut Market) -> Result<TestResult> {
        let mut result = TestResult::new(self.name());
        let curve = market.curve_for("CADC", "USDC")?;

        for provider in [alice(), bob()] {
            market.fund(provider, "CADC", "1000")?;
            market.fund(provider, "USDC", "1000")?;
        }
        let first = market.deposit(alice(), curve, self.first_deposit)?;
        let second = market.deposit(bob(), curve, self.second_deposit)?;
        result.metrics.liquidity_operations += 2;

        let share_ratio = second
            .shares
            .to_decimal()
            .zip(first.shares.to_decimal())
            .map(|(second, first)| second / first)
            .context("share balances exceed decimal range")?;
        result.record(expect_close(
            "share_ratio",
            share_ratio,
            Decimal::from(self.second_deposit) / Decimal::from(self.first_deposit),
            dec!(0.000001),
        ));

        let trader = trader();
        market.fund(trader, "CADC", &(self.trade_size * Decimal::from(self.rounds)).to_string())?;
        market.approve_all(trader, "USDC")?;
        for round in 0..self.rounds {
            let usdc = market.swap(trader, "CADC", "USDC", &self.trade_size.to_string())?;
            let cadc = market.swap(trader, "USDC", "CADC", &usdc.to_string())?;
            result.metrics.swaps_executed += 2;
            info!(round, %usdc, %cadc, "Round trip traded");
            market.advance(12);
        }

        for (provider, deposited) in [(alice(), self.first_deposit), (bob(), self.second_deposit)] {
            let value = Self::withdraw_value(market, provider, curve)?;
            result.metrics.liquidity_operations += 1;
            let deposited = Decimal::from(deposited);
            info!(provider = %provider, %value, %deposited, "Provider withdrew");
            result.metrics.max_deviation_bps = result
                .metrics
                .max_deviation_bps
                .max(deviation_bps(value, deposited));
            result.record(expect_close(
                &format!("withdraw_value_{}", provider),
                value,
                deposited,
                self.tolerance,
            ));
        }

        let supply = market.factory.curve(curve)?.total_supply();
        result.record(if supply.is_zero() {
            ValidationResult::pass("supply_burned", "Every share was burned")
        } else {
            ValidationResult::fail(
                "supply_burned",
                format!("{} shares remain after both withdrawals", supply),
                ValidationSeverity::Error,
            )
        });

        Ok(result)
    }
}
