//! Two equal deposits into an empty curve, both withdrawn in full

use crate::fixtures::{alice, bob, Market};
use crate::framework::{TestFramework, TestResult, TestScenario, ValidationResult, ValidationSeverity};
use crate::validation::{deviation_bps, expect_close};
use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

pub struct EqualProvidersTest {
    /// Numeraire value each provider deposits
    pub deposit: u64,
    /// Allowed gap per asset between starting and final balance, in whole tokens
    pub tolerance: Decimal,
}

impl Default for EqualProvidersTest {
    fn default() -> Self {
        Self {
            deposit: 100,
            tolerance: dec!(0.04),
        }
    }
}

impl TestScenario for EqualProvidersTest {
    fn name(&self) -> &str {
        "equal_providers"
    }

    fn description(&self) -> &str {
        "Two providers deposit the same value into an empty curve and withdraw everything"
    }

    fn execute(&self, _framework: &TestFramework, market: &mut Market) -> Result<TestResult> {
        let mut result = TestResult::new(self.name());
        let curve = market.curve_for("CADC", "USDC")?;
        let providers = [alice(), bob()];

        for provider in providers {
            market.fund(provider, "CADC", "1000")?;
            market.fund(provider, "USDC", "1000")?;
        }
        for provider in providers {
            market.deposit(provider, curve, self.deposit)?;
            result.metrics.liquidity_operations += 1;
        }
        for provider in providers {
            market.withdraw_all(provider, curve)?;
            result.metrics.liquidity_operations += 1;
        }

        for provider in providers {
            for symbol in ["CADC", "USDC"] {
                let balance = market.balance(provider, symbol)?;
                info!(provider = %provider, token = symbol, %balance, "Balance after exit");
                result.metrics.max_deviation_bps = result
                    .metrics
                    .max_deviation_bps
                    .max(deviation_bps(balance, dec!(1000)));
                result.record(expect_close(
                    &format!("{}_returned_{}", symbol.to_lowercase(), provider),
                    balance,
                    dec!(1000),
                    self.tolerance,
                ));
            }
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
