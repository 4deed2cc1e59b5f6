//! Accounting checks run against a market after each scenario

use crate::fixtures::Market;
use crate::framework::{ValidationLevel, ValidationResult, ValidationSeverity};
use amm::{CurveSnapshot, TokenLedger, ASSET_COUNT};
use rust_decimal::Decimal;
use serde_json::json;

/// Compare an observed amount against an expectation within `tolerance`
pub fn expect_close(
    validator: &str,
    actual: Decimal,
    expected: Decimal,
    tolerance: Decimal,
) -> ValidationResult {
    let gap = (actual - expected).abs();
    let details = json!({
        "actual": actual.to_string(),
        "expected": expected.to_string(),
        "tolerance": tolerance.to_string(),
    });
    if gap <= tolerance {
        ValidationResult::pass(validator, format!("{} within {} of {}", actual, tolerance, expected))
            .with_details(details)
    } else {
        ValidationResult::fail(
            validator,
            format!("{} is {} away from {}", actual, gap, expected),
            ValidationSeverity::Error,
        )
        .with_details(details)
    }
}

/// Gap between `actual` and `expected` in basis points of `expected`
pub fn deviation_bps(actual: Decimal, expected: Decimal) -> f64 {
    if expected.is_zero() {
        return 0.0;
    }
    let bps = (actual - expected).abs() / expected.abs() * Decimal::from(10_000);
    bps.to_string().parse().unwrap_or(f64::MAX)
}

pub fn validate_market(market: &Market, level: ValidationLevel) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    if level < ValidationLevel::Accounting {
        return results;
    }

    results.extend(validate_router_idle(market));
    for curve in market.factory.curves() {
        match curve.view_curve(&market.ledger) {
            Ok(snapshot) => results.extend(validate_curve(&snapshot)),
            Err(e) => results.push(ValidationResult::fail(
                format!("curve_snapshot_{}", curve.symbol()),
                format!("Snapshot of {} failed: {}", curve.name(), e),
                ValidationSeverity::Critical,
            )),
        }
    }

    if level >= ValidationLevel::Comprehensive {
        results.extend(validate_conservation(market));
    }
    results
}

/// The router relays; anything it keeps is at most rounding dust
fn validate_router_idle(market: &Market) -> Vec<ValidationResult> {
    let router = market.router.address();
    market
        .token_addresses()
        .into_iter()
        .map(|token| {
            let held = market.ledger.balance_of(token, router);
            let validator = format!("router_idle_{}", token);
            match held {
                0 => ValidationResult::pass(validator, "Router holds nothing"),
                1 => ValidationResult::fail(
                    validator,
                    "Router kept one unit of rounding dust",
                    ValidationSeverity::Warning,
                ),
                _ => ValidationResult::fail(
                    validator,
                    format!("Router holds {} raw units", held),
                    ValidationSeverity::Error,
                ),
            }
        })
        .collect()
}

/// Shares are backed and every asset sits inside its halt band
fn validate_curve(snapshot: &CurveSnapshot) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    let backed = snapshot.total_supply.is_zero() || snapshot.raw_balances.iter().all(|b| *b > 0);
    let validator = format!("curve_backing_{}", snapshot.symbol);
    results.push(if backed {
        ValidationResult::pass(validator, "Outstanding shares are backed by both assets")
    } else {
        ValidationResult::fail(
            validator,
            format!(
                "{} shares outstanding over balances {:?}",
                snapshot.total_supply, snapshot.raw_balances
            ),
            ValidationSeverity::Critical,
        )
    });

    if snapshot.total_supply.is_zero() {
        return results;
    }
    let (Some(params), Some(total)) = (snapshot.params, snapshot.total_liquidity.to_decimal())
    else {
        return results;
    };
    let Some(alpha) = params.alpha.to_decimal() else {
        return results;
    };
    for index in 0..ASSET_COUNT {
        let (Some(balance), Some(weight)) = (
            snapshot.numeraire_balances[index].to_decimal(),
            snapshot.weights[index].to_decimal(),
        ) else {
            continue;
        };
        let ideal = total * weight;
        let (lower, upper) = (ideal * (Decimal::ONE - alpha), ideal * (Decimal::ONE + alpha));
        let validator = format!("curve_band_{}_{}", snapshot.symbol, index);
        results.push(if balance >= lower && balance <= upper {
            ValidationResult::pass(validator, format!("{} within [{}, {}]", balance, lower, upper))
        } else {
            ValidationResult::fail(
                validator,
                format!("{} outside [{}, {}]", balance, lower, upper),
                ValidationSeverity::Critical,
            )
            .with_details(json!({ "ideal": ideal.to_string() }))
        });
    }
    results
}

/// Every minted unit is still held by a curve, the router or an account
fn validate_conservation(market: &Market) -> Vec<ValidationResult> {
    let holders = market.holders();
    market
        .token_addresses()
        .into_iter()
        .map(|token| {
            let held: u128 = holders
                .iter()
                .map(|holder| market.ledger.balance_of(token, *holder))
                .sum();
            let minted = market.minted(token);
            let validator = format!("conservation_{}", token);
            if held == minted {
                ValidationResult::pass(validator, format!("{} raw units accounted for", minted))
            } else {
                ValidationResult::fail(
                    validator,
                    format!("minted {} but holders own {}", minted, held),
                    ValidationSeverity::Critical,
                )
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_expect_close() {
        assert!(expect_close("fee", dec!(0.7896), dec!(0.789605), dec!(0.04)).passed);

        let far = expect_close("fee", dec!(0.70), dec!(0.79), dec!(0.04));
        assert!(!far.passed);
        assert!(far.is_blocking());
        assert_eq!(far.details.unwrap()["expected"], "0.79");
    }

    #[test]
    fn test_deviation_bps() {
        assert_eq!(deviation_bps(dec!(101), dec!(100)), 100.0);
        assert_eq!(deviation_bps(dec!(5), Decimal::ZERO), 0.0);
    }
}
