//! End-to-End Test Runner for FXCurve

use anyhow::{bail, Result};
use clap::Parser;
use config::GlobalConfig;
use fxcurve_e2e_tests::{
    all_scenarios,
    framework::{TestConfig, TestFramework, ValidationLevel},
    CadcUsdcSwapTest, CrossCurrencyRouteTest, EqualProvidersTest, LiquidityProvidersTest,
    TestResult,
};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Test scenario to run
    #[arg(short, long, default_value = "all")]
    scenario: String,

    /// Validation level
    #[arg(short, long, default_value = "comprehensive")]
    validation: String,

    /// Market configuration file (built-in sample market when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output results to file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let global = GlobalConfig {
        log_level: if args.verbose { "debug" } else { "info" }.to_string(),
        ..GlobalConfig::default()
    };
    config::init_logging(&global)?;

    info!("Starting FXCurve E2E Test Suite");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let validation_level = match args.validation.as_str() {
        "basic" => ValidationLevel::Basic,
        "accounting" => ValidationLevel::Accounting,
        "comprehensive" => ValidationLevel::Comprehensive,
        other => bail!("Invalid validation level: {}", other),
    };

    let framework = TestFramework::new(TestConfig {
        verbose: args.verbose,
        validation_level,
        market_config: args.config,
        ..TestConfig::default()
    });

    let results: Vec<TestResult> = match args.scenario.as_str() {
        "swap" | "cadc_usdc_swap" => vec![framework.run_scenario(&CadcUsdcSwapTest::default())],
        "liquidity" | "liquidity_providers" => {
            vec![framework.run_scenario(&LiquidityProvidersTest::default())]
        }
        "equal" | "equal_providers" => vec![framework.run_scenario(&EqualProvidersTest::default())],
        "route" | "cross_currency_route" => {
            vec![framework.run_scenario(&CrossCurrencyRouteTest::default())]
        }
        "all" => {
            info!("Running all test scenarios");
            all_scenarios()
                .iter()
                .map(|scenario| framework.run_scenario(scenario.as_ref()))
                .collect()
        }
        other => bail!("Unknown test scenario: {}", other),
    };

    print_results_summary(&results);

    if let Some(output_path) = args.output {
        save_results_to_file(&results, &output_path)?;
        info!("Results saved to: {}", output_path.display());
    }

    if !results.iter().all(|r| r.success) {
        error!("Some tests failed");
        std::process::exit(1);
    }

    info!("All tests passed successfully!");
    Ok(())
}

fn print_results_summary(results: &[TestResult]) {
    println!("\n═══════════════════════════════════════");
    println!("        TEST RESULTS SUMMARY");
    println!("═══════════════════════════════════════");

    let passed_tests = results.iter().filter(|r| r.success).count();
    println!("Total Tests: {}", results.len());
    println!("Passed:      {} ✓", passed_tests);
    println!("Failed:      {} ✗", results.len() - passed_tests);
    println!();

    for result in results {
        let status = if result.success { "✓ PASS" } else { "✗ FAIL" };
        println!(
            "{} {} ({} ms)",
            status,
            result.scenario_name,
            result.duration.as_millis()
        );

        if let Some(ref error) = result.error_message {
            println!("      Error: {}", error);
        }

        println!(
            "      Swaps: {} | Liquidity ops: {} | Events: {} | Max deviation: {:.2} bps",
            result.metrics.swaps_executed,
            result.metrics.liquidity_operations,
            result.metrics.curve_events,
            result.metrics.max_deviation_bps
        );

        let failed: Vec<_> = result.failures().collect();
        if !failed.is_empty() {
            println!("      Validation Failures:");
            for validation in failed {
                println!("        - {}: {}", validation.validator, validation.message);
            }
        }
        println!();
    }

    println!("═══════════════════════════════════════");
}

fn save_results_to_file(results: &[TestResult], path: &PathBuf) -> Result<()> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    let json_output = serde_json::json!({
        "test_run": {
            "timestamp": timestamp,
            "version": env!("CARGO_PKG_VERSION"),
            "total_tests": results.len(),
            "passed_tests": results.iter().filter(|r| r.success).count(),
            "failed_tests": results.iter().filter(|r| !r.success).count(),
        },
        "results": results
    });

    std::fs::write(path, serde_json::to_string_pretty(&json_output)?)?;
    Ok(())
}
