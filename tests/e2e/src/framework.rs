//! Core E2E testing framework

use crate::fixtures::{deployer, sample_config, Market, GENESIS_TIME};
use crate::validation::validate_market;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Main test framework coordinator
pub struct TestFramework {
    config: TestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    /// Enable detailed logging
    pub verbose: bool,

    /// Checks applied after every scenario
    pub validation_level: ValidationLevel,

    /// Market definition; the built-in sample market when absent
    pub market_config: Option<PathBuf>,

    /// Block time scenarios start from
    pub start_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationLevel {
    /// Scenario assertions only
    Basic,
    /// Plus router and curve balance checks
    Accounting,
    /// Plus token conservation across every holder
    Comprehensive,
}

/// Test scenario trait
pub trait TestScenario {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Market the scenario runs against
    fn setup(&self, framework: &TestFramework) -> Result<Market> {
        framework.market()
    }

    fn execute(&self, framework: &TestFramework, market: &mut Market) -> Result<TestResult>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub scenario_name: String,
    pub success: bool,
    pub duration: Duration,
    pub error_message: Option<String>,
    pub metrics: TestMetrics,
    pub validation_results: Vec<ValidationResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestMetrics {
    pub swaps_executed: u32,
    pub liquidity_operations: u32,
    pub curve_events: u64,
    /// Largest gap between an observed and expected amount, in basis points
    pub max_deviation_bps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub validator: String,
    pub passed: bool,
    pub message: String,
    pub severity: ValidationSeverity,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ValidationResult {
    pub fn pass(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            validator: validator.into(),
            passed: true,
            message: message.into(),
            severity: ValidationSeverity::Info,
            details: None,
        }
    }

    pub fn fail(
        validator: impl Into<String>,
        message: impl Into<String>,
        severity: ValidationSeverity,
    ) -> Self {
        Self {
            validator: validator.into(),
            passed: false,
            message: message.into(),
            severity,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Failed with Error or Critical severity
    pub fn is_blocking(&self) -> bool {
        !self.passed
            && matches!(
                self.severity,
                ValidationSeverity::Error | ValidationSeverity::Critical
            )
    }
}

impl TestResult {
    pub fn new(scenario_name: impl Into<String>) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            success: true,
            duration: Duration::ZERO,
            error_message: None,
            metrics: TestMetrics::default(),
            validation_results: Vec::new(),
        }
    }

    fn failed(scenario_name: &str, duration: Duration, message: String) -> Self {
        Self {
            success: false,
            duration,
            error_message: Some(message),
            ..Self::new(scenario_name)
        }
    }

    pub fn record(&mut self, validation: ValidationResult) {
        if validation.is_blocking() {
            self.success = false;
        }
        self.validation_results.push(validation);
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.validation_results.iter().filter(|v| !v.passed)
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            validation_level: ValidationLevel::Comprehensive,
            market_config: None,
            start_time: GENESIS_TIME,
        }
    }
}

impl TestFramework {
    pub fn new(config: TestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    /// Deploy a fresh market from the configured definition
    pub fn market(&self) -> Result<Market> {
        let config = match &self.config.market_config {
            Some(path) => config::load_config(Some(path.as_path()))
                .with_context(|| format!("Failed to load market from {}", path.display()))?,
            None => sample_config()?,
        };
        Market::from_config(&config, deployer(), self.config.start_time)
    }

    /// Run a complete test scenario
    pub fn run_scenario(&self, scenario: &dyn TestScenario) -> TestResult {
        info!("Starting test scenario: {}", scenario.name());
        info!("Description: {}", scenario.description());
        let start_time = Instant::now();

        let mut market = match scenario.setup(self) {
            Ok(market) => market,
            Err(e) => {
                error!("Setup failed: {:#}", e);
                return TestResult::failed(
                    scenario.name(),
                    start_time.elapsed(),
                    format!("Setup failed: {:#}", e),
                );
            }
        };

        let mut test_result = match scenario.execute(self, &mut market) {
            Ok(result) => result,
            Err(e) => {
                error!("Test execution failed: {:#}", e);
                TestResult::failed(
                    scenario.name(),
                    start_time.elapsed(),
                    format!("Execution failed: {:#}", e),
                )
            }
        };

        if self.config.validation_level >= ValidationLevel::Accounting {
            for validation in validate_market(&market, self.config.validation_level) {
                if !validation.passed {
                    warn!("{}: {}", validation.validator, validation.message);
                }
                test_result.record(validation);
            }
        }
        test_result.metrics.curve_events = market
            .factory
            .curves()
            .map(|curve| curve.events().len() as u64)
            .sum();
        test_result.duration = start_time.elapsed();

        info!(
            "Test scenario completed: {} (success: {})",
            scenario.name(),
            test_result.success
        );
        test_result
    }
}
