//! Runner that owns the browser session, the time budget and the artifacts

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::ScenarioConfig;
use crate::error::{E2eError, E2eResult, FailureClass};
use crate::page::Page;
use crate::playwright::{PlaywrightConfig, PlaywrightSession};
use crate::report;
use crate::scenario::{CheckoutScenario, CheckoutSummary};
use crate::server::ServerProbe;
use crate::step::{ScenarioTrace, StepRecord};

/// Files captured for a scenario run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Artifacts {
    pub screenshot: Option<PathBuf>,
    pub video: Option<PathBuf>,
}

/// Result of running one scenario instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub instance: usize,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepRecord>,
    pub register_opened: Option<bool>,
    pub ticket_link_followed: Option<bool>,
    pub error: Option<String>,
    pub failure_class: Option<FailureClass>,
    pub artifacts: Artifacts,
}

/// Result of running every instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn from_results(started_at: DateTime<Utc>, duration_ms: u64, results: Vec<ScenarioResult>) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            started_at,
            duration_ms,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub scenario: ScenarioConfig,
    pub playwright: PlaywrightConfig,
    pub output_dir: PathBuf,
    /// Wall-clock budget for one scenario instance
    pub budget: Duration,
    /// Probe the POS server before launching a browser
    pub preflight: bool,
    /// Independent instances to run, one after another
    pub repeat: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let scenario = ScenarioConfig::from_env();
        let playwright = PlaywrightConfig {
            base_url: scenario.base_url.clone(),
            ..Default::default()
        };
        Self {
            scenario,
            playwright,
            output_dir: PathBuf::from("test-results"),
            budget: Duration::from_secs(60),
            preflight: true,
            repeat: 1,
        }
    }
}

/// Main acceptance runner
pub struct ScenarioRunner {
    config: RunnerConfig,
    scenario: CheckoutScenario,
}

impl ScenarioRunner {
    pub fn with_config(config: RunnerConfig) -> E2eResult<Self> {
        let scenario = CheckoutScenario::new(config.scenario.clone())?;
        Ok(Self { config, scenario })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run every configured instance against real browsers
    pub async fn run(&self) -> E2eResult<SuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        if self.config.preflight {
            ServerProbe::new(&self.config.scenario.base_url)
                .wait_until_reachable()
                .await?;
        }

        info!("Running {} instance(s) of '{}'...", self.config.repeat, self.scenario.name());

        let mut results = Vec::with_capacity(self.config.repeat);
        for instance in 0..self.config.repeat {
            let result = self.run_instance(instance).await?;
            log_result(&result);
            results.push(result);
        }

        let suite = SuiteResult::from_results(started_at, start.elapsed().as_millis() as u64, results);
        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        Ok(suite)
    }

    /// One instance in its own browser context, always closed afterwards
    async fn run_instance(&self, instance: usize) -> E2eResult<ScenarioResult> {
        let mut session = PlaywrightSession::launch(&self.config.playwright).await?;
        let mut result = self.execute(&mut session, instance).await;

        match session.close(!result.success).await {
            Ok(video) => result.artifacts.video = video,
            Err(e) => warn!("Closing browser failed: {}", e),
        }
        Ok(result)
    }

    /// Run the scenario on `page` under the time budget.
    ///
    /// Never fails: scenario errors end up in the returned result, with a
    /// screenshot when one can still be taken.
    pub async fn execute<P>(&self, page: &mut P, instance: usize) -> ScenarioResult
    where
        P: Page + ?Sized,
    {
        let started_at = Utc::now();
        let start = Instant::now();
        let budget = self.config.budget;
        let mut trace = ScenarioTrace::new();

        debug!("Running {} #{}", self.scenario.name(), instance);
        let outcome = tokio::time::timeout(budget, self.scenario.run(page, &mut trace)).await;

        let outcome: E2eResult<CheckoutSummary> = match outcome {
            Ok(result) => result,
            Err(_) => {
                let cancelled = E2eError::Cancelled {
                    budget_ms: budget.as_millis() as u64,
                    step: trace.in_flight().unwrap_or_else(|| "between steps".to_string()),
                };
                trace.abort_in_flight(cancelled.classify(false), &cancelled.to_string());
                Err(cancelled)
            }
        };

        let mut artifacts = Artifacts::default();
        if outcome.is_err() {
            let path = self.screenshot_path(instance);
            match page.screenshot(&path, true).await {
                Ok(()) => artifacts.screenshot = Some(path),
                Err(e) => warn!("Failure screenshot not captured: {}", e),
            }
        }

        let (summary, error, failure_class) = match outcome {
            Ok(summary) => (Some(summary), None, None),
            Err(e) => (None, Some(e.to_string()), Some(e.classify(false))),
        };

        ScenarioResult {
            name: self.scenario.name().to_string(),
            instance,
            success: error.is_none(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            steps: trace.into_records(),
            register_opened: summary.map(|s| s.register_opened),
            ticket_link_followed: summary.map(|s| s.ticket_link_followed),
            error,
            failure_class,
            artifacts,
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        let path = report::write_json(results, &self.config.output_dir)?;
        info!("Results written to: {}", path.display());
        Ok(path)
    }

    /// Write the static HTML report
    pub fn write_report(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        let path = report::write_html(results, &self.config.output_dir.join("e2e-report"))?;
        info!("HTML report written to: {}", path.display());
        Ok(path)
    }

    fn screenshot_path(&self, instance: usize) -> PathBuf {
        screenshot_dir(&self.config.output_dir).join(format!("checkout-{}-failure.png", instance))
    }
}

fn screenshot_dir(output_dir: &Path) -> PathBuf {
    output_dir.join("screenshots")
}

fn log_result(result: &ScenarioResult) {
    if result.success {
        info!("✓ {} #{} ({} ms)", result.name, result.instance, result.duration_ms);
    } else {
        error!(
            "✗ {} #{} - {}",
            result.name,
            result.instance,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}
