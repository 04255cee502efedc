//! Step execution semantics: mandatory checkpoints and best-effort steps

use std::future::Future;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{E2eResult, FailureClass};

/// Stages of the checkout flow, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    Start,
    Authenticating,
    CashRegisterCheck,
    OpeningRegister,
    ProductSelection,
    ProcessingSale,
    TicketVerification,
}

impl Checkpoint {
    pub fn label(&self) -> &'static str {
        match self {
            Checkpoint::Start => "S0",
            Checkpoint::Authenticating => "S1",
            Checkpoint::CashRegisterCheck => "S2",
            Checkpoint::OpeningRegister => "S2a",
            Checkpoint::ProductSelection => "S3",
            Checkpoint::ProcessingSale => "S4",
            Checkpoint::TicketVerification => "S5",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Mandatory,
    BestEffort,
}

/// Result of a step that did not fail the scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// The UI affordance was not there; nothing was done.
    NotApplicable { reason: String },
}

impl StepOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StepOutcome::Completed)
    }
}

/// Turn the raw result of a best-effort step into an outcome.
///
/// Only UI absence (locator miss, visibility timeout) is absorbed. Any
/// other error still propagates.
pub fn best_effort_outcome(result: E2eResult<()>) -> E2eResult<StepOutcome> {
    match result {
        Ok(()) => Ok(StepOutcome::Completed),
        Err(e) if e.is_ui_absence() => Ok(StepOutcome::NotApplicable { reason: e.to_string() }),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    NotApplicable { reason: String },
    Failed { class: FailureClass, error: String },
}

/// One executed step, as it appears in reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub checkpoint: Checkpoint,
    pub name: String,
    pub kind: StepKind,
    pub status: StepStatus,
    pub duration_ms: u64,
}

/// Ordered log of the steps a scenario has run so far
#[derive(Debug, Default)]
pub struct ScenarioTrace {
    records: Vec<StepRecord>,
    in_flight: Option<InFlight>,
}

#[derive(Debug)]
struct InFlight {
    checkpoint: Checkpoint,
    name: String,
    kind: StepKind,
    start: Instant,
}

impl ScenarioTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a step whose failure fails the scenario
    pub async fn mandatory<F>(&mut self, checkpoint: Checkpoint, name: &str, step: F) -> E2eResult<()>
    where
        F: Future<Output = E2eResult<()>>,
    {
        self.begin(checkpoint, name, StepKind::Mandatory);
        let result = step.await;

        let status = match &result {
            Ok(()) => StepStatus::Completed,
            Err(e) => StepStatus::Failed {
                class: e.classify(false),
                error: e.to_string(),
            },
        };
        self.finish(status);
        result
    }

    /// Run a step whose UI-absence failures are tolerated
    pub async fn best_effort<F>(&mut self, checkpoint: Checkpoint, name: &str, step: F) -> E2eResult<StepOutcome>
    where
        F: Future<Output = E2eResult<()>>,
    {
        self.begin(checkpoint, name, StepKind::BestEffort);
        let result = best_effort_outcome(step.await);

        let status = match &result {
            Ok(StepOutcome::Completed) => StepStatus::Completed,
            Ok(StepOutcome::NotApplicable { reason }) => {
                info!("{} {}: not applicable ({})", checkpoint.label(), name, reason);
                StepStatus::NotApplicable { reason: reason.clone() }
            }
            Err(e) => StepStatus::Failed {
                class: e.classify(true),
                error: e.to_string(),
            },
        };
        self.finish(status);
        result
    }

    /// Name of the step currently awaiting the browser, if any
    pub fn in_flight(&self) -> Option<String> {
        self.in_flight
            .as_ref()
            .map(|step| format!("{} {}", step.checkpoint.label(), step.name))
    }

    /// Record the step in flight as failed, for a run that was cut off
    /// while the step was still awaiting the browser
    pub fn abort_in_flight(&mut self, class: FailureClass, error: &str) {
        self.finish(StepStatus::Failed {
            class,
            error: error.to_string(),
        });
    }

    /// Last checkpoint entered
    pub fn last_checkpoint(&self) -> Option<Checkpoint> {
        self.in_flight
            .as_ref()
            .map(|step| step.checkpoint)
            .or_else(|| self.records.last().map(|r| r.checkpoint))
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<StepRecord> {
        self.records
    }

    fn begin(&mut self, checkpoint: Checkpoint, name: &str, kind: StepKind) {
        debug!("{} {}", checkpoint.label(), name);
        self.in_flight = Some(InFlight {
            checkpoint,
            name: name.to_string(),
            kind,
            start: Instant::now(),
        });
    }

    fn finish(&mut self, status: StepStatus) {
        let Some(step) = self.in_flight.take() else {
            return;
        };
        if let StepStatus::Failed { error, .. } = &status {
            warn!("{} {} failed: {}", step.checkpoint.label(), step.name, error);
        }
        self.records.push(StepRecord {
            checkpoint: step.checkpoint,
            name: step.name,
            kind: step.kind,
            status,
            duration_ms: step.start.elapsed().as_millis() as u64,
        });
    }
}
