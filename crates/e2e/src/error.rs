//! Error types for the acceptance runner

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Timed out after {timeout_ms} ms waiting for {what} to be visible")]
    AssertionTimeout { what: String, timeout_ms: u64 },

    #[error("Locator {locator} did not resolve: {reason}")]
    Locator { locator: String, reason: String },

    #[error("POS server unreachable at {url} after {attempts} attempts")]
    ServerUnreachable { url: String, attempts: usize },

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright bridge error: {0}")]
    Bridge(String),

    #[error("Scenario cancelled after {budget_ms} ms budget during step '{step}'")]
    Cancelled { budget_ms: u64, step: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// How a failure affects the scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// A mandatory checkpoint or locator failed; the run is failed.
    HardCheckpointFailure,
    /// An optional UI affordance was absent; the run continues.
    OptionalStepSkipped,
}

impl E2eError {
    /// True for the two UI-absence errors a best-effort step may absorb.
    pub fn is_ui_absence(&self) -> bool {
        matches!(self, E2eError::AssertionTimeout { .. } | E2eError::Locator { .. })
    }

    /// Classification of this error when raised by a step of the given kind.
    pub fn classify(&self, best_effort: bool) -> FailureClass {
        if best_effort && self.is_ui_absence() {
            FailureClass::OptionalStepSkipped
        } else {
            FailureClass::HardCheckpointFailure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_absence_is_only_timeout_and_locator() {
        let timeout = E2eError::AssertionTimeout { what: "text /venta #/i".into(), timeout_ms: 10_000 };
        let locator = E2eError::Locator { locator: ".product-card >> nth=0".into(), reason: "none".into() };
        let bridge = E2eError::Bridge("pipe closed".into());

        assert!(timeout.is_ui_absence());
        assert!(locator.is_ui_absence());
        assert!(!bridge.is_ui_absence());
    }

    #[test]
    fn test_classify_respects_step_kind() {
        let locator = E2eError::Locator { locator: "a".into(), reason: "none".into() };
        assert_eq!(locator.classify(true), FailureClass::OptionalStepSkipped);
        assert_eq!(locator.classify(false), FailureClass::HardCheckpointFailure);

        let io = E2eError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert_eq!(io.classify(true), FailureClass::HardCheckpointFailure);
    }

    #[test]
    fn test_timeout_message_names_marker() {
        let err = E2eError::AssertionTimeout { what: "text /caja abierta/i".into(), timeout_ms: 10_000 };
        assert_eq!(
            err.to_string(),
            "Timed out after 10000 ms waiting for text /caja abierta/i to be visible"
        );
    }
}
