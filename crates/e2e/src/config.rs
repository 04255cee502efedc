//! Scenario configuration resolved from the environment

use std::fmt;
use std::time::Duration;

use serde::Serialize;

pub const BASE_URL_VAR: &str = "E2E_BASE_URL";
pub const USER_VAR: &str = "E2E_USER";
pub const PIN_VAR: &str = "E2E_PIN";
pub const OPENING_AMOUNT_VAR: &str = "E2E_OPENING_AMOUNT";
pub const RECEIVED_AMOUNT_VAR: &str = "E2E_RECEIVED_AMOUNT";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_PIN: &str = "1234";
pub const DEFAULT_OPENING_AMOUNT: &str = "100000";
pub const DEFAULT_RECEIVED_AMOUNT: &str = "200000";

/// Login identity used by the scenario
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    #[serde(skip)]
    pub pin: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("pin", &"<redacted>")
            .finish()
    }
}

/// Amounts typed into the cash fields. Opaque strings, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioFixtures {
    /// Initial cash when the register has to be opened
    pub opening_amount: String,

    /// Cash handed over by the customer
    pub received_amount: String,
}

impl Default for ScenarioFixtures {
    fn default() -> Self {
        Self {
            opening_amount: DEFAULT_OPENING_AMOUNT.to_string(),
            received_amount: DEFAULT_RECEIVED_AMOUNT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScenarioTimeouts {
    /// Bound for checkpoint assertions
    pub assertion: Duration,

    /// Bound for the optional open-register probe
    pub probe: Duration,

    /// Bound for the optional ticket link click
    pub optional_click: Duration,

    /// Bound for locating targets of fill/click on mandatory steps
    pub action: Duration,
}

impl Default for ScenarioTimeouts {
    fn default() -> Self {
        Self {
            assertion: Duration::from_secs(10),
            probe: Duration::from_secs(2),
            optional_click: Duration::from_secs(2),
            action: Duration::from_secs(10),
        }
    }
}

/// Everything the checkout scenario needs before it starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub fixtures: ScenarioFixtures,
    pub timeouts: ScenarioTimeouts,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::resolve_with(|_| None)
    }
}

impl ScenarioConfig {
    /// Resolve from the process environment
    pub fn from_env() -> Self {
        Self::resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve using an arbitrary variable lookup.
    ///
    /// Absent and empty values both fall back to the defaults. Values are
    /// otherwise taken verbatim, so a PIN like `" 12"` reaches the UI as is.
    pub fn resolve_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str, default: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let base_url = get(BASE_URL_VAR, DEFAULT_BASE_URL);

        Self {
            base_url: normalize_base_url(&base_url),
            credentials: Credentials {
                username: get(USER_VAR, DEFAULT_USER),
                pin: get(PIN_VAR, DEFAULT_PIN),
            },
            fixtures: ScenarioFixtures {
                opening_amount: get(OPENING_AMOUNT_VAR, DEFAULT_OPENING_AMOUNT),
                received_amount: get(RECEIVED_AMOUNT_VAR, DEFAULT_RECEIVED_AMOUNT),
            },
            timeouts: ScenarioTimeouts::default(),
        }
    }

    /// Replace the base URL, e.g. from a command-line flag
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        if !base_url.is_empty() {
            self.base_url = normalize_base_url(base_url);
        }
        self
    }

    /// Absolute URL for a path on the POS server
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        raw.to_string()
    } else {
        trimmed.to_string()
    }
}
