//! POS Checkout Acceptance Runner
//!
//! This crate drives a real browser through the critical checkout path of
//! the POS web application:
//! - Resolves credentials, base URL and cash fixtures from the environment
//! - Controls Playwright through a persistent JSON-lines bridge process
//! - Runs the checkout scenario with mandatory checkpoints and best-effort steps
//! - Enforces the per-scenario time budget and captures failure artifacts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Acceptance Runner (Rust)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── ServerProbe::wait_until_reachable()                  │
//! │    ├── PlaywrightSession::launch() -> impl Page             │
//! │    ├── execute(page) -> ScenarioResult   (60s budget)       │
//! │    └── write_results() / write_report()                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CheckoutScenario::run(page, trace)                         │
//! │    S0 goto /                                                │
//! │    S1 username + PIN, submit                                │
//! │    S2 probe "abrir caja"          (best effort)             │
//! │    S2a opening amount, assert "caja abierta"                │
//! │    S3 goto /vender/, first .product-card                    │
//! │    S4 procesar venta, monto recibido, assert "venta #"      │
//! │    S5 "ver ticket" (best effort), assert "total"            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod locator;
pub mod page;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod server;
pub mod step;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Credentials, ScenarioConfig};
pub use error::{E2eError, E2eResult, FailureClass};
pub use page::Page;
pub use runner::{RunnerConfig, ScenarioRunner};
pub use scenario::CheckoutScenario;
pub use step::{ScenarioTrace, StepOutcome};
