//! The POS checkout scenario
//!
//! ```text
//! S0 start ──► S1 login ──► S2 register probe ──┬──────────────► S3 product ──► S4 sale ──► S5 ticket
//!                                               └─► S2a open ──┘
//! ```
//!
//! S2's probe and S5's ticket link are best-effort. Everything else is a
//! checkpoint: the first failure ends the run.

use serde::Serialize;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::error::E2eResult;
use crate::locator::{Locator, TextPattern};
use crate::page::Page;
use crate::step::{Checkpoint, ScenarioTrace};

pub const SCENARIO_NAME: &str = "login, apertura de caja, venta rápida y verificación de ticket";

pub const ROOT_PATH: &str = "/";
pub const SALES_PATH: &str = "/vender/";

/// Markup of the POS application the scenario depends on
#[derive(Debug, Clone)]
pub struct CheckoutSelectors {
    pub username_input: Locator,
    pub pin_input: Locator,
    pub login_submit: Locator,
    pub open_register_button: Locator,
    pub opening_amount_input: Locator,
    pub register_open_marker: Locator,
    pub product_card: Locator,
    pub process_sale_button: Locator,
    pub received_amount_input: Locator,
    pub confirm_button: Locator,
    pub sale_marker: Locator,
    pub ticket_link: Locator,
    pub total_marker: Locator,
}

impl CheckoutSelectors {
    pub fn standard() -> E2eResult<Self> {
        let text = TextPattern::literal;

        Ok(Self {
            username_input: Locator::css(r#"input[name="username"]"#),
            pin_input: Locator::css(r#"input[name="pin"]"#),
            login_submit: Locator::css(r#"button[type="submit"]"#),
            open_register_button: Locator::css("button").with_text(text("abrir caja")?),
            opening_amount_input: Locator::css(r#"input[name="monto_inicial"]"#),
            register_open_marker: Locator::text(text("caja abierta")?).first(),
            product_card: Locator::css(".product-card").first(),
            process_sale_button: Locator::css("button").with_text(text("procesar venta")?),
            received_amount_input: Locator::css(r#"input[name="monto_recibido"]"#),
            confirm_button: Locator::css("button").with_text(text("confirmar")?),
            sale_marker: Locator::text(text("venta #")?).first(),
            ticket_link: Locator::css("a").with_text(text("ver ticket")?),
            total_marker: Locator::text(text("total")?).first(),
        })
    }
}

/// Which optional branches a passing run took
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckoutSummary {
    pub register_opened: bool,
    pub ticket_link_followed: bool,
}

pub struct CheckoutScenario {
    config: ScenarioConfig,
    selectors: CheckoutSelectors,
}

impl CheckoutScenario {
    pub fn new(config: ScenarioConfig) -> E2eResult<Self> {
        Ok(Self::with_selectors(config, CheckoutSelectors::standard()?))
    }

    pub fn with_selectors(config: ScenarioConfig, selectors: CheckoutSelectors) -> Self {
        Self { config, selectors }
    }

    pub fn name(&self) -> &'static str {
        SCENARIO_NAME
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Drive `page` through the checkout flow, recording every step in `trace`
    pub async fn run<P>(&self, page: &mut P, trace: &mut ScenarioTrace) -> E2eResult<CheckoutSummary>
    where
        P: Page + ?Sized,
    {
        let sel = &self.selectors;
        let timeouts = self.config.timeouts;
        let credentials = &self.config.credentials;
        let fixtures = &self.config.fixtures;
        let mut summary = CheckoutSummary::default();

        let root = self.config.url(ROOT_PATH);
        trace.mandatory(Checkpoint::Start, "open root page", page.goto(&root)).await?;

        trace
            .mandatory(Checkpoint::Authenticating, "log in with PIN", async {
                page.fill(&sel.username_input, &credentials.username, timeouts.action).await?;
                page.fill(&sel.pin_input, &credentials.pin, timeouts.action).await?;
                page.click(&sel.login_submit, timeouts.action).await
            })
            .await?;

        let probe = trace
            .best_effort(
                Checkpoint::CashRegisterCheck,
                "probe open-register control",
                page.wait_visible(&sel.open_register_button, timeouts.probe),
            )
            .await?;

        if probe.is_completed() {
            trace
                .mandatory(Checkpoint::OpeningRegister, "open register", async {
                    page.fill(&sel.opening_amount_input, &fixtures.opening_amount, timeouts.action).await?;
                    page.click(&sel.open_register_button, timeouts.action).await
                })
                .await?;
            trace
                .mandatory(
                    Checkpoint::OpeningRegister,
                    "register open marker",
                    page.expect_visible(&sel.register_open_marker, timeouts.assertion),
                )
                .await?;
            summary.register_opened = true;
            info!("Register opened with {}", fixtures.opening_amount);
        }

        let sales = self.config.url(SALES_PATH);
        trace
            .mandatory(Checkpoint::ProductSelection, "add first product to cart", async {
                page.goto(&sales).await?;
                page.require(&sel.product_card, timeouts.assertion).await?;
                page.click(&sel.product_card, timeouts.action).await
            })
            .await?;

        trace
            .mandatory(Checkpoint::ProcessingSale, "process cash sale", async {
                page.click(&sel.process_sale_button, timeouts.action).await?;
                page.fill(&sel.received_amount_input, &fixtures.received_amount, timeouts.action).await?;
                page.click(&sel.confirm_button, timeouts.action).await
            })
            .await?;
        trace
            .mandatory(
                Checkpoint::ProcessingSale,
                "sale confirmation marker",
                page.expect_visible(&sel.sale_marker, timeouts.assertion),
            )
            .await?;

        let ticket = trace
            .best_effort(
                Checkpoint::TicketVerification,
                "open ticket",
                page.click(&sel.ticket_link, timeouts.optional_click),
            )
            .await?;
        summary.ticket_link_followed = ticket.is_completed();

        trace
            .mandatory(
                Checkpoint::TicketVerification,
                "ticket total marker",
                page.expect_visible(&sel.total_marker, timeouts.assertion),
            )
            .await?;

        Ok(summary)
    }
}
