//! In-memory stand-in for the POS UI, for scenario tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;

/// How the simulated POS application behaves
#[derive(Debug, Clone)]
pub struct PosBehavior {
    pub username: String,
    pub pin: String,
    pub register_already_open: bool,
    pub register_open_succeeds: bool,
    pub products: usize,
    pub sale_succeeds: bool,
    pub ticket_link: bool,
    pub total_inline: bool,
    pub crash_on_probe: bool,
    pub hang_on_confirm: bool,
    /// Hidden copies of the markers precede the real ones in the DOM
    pub hidden_templates: bool,
}

impl Default for PosBehavior {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            pin: "1234".to_string(),
            register_already_open: true,
            register_open_succeeds: true,
            products: 1,
            sale_succeeds: true,
            ticket_link: true,
            total_inline: false,
            crash_on_probe: false,
            hang_on_confirm: false,
            hidden_templates: false,
        }
    }
}

#[derive(Debug, Clone)]
struct Element {
    id: &'static str,
    selectors: &'static [&'static str],
    text: String,
    visible: bool,
}

impl Element {
    fn new(id: &'static str, selectors: &'static [&'static str], text: impl Into<String>) -> Self {
        Self { id, selectors, text: text.into(), visible: true }
    }

    fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    fn matches(&self, locator: &Locator) -> bool {
        let css_ok = locator
            .css_selector()
            .map(|css| self.selectors.contains(&css))
            .unwrap_or(true);
        let text_ok = locator
            .text_pattern()
            .map(|pattern| pattern.is_match(&self.text))
            .unwrap_or(true);
        css_ok && text_ok
    }
}

/// One `Page` call that waits on a locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCall {
    pub op: &'static str,
    pub locator: String,
    pub timeout: Duration,
}

/// A [`Page`] over a tiny model of the POS screens
#[derive(Debug)]
pub struct FakePos {
    behavior: PosBehavior,
    path: String,
    logged_in: bool,
    register_open: bool,
    register_just_opened: bool,
    cart: Vec<usize>,
    checkout_open: bool,
    sale_done: bool,
    ticket_view: bool,
    typed: HashMap<String, String>,
    visited: Vec<String>,
    screenshots: Vec<PathBuf>,
    calls: Vec<PageCall>,
}

impl FakePos {
    pub fn new(behavior: PosBehavior) -> Self {
        Self {
            register_open: behavior.register_already_open,
            behavior,
            path: "about:blank".to_string(),
            logged_in: false,
            register_just_opened: false,
            cart: Vec::new(),
            checkout_open: false,
            sale_done: false,
            ticket_view: false,
            typed: HashMap::new(),
            visited: Vec::new(),
            screenshots: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Last value typed into the input named `name`
    pub fn typed(&self, name: &str) -> Option<&str> {
        self.typed.get(name).map(String::as_str)
    }

    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    /// Indices of the product cards clicked
    pub fn cart(&self) -> &[usize] {
        &self.cart
    }

    pub fn saw_sale_confirmation(&self) -> bool {
        self.sale_done
    }

    pub fn screenshots(&self) -> &[PathBuf] {
        &self.screenshots
    }

    pub fn calls(&self) -> &[PageCall] {
        &self.calls
    }

    /// Timeouts passed to `op` on `locator`, in call order
    pub fn timeouts_for(&self, op: &str, locator: &Locator) -> Vec<Duration> {
        let locator = locator.to_string();
        self.calls
            .iter()
            .filter(|call| call.op == op && call.locator == locator)
            .map(|call| call.timeout)
            .collect()
    }

    fn record(&mut self, op: &'static str, locator: &Locator, timeout: Duration) {
        self.calls.push(PageCall { op, locator: locator.to_string(), timeout });
    }

    fn render(&self) -> Vec<Element> {
        let mut elements = Vec::new();

        if !self.logged_in {
            elements.push(Element::new("username", &[r#"input[name="username"]"#, "input"], ""));
            elements.push(Element::new("pin", &[r#"input[name="pin"]"#, "input"], ""));
            elements.push(Element::new("login", &[r#"button[type="submit"]"#, "button"], "Ingresar"));
            return elements;
        }

        if !self.register_open {
            elements.push(Element::new("open_register", &["button"], "Abrir Caja"));
            elements.push(Element::new("opening_amount", &[r#"input[name="monto_inicial"]"#, "input"], ""));
        }
        if self.behavior.hidden_templates {
            elements.push(Element::new("flash_template", &["div"], "Caja abierta").hidden());
        }
        if self.register_just_opened {
            elements.push(Element::new("flash", &["div"], "Caja abierta correctamente"));
        }

        if self.path.ends_with("/vender/") {
            if self.behavior.hidden_templates {
                elements.push(Element::new("product_template", &[".product-card", "div"], "Producto").hidden());
            }
            for _ in 0..self.behavior.products {
                elements.push(Element::new("product", &[".product-card", "div"], "Producto"));
            }
            if !self.cart.is_empty() {
                elements.push(Element::new("process", &["button"], "Procesar Venta"));
            }
            if self.checkout_open {
                elements.push(Element::new("received", &[r#"input[name="monto_recibido"]"#, "input"], ""));
                elements.push(Element::new("confirm", &["button"], "Confirmar"));
            }
            if self.behavior.hidden_templates {
                elements.push(Element::new("sale_template", &["h4"], "Venta #0").hidden());
                elements.push(Element::new("total_template", &["td"], "Total: $0").hidden());
            }
            if self.sale_done {
                elements.push(Element::new("sale", &["h4"], "Venta #17 registrada"));
                if self.behavior.ticket_link {
                    elements.push(Element::new("ticket", &["a"], "Ver ticket"));
                }
                if self.behavior.total_inline || self.ticket_view {
                    elements.push(Element::new("total", &["td"], "Total: $12.000"));
                }
            }
        }

        elements
    }

    fn find(&self, locator: &Locator) -> Option<(usize, Element)> {
        let mut index = 0;
        for element in self.render() {
            if element.visible && element.matches(locator) {
                return Some((index, element));
            }
            if element.id == "product" {
                index += 1;
            }
        }
        None
    }

    fn locate(&self, locator: &Locator) -> E2eResult<(usize, Element)> {
        self.find(locator).ok_or_else(|| E2eError::Locator {
            locator: locator.to_string(),
            reason: format!("no match on {}", self.path),
        })
    }

    fn input_name(id: &str) -> &str {
        match id {
            "opening_amount" => "monto_inicial",
            "received" => "monto_recibido",
            other => other,
        }
    }
}

#[async_trait]
impl Page for FakePos {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.visited.push(url.to_string());
        self.path = url.to_string();
        self.register_just_opened = false;
        Ok(())
    }

    async fn fill(&mut self, locator: &Locator, value: &str, timeout: Duration) -> E2eResult<()> {
        self.record("fill", locator, timeout);
        let (_, element) = self.locate(locator)?;
        self.typed.insert(Self::input_name(element.id).to_string(), value.to_string());
        Ok(())
    }

    async fn click(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        self.record("click", locator, timeout);
        let (index, element) = self.locate(locator)?;
        match element.id {
            "login" => {
                self.logged_in = self.typed("username") == Some(self.behavior.username.as_str())
                    && self.typed("pin") == Some(self.behavior.pin.as_str());
            }
            "open_register" => {
                if self.behavior.register_open_succeeds {
                    self.register_open = true;
                    self.register_just_opened = true;
                }
            }
            "product" => self.cart.push(index),
            "process" => self.checkout_open = true,
            "confirm" => {
                if self.behavior.hang_on_confirm {
                    std::future::pending::<()>().await;
                }
                self.sale_done = self.behavior.sale_succeeds && self.typed("monto_recibido").is_some();
            }
            "ticket" => self.ticket_view = true,
            _ => {}
        }
        Ok(())
    }

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool> {
        Ok(self.find(locator).is_some())
    }

    async fn wait_visible(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        self.record("wait_visible", locator, timeout);
        if self.behavior.crash_on_probe && locator.to_string().contains("abrir caja") {
            return Err(E2eError::Bridge("bridge exited unexpectedly".to_string()));
        }
        if self.is_visible(locator).await? {
            Ok(())
        } else {
            Err(E2eError::AssertionTimeout {
                what: locator.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn screenshot(&mut self, path: &Path, _full_page: bool) -> E2eResult<()> {
        self.screenshots.push(path.to_path_buf());
        Ok(())
    }
}
