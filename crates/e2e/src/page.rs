//! Browser automation primitives consumed by scenarios

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

/// One isolated browser page.
///
/// Every call suspends until the backend finishes the operation or its
/// timeout elapses. Implementations report a missing or non-actionable
/// target of `fill`/`click` as [`E2eError::Locator`] and an unmet
/// visibility wait as [`E2eError::AssertionTimeout`]. A locator marked
/// `first` resolves to its first visible match; hidden matches are skipped.
#[async_trait]
pub trait Page: Send {
    /// Navigate to an absolute URL and wait for the load event
    async fn goto(&mut self, url: &str) -> E2eResult<()>;

    /// Replace the value of an input
    async fn fill(&mut self, locator: &Locator, value: &str, timeout: Duration) -> E2eResult<()>;

    /// Click an element once it is visible and enabled
    async fn click(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<()>;

    /// Visibility right now, without waiting. Never fails on absence.
    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool>;

    /// Wait until the locator resolves to a visible element
    async fn wait_visible(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<()>;

    /// Save a screenshot of the page
    async fn screenshot(&mut self, path: &Path, full_page: bool) -> E2eResult<()>;

    /// Assertion form of [`Page::wait_visible`]
    async fn expect_visible(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        self.wait_visible(locator, timeout).await
    }

    /// Like [`Page::wait_visible`], but a miss means the element is not
    /// there at all and is reported as a locator error.
    async fn require(&mut self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        match self.wait_visible(locator, timeout).await {
            Err(E2eError::AssertionTimeout { timeout_ms, .. }) => Err(E2eError::Locator {
                locator: locator.to_string(),
                reason: format!("no visible match within {} ms", timeout_ms),
            }),
            other => other,
        }
    }
}
