//! The browser surface the engine drives.
//!
//! Everything the executors need from a browser goes through [`Driver`], so the
//! engine can run against a real Chrome ([`EokaDriver`]) or a scripted fake in tests.

mod browser;

pub use browser::EokaDriver;

use crate::locator::Locator;
use crate::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Opaque reference to one element found by [`Driver::query_all`] or [`Driver::wait_for`].
///
/// Handles stay valid until the element leaves the DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub id: u64,
}

impl ElementHandle {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    /// CSS selector addressing exactly this element in the page.
    pub fn css(&self) -> String {
        format!("[data-repro-handle=\"{}\"]", self.id)
    }
}

/// State an element must reach before [`Driver::wait_for`] returns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// Present in the DOM.
    Attached,
    Visible,
    /// Visible, enabled, and accepts text.
    Editable,
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Attached => "attached",
            Self::Visible => "visible",
            Self::Editable => "editable",
        })
    }
}

/// Browser operations used by the step executors.
///
/// Errors are classified by the implementation: [`crate::Error::Driver`] means the
/// browser itself is gone and the run cannot continue; anything else is scoped to
/// the call that produced it.
#[async_trait(?Send)]
pub trait Driver {
    /// Load `url` and wait for the page's DOM to be ready.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Every element currently matching `locator`, in document order.
    async fn query_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    /// First element matching `locator` that reaches `state` within `timeout`.
    async fn wait_for(
        &self,
        locator: &Locator,
        state: WaitState,
        timeout: Duration,
    ) -> Result<ElementHandle>;

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool>;

    /// Rendered text of the element, if it has any.
    async fn text_content(&self, element: &ElementHandle) -> Result<Option<String>>;

    /// Replace the element's value with `value`.
    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()>;

    /// Current value of an input-like element.
    async fn read_value(&self, element: &ElementHandle) -> Result<String>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    /// PNG of the visible page.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Call the JS function expression `script`, passing `element` (or nothing).
    async fn evaluate(
        &self,
        script: &str,
        element: Option<&ElementHandle>,
    ) -> Result<serde_json::Value>;

    /// Wait until the network has been quiet for a moment.
    ///
    /// Returns [`crate::Error::Timeout`] if that does not happen within `timeout`.
    async fn wait_for_idle(&self, timeout: Duration) -> Result<()>;

    /// Sleep for `ms` milliseconds.
    async fn wait(&self, ms: u64);
}
