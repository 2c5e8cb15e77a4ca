use super::{Driver, ElementHandle, WaitState};
use crate::config::BrowserConfig;
use crate::locator::Locator;
use crate::{Error, Result};
use async_trait::async_trait;
use eoka::{Browser, Page};
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_MS: u64 = 100;
const NETWORK_QUIET_MS: u64 = 500;

/// Finds elements and tags each one with a stable `data-repro-handle` id.
///
/// `text` matches elements whose own trimmed text equals the expression, ignoring
/// case; only the innermost such elements are returned.
const QUERY_JS: &str = r#"((kind, expr) => {
    let found = [];
    if (kind === 'css') {
        found = Array.from(document.querySelectorAll(expr));
    } else if (kind === 'xpath') {
        const snap = document.evaluate(expr, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
        for (let i = 0; i < snap.snapshotLength; i++) {
            const node = snap.snapshotItem(i);
            if (node.nodeType === Node.ELEMENT_NODE) found.push(node);
        }
    } else {
        const want = expr.trim().toLowerCase();
        const hits = Array.from(document.querySelectorAll('body *'))
            .filter(el => (el.innerText || el.textContent || '').trim().toLowerCase() === want);
        found = hits.filter(el => !hits.some(other => other !== el && el.contains(other)));
    }
    window.__reproHandleSeq = window.__reproHandleSeq || 0;
    return found.map(el => {
        if (!el.hasAttribute('data-repro-handle')) {
            el.setAttribute('data-repro-handle', String(++window.__reproHandleSeq));
        }
        return Number(el.getAttribute('data-repro-handle'));
    });
})"#;

const VISIBLE_JS: &str = r#"(el => {
    if (!el || !el.isConnected) return false;
    const style = getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    return style.visibility !== 'hidden' && style.display !== 'none' && rect.width > 0 && rect.height > 0;
})"#;

const EDITABLE_JS: &str = r#"(el => {
    if (!el || el.disabled || el.readOnly) return false;
    const tag = el.tagName.toLowerCase();
    return tag === 'input' || tag === 'textarea' || tag === 'select' || el.isContentEditable;
})"#;

/// [`Driver`] backed by a real Chrome through eoka.
pub struct EokaDriver {
    browser: Browser,
    page: Page,
}

impl EokaDriver {
    /// Launch a browser with one blank page.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self { browser, page })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        script: &str,
        element: &ElementHandle,
    ) -> Result<T> {
        let js = format!("{script}(document.querySelector({}))", quote(&element.css()));
        self.page.evaluate(&js).await.map_err(script_error)
    }

    async fn in_state(&self, element: &ElementHandle, state: WaitState) -> Result<bool> {
        match state {
            WaitState::Attached => Ok(true),
            WaitState::Visible => self.is_visible(element).await,
            WaitState::Editable => {
                Ok(self.is_visible(element).await? && self.call(EDITABLE_JS, element).await?)
            }
        }
    }
}

fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// The browser process or its connection is gone; nothing else will work.
fn is_disconnect(e: &eoka::Error) -> bool {
    let msg = e.to_string().to_lowercase();
    ["connection closed", "target closed", "browser closed", "disconnected", "broken pipe"]
        .iter()
        .any(|m| msg.contains(m))
}

fn classify(e: eoka::Error, scoped: fn(String) -> Error) -> Error {
    if is_disconnect(&e) {
        Error::Driver(e.to_string())
    } else {
        scoped(e.to_string())
    }
}

fn script_error(e: eoka::Error) -> Error {
    classify(e, Error::Script)
}

#[async_trait(?Send)]
impl Driver for EokaDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(classify(e, Error::Navigation)),
            Err(_) => Err(Error::Navigation(format!(
                "{} did not load within {}ms",
                url,
                timeout.as_millis()
            ))),
        }
    }

    async fn query_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let js = format!(
            "{QUERY_JS}({}, {})",
            quote(locator.kind()),
            quote(locator.expr())
        );
        let ids: Vec<u64> = self.page.evaluate(&js).await.map_err(script_error)?;
        Ok(ids.into_iter().map(ElementHandle::new).collect())
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        state: WaitState,
        timeout: Duration,
    ) -> Result<ElementHandle> {
        let start = Instant::now();
        loop {
            let found = self.query_all(locator).await?;
            for element in &found {
                if self.in_state(element, state).await? {
                    return Ok(*element);
                }
            }
            if start.elapsed() >= timeout {
                let ms = timeout.as_millis();
                return Err(if found.is_empty() {
                    Error::LocatorNotFound(format!("{locator} matched nothing within {ms}ms"))
                } else {
                    Error::Timeout(format!("{locator} not {state} within {ms}ms"))
                });
            }
            tokio::time::sleep(Duration::from_millis(POLL_MS)).await;
        }
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool> {
        self.call(VISIBLE_JS, element).await
    }

    async fn text_content(&self, element: &ElementHandle) -> Result<Option<String>> {
        self.call(
            "(el => el ? (el.innerText ?? el.textContent) : null)",
            element,
        )
        .await
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()> {
        self.page
            .fill(&element.css(), value)
            .await
            .map(|_| ())
            .map_err(|e| classify(e, Error::Script))
    }

    async fn read_value(&self, element: &ElementHandle) -> Result<String> {
        let value: Option<String> = self
            .call("(el => el ? (el.value ?? el.textContent) : null)", element)
            .await?;
        value.ok_or_else(|| Error::LocatorNotFound(format!("{} is gone", element.css())))
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.page
            .click(&element.css())
            .await
            .map(|_| ())
            .map_err(|e| classify(e, Error::Script))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot()
            .await
            .map_err(|e| classify(e, Error::Script))
    }

    async fn evaluate(
        &self,
        script: &str,
        element: Option<&ElementHandle>,
    ) -> Result<serde_json::Value> {
        match element {
            Some(el) => self.call(script, el).await,
            None => self
                .page
                .evaluate(&format!("({script})()"))
                .await
                .map_err(script_error),
        }
    }

    async fn wait_for_idle(&self, timeout: Duration) -> Result<()> {
        let ms = timeout.as_millis() as u64;
        self.page
            .wait_for_network_idle(NETWORK_QUIET_MS, ms)
            .await
            .map(|_| ())
            .map_err(|e| classify(e, Error::Timeout))
    }

    async fn wait(&self, ms: u64) {
        self.page.wait(ms).await;
    }
}
