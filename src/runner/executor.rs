use super::resolve::resolve;
use super::stabilize::{self, ClickKind};
use super::{ExecutionResult, Runner};
use crate::config::params::has_placeholder;
use crate::config::Step;
use crate::driver::{Driver, WaitState};
use crate::locator::{candidates, is_sensitive, mask, Locator};
use crate::trace::EngineEvent;
use crate::{Error, Result};
use std::time::Duration;
use tracing::debug;

/// Elements worth listing when a click finds nothing.
const CLICKABLE: &str = "button, a, [role='button'], [role='tab'], input[type='submit']";
const CLICKABLE_LISTED: usize = 10;

/// The description the planner uses when it did not know the URL.
const URL_PLACEHOLDER: &str = "application URL";

pub(super) fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

impl<D: Driver> Runner<D> {
    /// Planner-supplied locators first, then generated ones, without repeats.
    pub(super) fn candidates(&self, step: &Step) -> Vec<Locator> {
        candidates::dedup(
            step.selectors
                .iter()
                .cloned()
                .chain(candidates::generate(&step.target))
                .collect(),
        )
    }

    pub(super) async fn navigate(&self, step: &Step) -> Result<ExecutionResult> {
        let url = step.value_trimmed().unwrap_or_default();
        if url.is_empty() || url.eq_ignore_ascii_case(URL_PLACEHOLDER) || has_placeholder(url) {
            return Err(Error::InvalidInput(format!(
                "navigate needs a concrete URL, got '{}'",
                url
            )));
        }

        let timing = &self.settings.timing;
        self.driver.navigate(url, ms(timing.navigate_timeout_ms)).await?;
        self.driver.wait(timing.navigate_settle_ms).await;

        Ok(ExecutionResult::success(format!("navigated to {}", url)))
    }

    pub(super) async fn fill(&self, step: &Step) -> Result<ExecutionResult> {
        let value = step
            .value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::InvalidInput(format!("fill '{}' has no value", step.target)))?;

        let sensitive = is_sensitive(&step.target);
        let shown = if sensitive {
            mask(value)
        } else {
            value.to_string()
        };
        let shown = shown.as_str();
        let timeout = ms(self.settings.timing.fill_probe_ms);
        let settle = self.settings.timing.fill_settle_ms;
        let driver = &self.driver;

        let resolved = resolve(
            &*self.sink,
            step.step_number,
            &step.target,
            &self.candidates(step),
            move |locator| async move {
                let element = driver
                    .wait_for(&locator, WaitState::Editable, timeout)
                    .await?;
                driver.fill(&element, "").await?;
                driver.wait(settle).await;
                driver.fill(&element, value).await?;
                driver.wait(settle).await;

                // reading a secret back would put it in the result
                if !sensitive {
                    let actual = driver.read_value(&element).await?;
                    if actual != value {
                        return Err(Error::ValueMismatch(format!(
                            "{} holds '{}', expected '{}'",
                            locator, actual, shown
                        )));
                    }
                }
                Ok(())
            },
        )
        .await?;

        Ok(
            ExecutionResult::success(format!("filled '{}' with '{}'", step.target, shown))
                .with_locator(resolved.locator),
        )
    }

    pub(super) async fn click(&self, step: &Step) -> Result<ExecutionResult> {
        let n = step.step_number;
        let timing = &self.settings.timing;
        let timeout = match ClickKind::classify(&step.target) {
            ClickKind::TabNav => ms(timing.tab_probe_ms),
            _ => ms(timing.click_probe_ms),
        };
        let driver = &self.driver;
        let sink = &*self.sink;

        let resolved = resolve(
            sink,
            n,
            &step.target,
            &self.candidates(step),
            move |locator| async move {
                let element = driver
                    .wait_for(&locator, WaitState::Visible, timeout)
                    .await?;
                if locator.is_generic() {
                    let matches = driver.query_all(&locator).await?.len();
                    if matches > 1 {
                        sink.emit(EngineEvent::AmbiguousMatch {
                            step: n,
                            locator: locator.to_string(),
                            matches,
                        });
                    }
                }
                driver.click(&element).await
            },
        )
        .await;

        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                if !e.is_fatal() {
                    self.list_clickables(n).await;
                }
                return Err(e);
            }
        };

        stabilize::after_click(
            driver,
            sink,
            n,
            &step.target,
            &timing.stabilization,
            ms(timing.idle_timeout_ms),
        )
        .await?;

        Ok(ExecutionResult::success(format!("clicked '{}'", step.target))
            .with_locator(resolved.locator))
    }

    /// Log what could have been clicked instead.
    async fn list_clickables(&self, step: u32) {
        let Ok(found) = self.driver.query_all(&Locator::css(CLICKABLE)).await else {
            return;
        };
        let mut listed = 0;
        for element in found {
            if listed == CLICKABLE_LISTED {
                break;
            }
            if !matches!(self.driver.is_visible(&element).await, Ok(true)) {
                continue;
            }
            let text = match self.driver.text_content(&element).await {
                Ok(Some(text)) => text.trim().chars().take(50).collect::<String>(),
                _ => String::new(),
            };
            listed += 1;
            debug!("Step {}: clickable {}: '{}'", step, listed, text);
        }
    }

    pub(super) async fn wait_step(&self, step: &Step) -> Result<ExecutionResult> {
        let timing = &self.settings.timing;
        let wait_ms = step
            .value_trimmed()
            .filter(|v| v.chars().all(|c| c.is_ascii_digit()))
            .and_then(|v| v.parse().ok())
            .unwrap_or(timing.default_wait_ms);

        self.driver.wait(wait_ms).await;
        if wait_ms >= 1_000 {
            stabilize::idle_best_effort(&self.driver, ms(timing.wait_idle_timeout_ms)).await?;
        }

        Ok(ExecutionResult::success(format!("waited {}ms", wait_ms)))
    }

    pub(super) async fn screenshot(&self, step: &Step) -> Result<ExecutionResult> {
        let png = self.driver.screenshot().await?;
        let reference = self.store(step.step_number, "screenshot", &png);
        let message = match reference {
            Some(ref r) => format!("screenshot saved to {}", r),
            None => "screenshot taken but not stored".to_string(),
        };
        Ok(ExecutionResult::success(message).with_artifact(reference))
    }
}
