//! The verify step.
//!
//! When the target names both an entity and a place ("'X' in the Y tab"), the
//! entity must be found inside the active container; finding it anywhere else is
//! a [`Error::LocationMismatch`], reported distinctly from "not found". Otherwise
//! locators are tried in order, then containers near the quoted text, then a
//! keyword scan of the page.

use super::executor::ms;
use super::resolve::resolve;
use super::stabilize;
use super::{ExecutionResult, Runner};
use crate::artifacts;
use crate::config::Step;
use crate::driver::{Driver, ElementHandle, WaitState};
use crate::locator::{extract_context, xpath_literal, Locator};
use crate::trace::EngineEvent;
use crate::{Error, Result};
use regex::RegexBuilder;

const TEXT_BEARING: &str = "span, div, h1, h2, h3, h4, h5, p, td, li";

const BODY_TEXT_JS: &str = "(() => document.body ? document.body.innerText : '')";

/// Occurrences elsewhere are counted up to this many for the mismatch message.
const ELSEWHERE_LIMIT: usize = 5;

/// Characters of page text kept on each side of a keyword for a partial result.
const SNIPPET_RADIUS: usize = 100;

const KEYWORD_NOISE: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "tab", "section", "area",
    "are", "should", "shows", "show", "displayed", "visible", "verify", "check", "page",
    "element", "text", "has", "have", "now",
];

/// Fill a container template with XPath literals.
fn render(template: &str, anchor: Option<&str>, location: Option<&str>) -> Locator {
    let mut out = template.to_string();
    if let Some(anchor) = anchor {
        out = out.replace("{anchor}", &xpath_literal(anchor));
    }
    if let Some(location) = location {
        out = out.replace("{location}", &xpath_literal(&location.to_lowercase()));
    }
    Locator::parse(&out)
}

fn keywords(target: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in target
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3 && !KEYWORD_NOISE.contains(w))
    {
        if !out.iter().any(|k| k == word) {
            out.push(word.to_string());
        }
    }
    out
}

/// Text around the first case-insensitive occurrence of `keyword`.
fn snippet(text: &str, keyword: &str) -> Option<String> {
    let re = RegexBuilder::new(&regex::escape(keyword))
        .case_insensitive(true)
        .build()
        .ok()?;
    let m = re.find(text)?;

    let start = text[..m.start()]
        .char_indices()
        .rev()
        .nth(SNIPPET_RADIUS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = text[m.end()..]
        .char_indices()
        .nth(SNIPPET_RADIUS)
        .map(|(i, _)| m.end() + i)
        .unwrap_or(text.len());

    Some(text[start..end].split_whitespace().collect::<Vec<_>>().join(" "))
}

impl<D: Driver> Runner<D> {
    pub(super) async fn verify(&self, step: &Step) -> Result<ExecutionResult> {
        let n = step.step_number;
        let timing = &self.settings.timing;

        stabilize::stabilize(
            &self.driver,
            &*self.sink,
            n,
            "before verify",
            timing.stabilization.pre_verify,
            ms(timing.idle_timeout_ms),
        )
        .await?;

        let ctx = extract_context(&step.target);
        if let (Some(anchor), Some(location)) = (&ctx.anchor_text, &ctx.expected_location) {
            return self.verify_in_location(n, anchor, location).await;
        }

        let anchor = ctx.anchor_text.as_deref();
        let driver = &self.driver;
        let timeout = ms(timing.verify_probe_ms);

        let resolved = resolve(
            &*self.sink,
            n,
            &step.target,
            &self.candidates(step),
            move |locator| async move {
                let element = driver
                    .wait_for(&locator, WaitState::Attached, timeout)
                    .await?;
                if !driver.is_visible(&element).await? {
                    return Err(Error::LocatorNotFound(format!("{} is not visible", locator)));
                }
                let text = driver.text_content(&element).await?.unwrap_or_default();
                if let Some(anchor) = anchor {
                    if !text.contains(anchor) {
                        return Err(Error::LocatorNotFound(format!(
                            "{} does not contain '{}'",
                            locator, anchor
                        )));
                    }
                }
                Ok(text.trim().to_string())
            },
        )
        .await;

        let exhausted = match resolved {
            Ok(found) => {
                return Ok(ExecutionResult::success(format!("verified '{}'", step.target))
                    .with_locator(found.locator)
                    .with_text(found.value));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => e,
        };

        if let Some(anchor) = anchor {
            if let Some((locator, text)) = self.near_anchor(anchor).await? {
                return Ok(
                    ExecutionResult::success(format!("found value next to '{}'", anchor))
                        .with_locator(locator)
                        .with_text(text),
                );
            }
        }

        if let Some(result) = self.keyword_scan(n, &step.target).await? {
            return Ok(result);
        }

        Err(exhausted)
    }

    /// Anchor must sit inside the active container named by `location`.
    async fn verify_in_location(
        &self,
        step: u32,
        anchor: &str,
        location: &str,
    ) -> Result<ExecutionResult> {
        let containers = &self.settings.containers;

        let tab_active = self.location_is_active(location).await?;
        self.sink.emit(EngineEvent::LocationCheck {
            step,
            location: location.to_string(),
            verified: tab_active,
        });

        for template in &containers.active_pane {
            let locator = render(template, Some(anchor), Some(location));
            for element in self.query_quietly(&locator).await? {
                if !self.driver.is_visible(&element).await? {
                    continue;
                }
                let text = self.driver.text_content(&element).await?.unwrap_or_default();
                if !text.contains(anchor) || self.in_inactive_pane(&element).await? {
                    continue;
                }
                return Ok(ExecutionResult::success(format!(
                    "'{}' found in the active '{}' container",
                    anchor, location
                ))
                .with_locator(locator)
                .with_text(text.trim())
                .with_location(true));
            }
        }

        let elsewhere = self.count_elsewhere(anchor).await?;
        let detail = if elsewhere > 0 {
            format!("found in {} other location(s)", elsewhere)
        } else {
            "not found anywhere".to_string()
        };
        Err(Error::LocationMismatch(format!(
            "LOCATION MISMATCH: '{}' NOT found in '{}' tab ({})",
            anchor, location, detail
        )))
    }

    /// Whether any active-tab pattern matches a visible element.
    async fn location_is_active(&self, location: &str) -> Result<bool> {
        for template in &self.settings.containers.active_tab {
            let locator = render(template, None, Some(location));
            for element in self.query_quietly(&locator).await? {
                if self.driver.is_visible(&element).await? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// True if the element's nearest pane is not marked active.
    async fn in_inactive_pane(&self, element: &ElementHandle) -> Result<bool> {
        let containers = &self.settings.containers;
        let script = format!(
            "(el => {{ const pane = el.closest({}); if (!pane) return false; return !{}.some(c => pane.classList.contains(c)); }})",
            serde_json::Value::from(containers.pane_selector.as_str()),
            serde_json::Value::from(containers.active_classes.clone()),
        );
        match self.driver.evaluate(&script, Some(element)).await {
            Ok(value) => Ok(value.as_bool().unwrap_or(false)),
            Err(e) if e.is_fatal() => Err(e),
            Err(_) => Ok(false),
        }
    }

    async fn count_elsewhere(&self, anchor: &str) -> Result<usize> {
        let locator = Locator::xpath(format!("//*[contains(text(), {})]", xpath_literal(anchor)));
        let mut count = 0;
        for element in self.query_quietly(&locator).await? {
            if count == ELSEWHERE_LIMIT {
                break;
            }
            if self.driver.is_visible(&element).await? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// First visible text-bearing element inside a container that mentions `anchor`.
    async fn near_anchor(&self, anchor: &str) -> Result<Option<(Locator, String)>> {
        for template in &self.settings.containers.anchor_containers {
            let container = render(template, Some(anchor), None);
            let locator = Locator::xpath(format!(
                "({})//*[self::span or self::h1 or self::h2 or self::div or self::p]",
                container.expr()
            ));
            for element in self.query_quietly(&locator).await? {
                if !self.driver.is_visible(&element).await? {
                    continue;
                }
                let text = self.driver.text_content(&element).await?.unwrap_or_default();
                let text = text.trim();
                if !text.is_empty() {
                    return Ok(Some((locator, text.to_string())));
                }
            }
        }
        Ok(None)
    }

    /// Smallest scanned element mentioning a keyword; failing that, page text
    /// around one as a partial result.
    async fn keyword_scan(&self, step: u32, target: &str) -> Result<Option<ExecutionResult>> {
        let keywords = keywords(target);
        if keywords.is_empty() {
            return Ok(None);
        }

        let limit = self.settings.timing.keyword_scan_limit;
        let elements = self.query_quietly(&Locator::css(TEXT_BEARING)).await?;
        let mut best: Option<(String, String)> = None;
        for element in elements.into_iter().take(limit) {
            if !self.driver.is_visible(&element).await? {
                continue;
            }
            let Some(text) = self.driver.text_content(&element).await? else {
                continue;
            };
            let text = text.trim();
            let lower = text.to_lowercase();
            let Some(keyword) = keywords.iter().find(|k| lower.contains(k.as_str())) else {
                continue;
            };
            if best.as_ref().map_or(true, |(t, _)| text.len() < t.len()) {
                best = Some((text.to_string(), keyword.clone()));
            }
        }
        if let Some((text, keyword)) = best {
            return Ok(Some(
                ExecutionResult::success(format!("found keyword '{}' on the page", keyword))
                    .with_text(text),
            ));
        }

        let body = match self.driver.evaluate(BODY_TEXT_JS, None).await {
            Ok(value) => value.as_str().unwrap_or_default().to_string(),
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => return Ok(None),
        };
        for keyword in &keywords {
            if let Some(context) = snippet(&body, keyword) {
                let reference = self.capture(step, &artifacts::partial_label()).await;
                return Ok(Some(
                    ExecutionResult::partial(format!(
                        "keyword '{}' is in the page text but no element matched",
                        keyword
                    ))
                    .with_text(context)
                    .with_artifact(reference),
                ));
            }
        }
        Ok(None)
    }

    /// `query_all` where a broken selector just means no matches.
    async fn query_quietly(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        match self.driver.query_all(locator).await {
            Ok(found) => Ok(found),
            Err(e) if e.is_fatal() => Err(e),
            Err(_) => Ok(Vec::new()),
        }
    }
}
