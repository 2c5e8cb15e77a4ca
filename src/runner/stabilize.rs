use crate::config::{Stabilization, StabilizationTable};
use crate::driver::Driver;
use crate::trace::{EngineEvent, EventSink};
use crate::Result;
use std::time::Duration;

const STATE_CHANGING: &[&str] = &[
    "complete", "submit", "delete", "update", "save", "create", "add", "remove",
];

const TAB_NAV: &[&str] = &["tab", "nav"];

/// What a click is likely to do to the page, judged from its target description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    /// Mutates data; the UI updates after a server round-trip.
    StateChanging,
    /// Switches tab or navigation; content may render lazily.
    TabNav,
    Default,
}

impl ClickKind {
    /// Whole-word, case-insensitive keyword match. State-changing wins over tab/nav.
    pub fn classify(target: &str) -> Self {
        let lower = target.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has = |set: &[&str]| words.iter().any(|w| set.contains(w));

        if has(STATE_CHANGING) {
            Self::StateChanging
        } else if has(TAB_NAV) {
            Self::TabNav
        } else {
            Self::Default
        }
    }

    pub fn policy(&self, table: &StabilizationTable) -> Stabilization {
        match self {
            Self::StateChanging => table.state_changing,
            Self::TabNav => table.tab_nav,
            Self::Default => table.default_click,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            Self::StateChanging => "state-changing click",
            Self::TabNav => "tab/nav click",
            Self::Default => "click",
        }
    }
}

/// Settle, then wait for network idle; on idle timeout wait the fallback instead.
///
/// Only a fatal driver error escapes.
pub async fn stabilize<D: Driver + ?Sized>(
    driver: &D,
    sink: &dyn EventSink,
    step: u32,
    reason: &str,
    policy: Stabilization,
    idle_timeout: Duration,
) -> Result<()> {
    sink.emit(EngineEvent::StabilizationWait {
        step,
        reason: reason.to_string(),
        ms: policy.settle_ms,
    });
    driver.wait(policy.settle_ms).await;

    match driver.wait_for_idle(idle_timeout).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_fatal() => Err(e),
        Err(_) => {
            sink.emit(EngineEvent::IdleTimeout {
                step,
                fallback_ms: policy.fallback_ms,
            });
            driver.wait(policy.fallback_ms).await;
            Ok(())
        }
    }
}

/// [`stabilize`] with the policy chosen from the click's target.
pub async fn after_click<D: Driver + ?Sized>(
    driver: &D,
    sink: &dyn EventSink,
    step: u32,
    target: &str,
    table: &StabilizationTable,
    idle_timeout: Duration,
) -> Result<ClickKind> {
    let kind = ClickKind::classify(target);
    stabilize(driver, sink, step, kind.reason(), kind.policy(table), idle_timeout).await?;
    Ok(kind)
}

/// Best-effort idle wait that never fails unless the session is gone.
pub async fn idle_best_effort<D: Driver + ?Sized>(driver: &D, timeout: Duration) -> Result<()> {
    match driver.wait_for_idle(timeout).await {
        Err(e) if e.is_fatal() => Err(e),
        _ => Ok(()),
    }
}
