//! Structured events emitted while a plan runs.
//!
//! The engine reports every decision it makes (which locator it tried, why it
//! waited, what it captured) as an [`EngineEvent`]. Sinks decide what to do with
//! them: [`TracingSink`] logs them, [`MemorySink`] keeps them for inspection.

use serde::Serialize;
use std::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    StepStarted {
        step: u32,
        action: String,
        target: String,
        /// Masked when the target is sensitive.
        value: Option<String>,
    },
    CandidateAttempted {
        step: u32,
        index: usize,
        total: usize,
        locator: String,
    },
    CandidateFailed {
        step: u32,
        locator: String,
        error: String,
    },
    CandidateSucceeded {
        step: u32,
        locator: String,
        attempts: usize,
    },
    /// A generic locator matched more than one element; the first was used.
    AmbiguousMatch {
        step: u32,
        locator: String,
        matches: usize,
    },
    StabilizationWait {
        step: u32,
        reason: String,
        ms: u64,
    },
    IdleTimeout {
        step: u32,
        fallback_ms: u64,
    },
    LocationCheck {
        step: u32,
        location: String,
        verified: bool,
    },
    ArtifactCaptured {
        step: u32,
        label: String,
        reference: String,
    },
    ArtifactFailed {
        step: u32,
        label: String,
        error: String,
    },
    StepFinished {
        step: u32,
        status: String,
        message: String,
        duration_ms: u64,
    },
    RunAborted {
        step: u32,
        reason: String,
    },
}

/// Receives engine events.
pub trait EventSink {
    fn emit(&self, event: EngineEvent);
}

/// Logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::StepStarted {
                step,
                action,
                target,
                value,
            } => match value {
                Some(v) => info!("Step {}: {} '{}' = '{}'", step, action, target, v),
                None => info!("Step {}: {} '{}'", step, action, target),
            },
            EngineEvent::CandidateAttempted {
                step,
                index,
                total,
                locator,
            } => debug!("Step {}: trying locator {}/{}: {}", step, index, total, locator),
            EngineEvent::CandidateFailed {
                step,
                locator,
                error,
            } => debug!("Step {}: locator {} failed: {}", step, locator, error),
            EngineEvent::CandidateSucceeded {
                step,
                locator,
                attempts,
            } => debug!(
                "Step {}: matched {} after {} attempt(s)",
                step, locator, attempts
            ),
            EngineEvent::AmbiguousMatch {
                step,
                locator,
                matches,
            } => warn!(
                "Step {}: generic locator {} matched {} elements, using the first",
                step, locator, matches
            ),
            EngineEvent::StabilizationWait { step, reason, ms } => {
                debug!("Step {}: waiting {}ms ({})", step, ms, reason)
            }
            EngineEvent::IdleTimeout { step, fallback_ms } => debug!(
                "Step {}: network not idle, waiting {}ms more",
                step, fallback_ms
            ),
            EngineEvent::LocationCheck {
                step,
                location,
                verified,
            } => {
                if verified {
                    info!("Step {}: '{}' tab is active", step, location);
                } else {
                    warn!("Step {}: could not confirm '{}' tab is active", step, location);
                }
            }
            EngineEvent::ArtifactCaptured {
                step,
                label,
                reference,
            } => info!("Step {}: saved {} to {}", step, label, reference),
            EngineEvent::ArtifactFailed { step, label, error } => {
                warn!("Step {}: could not save {}: {}", step, label, error)
            }
            EngineEvent::StepFinished {
                step,
                status,
                message,
                duration_ms,
            } => {
                if status == "success" {
                    info!("Step {}: {} ({}ms)", step, message, duration_ms);
                } else {
                    warn!("Step {} {}: {} ({}ms)", step, status, message, duration_ms);
                }
            }
            EngineEvent::RunAborted { step, reason } => {
                warn!("Run aborted at step {}: {}", step, reason)
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<EngineEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.emit(EngineEvent::RunAborted {
            step: 1,
            reason: "navigation failed".into(),
        });
        sink.emit(EngineEvent::IdleTimeout {
            step: 2,
            fallback_ms: 1000,
        });
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], EngineEvent::RunAborted { step: 1, .. }));
    }

    #[test]
    fn events_serialize_tagged() {
        let json = serde_json::to_value(EngineEvent::AmbiguousMatch {
            step: 3,
            locator: ".btn".into(),
            matches: 4,
        })
        .unwrap();
        assert_eq!(json["event"], "ambiguous_match");
        assert_eq!(json["matches"], 4);
    }
}
