mod executor;
mod resolve;
mod result;
mod stabilize;
mod verify;

pub use resolve::Resolved;
pub use result::{ExecutionResult, RunReport, StepStatus};
pub use stabilize::ClickKind;

use crate::artifacts::{self, ArtifactStore, FsArtifactStore};
use crate::config::{Action, EngineSettings, Plan, Step};
use crate::driver::{Driver, EokaDriver};
use crate::locator::{is_sensitive, mask};
use crate::trace::{EngineEvent, EventSink, TracingSink};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Executes plan steps against one browser page.
///
/// Steps run strictly one after another; each produces exactly one
/// [`ExecutionResult`].
pub struct Runner<D: Driver> {
    driver: D,
    settings: EngineSettings,
    artifacts: Box<dyn ArtifactStore>,
    sink: Arc<dyn EventSink>,
}

impl<D: Driver> Runner<D> {
    /// A runner that stores artifacts under `settings.artifacts.dir` and logs events.
    pub fn new(driver: D, settings: EngineSettings) -> Self {
        let artifacts = Box::new(FsArtifactStore::new(settings.artifacts.dir.clone()));
        Self {
            driver,
            settings,
            artifacts,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_artifacts(mut self, store: impl ArtifactStore + 'static) -> Self {
        self.artifacts = Box::new(store);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Run `steps` in order.
    ///
    /// A failed navigate step ends the run with the results produced so far. A
    /// fatal driver error marks the current and every remaining step failed
    /// without further driver calls.
    pub async fn run(&self, steps: &[Step]) -> RunReport {
        let start = Instant::now();
        let mut results = Vec::with_capacity(steps.len());
        let mut aborted = false;
        let mut fatal_error: Option<String> = None;

        info!("Running {} step(s)", steps.len());

        for step in steps {
            if let Some(ref shared) = fatal_error {
                let mut result = ExecutionResult::failed(&Error::Driver(shared.clone()));
                stamp(&mut result, step, 0);
                results.push(result);
                continue;
            }

            let (result, error) = self.execute(step).await;

            if let Some(e) = error.filter(Error::is_fatal) {
                self.sink.emit(EngineEvent::RunAborted {
                    step: step.step_number,
                    reason: e.to_string(),
                });
                fatal_error = Some(format!("browser session lost at step {}: {}", step.step_number, e));
            }

            let navigate_failed = step.action == Action::Navigate && !result.is_success();
            results.push(result);

            if navigate_failed && fatal_error.is_none() {
                self.sink.emit(EngineEvent::RunAborted {
                    step: step.step_number,
                    reason: "navigation failed".into(),
                });
                aborted = true;
                break;
            }
        }

        RunReport {
            results,
            aborted,
            fatal_error,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Run one step and report its outcome. Never returns an error: failures are
    /// recorded in the result.
    pub async fn execute_step(&self, step: &Step) -> ExecutionResult {
        self.execute(step).await.0
    }

    async fn execute(&self, step: &Step) -> (ExecutionResult, Option<Error>) {
        let start = Instant::now();
        let shown = step.value.as_deref().map(|v| {
            if is_sensitive(&step.target) {
                mask(v)
            } else {
                v.to_string()
            }
        });
        self.sink.emit(EngineEvent::StepStarted {
            step: step.step_number,
            action: step.action.name().to_string(),
            target: step.target.clone(),
            value: shown,
        });

        let (mut result, error) = match self.attempt(step).await {
            Ok(result) => (result, None),
            Err(e) => (self.fail(step, &e).await, Some(e)),
        };

        stamp(&mut result, step, start.elapsed().as_millis() as u64);
        self.sink.emit(EngineEvent::StepFinished {
            step: step.step_number,
            status: result.status.to_string(),
            message: result.message.clone(),
            duration_ms: result.duration_ms,
        });
        (result, error)
    }

    async fn attempt(&self, step: &Step) -> Result<ExecutionResult> {
        let result = match &step.action {
            Action::Navigate => self.navigate(step).await?,
            Action::Click => self.click(step).await?,
            Action::Fill => self.fill(step).await?,
            Action::Wait => self.wait_step(step).await?,
            Action::Verify => self.verify(step).await?,
            Action::Screenshot => return self.screenshot(step).await,
            Action::Unknown(name) => return Err(Error::UnknownAction(name.clone())),
        };

        if step.screenshot && result.is_success() {
            let reference = self.capture(step.step_number, "success").await;
            return Ok(result.with_artifact(reference));
        }
        Ok(result)
    }

    /// Failed result for `error`, with a diagnostic capture when the page is still usable.
    async fn fail(&self, step: &Step, error: &Error) -> ExecutionResult {
        let mut result = ExecutionResult::failed(error);
        if matches!(error, Error::LocationMismatch(_)) {
            result = result.with_location(false);
        }
        if !error.is_input_error() && !error.is_fatal() {
            let reference = self
                .capture(step.step_number, &artifacts::error_label())
                .await;
            result = result.with_artifact(reference);
        }
        result
    }

    /// Screenshot the page and store it. Failures are reported as events only.
    async fn capture(&self, step: u32, label: &str) -> Option<String> {
        match self.driver.screenshot().await {
            Ok(png) => self.store(step, label, &png),
            Err(e) => {
                self.sink.emit(EngineEvent::ArtifactFailed {
                    step,
                    label: label.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn store(&self, step: u32, label: &str, png: &[u8]) -> Option<String> {
        match self.artifacts.store(step, label, png) {
            Ok(reference) => {
                self.sink.emit(EngineEvent::ArtifactCaptured {
                    step,
                    label: label.to_string(),
                    reference: reference.clone(),
                });
                Some(reference)
            }
            Err(e) => {
                self.sink.emit(EngineEvent::ArtifactFailed {
                    step,
                    label: label.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

fn stamp(result: &mut ExecutionResult, step: &Step, duration_ms: u64) {
    result.step_number = step.step_number;
    result.action = step.action.name().to_string();
    result.target = step.target.clone();
    result.duration_ms = duration_ms;
}

/// Launch a browser for `plan`, run it to completion and close the browser.
///
/// For callers without an async runtime; drives everything on a current-thread
/// Tokio runtime.
pub fn run_blocking(plan: &Plan) -> Result<RunReport> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let driver = EokaDriver::launch(&plan.browser).await?;
        let runner = Runner::new(driver, plan.settings());
        let report = runner.run(&plan.steps).await;
        if let Err(e) = runner.into_driver().close().await {
            debug!("Browser close failed: {}", e);
        }
        Ok(report)
    })
}
