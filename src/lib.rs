//! # repro-runner
//!
//! Executes a bug-reproduction plan in a real browser. Each step describes its
//! target in free text; the engine turns that into ranked locators, tries them in
//! order, waits for the UI to settle, and reports one result per step.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use repro_runner::{EokaDriver, Plan, Runner};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> repro_runner::Result<()> {
//! let plan = Plan::load("plans/completed-tab.yaml")?;
//! let driver = EokaDriver::launch(&plan.browser).await?;
//! let runner = Runner::new(driver, plan.settings());
//! let report = runner.run(&plan.steps).await;
//! println!("{} of {} steps passed", report.succeeded(), report.results.len());
//! runner.into_driver().close().await?;
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
mod config;
pub mod driver;
pub mod locator;
mod runner;
pub mod trace;

pub use artifacts::{ArtifactStore, FsArtifactStore};
pub use config::{
    Action, ArtifactConfig, BrowserConfig, ContainerHeuristics, EngineSettings, ParamDef, Params,
    Plan, Stabilization, StabilizationTable, Step, TimingConfig, Viewport,
};
pub use driver::{Driver, ElementHandle, EokaDriver, WaitState};
pub use locator::{ExecutionContext, Locator};
pub use runner::{
    run_blocking, ClickKind, ExecutionResult, Resolved, RunReport, Runner, StepStatus,
};
pub use trace::{EngineEvent, EventSink, MemorySink, TracingSink};

/// Result type for repro-runner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a plan or executing a step.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    /// The browser session is gone.
    #[error("driver error: {0}")]
    Driver(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("locator not found: {0}")]
    LocatorNotFound(String),

    #[error("value mismatch: {0}")]
    ValueMismatch(String),

    #[error("no candidate matched '{target}' after {tried} attempt(s); last error: {last_error}")]
    AllCandidatesExhausted {
        target: String,
        tried: usize,
        last_error: String,
    },

    #[error("{0}")]
    LocationMismatch(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

impl Error {
    /// The session is unusable; no further driver calls should be made.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Browser(_) | Error::Driver(_))
    }

    /// The step itself is malformed. Such steps fail before touching the driver.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::UnknownAction(_))
    }
}
