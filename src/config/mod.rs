pub mod actions;
pub mod params;
pub mod schema;

pub use actions::{Action, Step};
pub use params::{ParamDef, Params};
pub use schema::{
    ArtifactConfig, BrowserConfig, ContainerHeuristics, EngineSettings, Plan, Stabilization,
    StabilizationTable, TimingConfig, Viewport,
};
