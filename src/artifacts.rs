//! Where screenshots end up.

use crate::Result;
use std::path::{Path, PathBuf};

/// Persists image captures and returns a reference to each one.
pub trait ArtifactStore {
    /// Store `png` for `step` under `label`; returns where it went.
    fn store(&self, step: u32, label: &str, png: &[u8]) -> Result<String>;
}

/// Writes `step_<n>_<label>.png` files into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactStore for FsArtifactStore {
    fn store(&self, step: u32, label: &str, png: &[u8]) -> Result<String> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("step_{}_{}.png", step, label));
        std::fs::write(&path, png)?;
        Ok(path.display().to_string())
    }
}

/// Label for a capture taken when a step fails.
pub fn error_label() -> String {
    format!("error_{}", timestamp())
}

/// Label for a capture taken when verify only finds page text.
pub fn partial_label() -> String {
    format!("partial_{}", timestamp())
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
