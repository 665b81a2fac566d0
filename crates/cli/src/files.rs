//! Resource configuration and state files

use std::path::{Path, PathBuf};

use alinas_provider::state::{from_json, to_json};
use alinas_provider::DynamicValue;
use anyhow::{bail, Context, Result};

/// Read a JSON resource configuration
pub fn read_config(path: &Path) -> Result<DynamicValue> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration {}", path.display()))?;
    let config = from_json(&content)
        .with_context(|| format!("parsing configuration {}", path.display()))?;
    if config.as_map().is_none() {
        bail!("{} must contain a JSON object", path.display());
    }
    Ok(config)
}

/// JSON file holding the last known state of one resource
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored state, or null when nothing has been applied yet
    pub fn load(&self) -> Result<DynamicValue> {
        if !self.path.exists() {
            return Ok(DynamicValue::Null);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading state {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(DynamicValue::Null);
        }
        from_json(&content).with_context(|| format!("parsing state {}", self.path.display()))
    }

    /// Write `state`, removing the file when it is null
    pub fn store(&self, state: &DynamicValue) -> Result<()> {
        if state.is_null() {
            return self.remove();
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, to_json(state)? + "\n")
            .with_context(|| format!("writing state {}", self.path.display()))
    }

    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("removing state {}", self.path.display()))?;
        }
        Ok(())
    }
}
