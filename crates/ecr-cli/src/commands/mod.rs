pub mod actions;
pub mod evaluate;
pub mod state;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ecr_core::LaunchContext;

/// Reads and validates a launch context JSON file.
pub fn read_launch(path: &Path) -> Result<LaunchContext> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read launch context: {}", path.display()))?;
    let launch: LaunchContext = serde_json::from_str(&content)
        .with_context(|| format!("Invalid launch context: {}", path.display()))?;
    launch.validate()?;
    Ok(launch)
}
