//! CLI implementation for `imx93-build clean`

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::output::{print_json, status, OutputConfig};
use crate::core::clean::{clean_workspace, has_build_artifacts};

/// Execute the clean command
pub fn execute(workspace: &Path, output: OutputConfig) -> Result<()> {
    if !has_build_artifacts(workspace) && !output.json {
        output.line(format!("{} Nothing to clean", status::SUCCESS));
        return Ok(());
    }

    let result = clean_workspace(workspace).context("Failed to clean build artifacts")?;

    if output.json {
        return print_json(&serde_json::json!({
            "removed": result.removed,
            "skipped": result.skipped,
        }));
    }

    if result.removed.is_empty() {
        output.line(format!("{} Nothing to clean", status::SUCCESS));
    } else {
        output.line(format!("{} Cleaned build artifacts:", status::SUCCESS));
        for dir in &result.removed {
            output.line(format!("  Removed {dir}/"));
        }
    }
    Ok(())
}
