//! Clean logic
//!
//! Removes the build root and the staged package folder.

use std::path::Path;

use crate::config::defaults::{BUILD_ROOT, PACKAGE_DIR};
use crate::error::FilesystemError;
use crate::infra::filesystem;

/// Directories removed by clean
pub const CLEAN_DIRECTORIES: &[&str] = &[BUILD_ROOT, PACKAGE_DIR];

/// Result of clean operation
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanResult {
    /// Directories that were removed
    pub removed: Vec<String>,
    /// Directories that didn't exist
    pub skipped: Vec<String>,
}

/// Remove `build/` and `package/` under `workspace_root`
pub fn clean_workspace(workspace_root: &Path) -> Result<CleanResult, FilesystemError> {
    let mut result = CleanResult::default();

    for dir_name in CLEAN_DIRECTORIES {
        let dir_path = workspace_root.join(dir_name);
        if dir_path.exists() {
            filesystem::remove_dir_all(&dir_path)?;
            tracing::debug!("Removed {}", dir_path.display());
            result.removed.push((*dir_name).to_string());
        } else {
            result.skipped.push((*dir_name).to_string());
        }
    }

    Ok(result)
}

/// Whether anything is left to clean
pub fn has_build_artifacts(workspace_root: &Path) -> bool {
    CLEAN_DIRECTORIES
        .iter()
        .any(|dir| workspace_root.join(dir).exists())
}
