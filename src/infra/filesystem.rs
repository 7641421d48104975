//! Filesystem operations
//!
//! Handles file and directory operations, plus the staging lock that gives a
//! packaging run exclusive use of a package folder.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::defaults::STAGING_LOCK_FILE;
use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Read content from a file
pub fn read_file(path: &Path) -> Result<String, FilesystemError> {
    std::fs::read_to_string(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Copy a file, creating the destination's parent directories
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| FilesystemError::CopyFile {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error: e.to_string(),
        })
}

/// Exclusive claim on a package folder, released on drop
#[derive(Debug)]
pub struct StagingLock {
    path: PathBuf,
}

impl StagingLock {
    /// Claim `dir`; `Ok(None)` if another run already holds it
    pub fn try_acquire(dir: &Path) -> Result<Option<Self>, FilesystemError> {
        create_dir_all(dir)?;
        let path = dir.join(STAGING_LOCK_FILE);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                // Best effort: the pid only helps whoever inspects a stale lock.
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Some(Self { path }))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(FilesystemError::WriteFile {
                path,
                error: e.to_string(),
            }),
        }
    }
}

impl Drop for StagingLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Failed to release {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("a.txt");
        std::fs::write(&from, "hello").unwrap();
        let to = dir.path().join("x/y/z/a.txt");

        copy_file(&from, &to).unwrap();
        assert_eq!(std::fs::read_to_string(to).unwrap(), "hello");
    }

    #[test]
    fn test_copy_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = copy_file(&dir.path().join("nope"), &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, FilesystemError::CopyFile { .. }));
    }

    #[test]
    fn test_staging_lock_is_exclusive_and_released() {
        let dir = TempDir::new().unwrap();
        let first = StagingLock::try_acquire(dir.path()).unwrap();
        assert!(first.is_some());
        assert!(StagingLock::try_acquire(dir.path()).unwrap().is_none());

        drop(first);
        assert!(!dir.path().join(STAGING_LOCK_FILE).exists());
        assert!(StagingLock::try_acquire(dir.path()).unwrap().is_some());
    }

    #[test]
    fn test_remove_missing_dir_is_ok() {
        let dir = TempDir::new().unwrap();
        assert!(remove_dir_all(&dir.path().join("absent")).is_ok());
    }
}
