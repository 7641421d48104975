//! Packaging
//!
//! Stages licenses, headers and installed binaries into the shared package
//! folder and writes the link metadata downstream consumers read.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::config::defaults::{
    BIN_SUBDIR, FMT_DEFINE, HEADER_EXTENSIONS, INCLUDE_SUBDIR, LIB_SUBDIR, LICENSE_FILES,
    METADATA_FILE, WORKSPACE_NAME, WORKSPACE_VERSION,
};
use crate::core::builder::BuildResult;
use crate::core::configuration::ResolvedConfiguration;
use crate::core::target::Target;
use crate::error::{FilesystemError, PackagingError};
use crate::infra::filesystem::{self, StagingLock};
use crate::infra::native_tool::NativeBuildTool;
use crate::infra::process::ProcessError;

/// Consumer-facing link metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    /// Libraries to link; empty unless shared libraries are produced
    pub libs: Vec<String>,
    pub system_libs: Vec<String>,
    pub defines: Vec<String>,
    pub include_dirs: Vec<String>,
    pub bin_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub targets: Vec<Target>,
}

/// Derive package metadata from the resolved configuration alone
pub fn package_metadata(config: &ResolvedConfiguration) -> PackageMetadata {
    let options = config.options();
    let libs = if options.is_enabled("shared") && config.is_selected(Target::ApplicationCore) {
        vec![WORKSPACE_NAME.to_string()]
    } else {
        Vec::new()
    };
    let defines = if config.requirements().iter().any(|r| r.name == "fmt") {
        vec![FMT_DEFINE.to_string()]
    } else {
        Vec::new()
    };

    PackageMetadata {
        name: WORKSPACE_NAME.to_string(),
        version: WORKSPACE_VERSION.to_string(),
        libs,
        system_libs: config.platform().system_libs(),
        defines,
        include_dirs: vec![INCLUDE_SUBDIR.to_string()],
        bin_dirs: vec![BIN_SUBDIR.to_string()],
        lib_dirs: vec![LIB_SUBDIR.to_string()],
        targets: config.targets().to_vec(),
    }
}

impl PackageMetadata {
    /// Restrict to the targets that were actually installed
    #[must_use]
    pub fn narrowed_to(mut self, installed: &[Target]) -> Self {
        if !installed.contains(&Target::ApplicationCore) {
            self.libs.clear();
        }
        self.targets.retain(|t| installed.contains(t));
        self
    }
}

/// What a packaging run staged
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstalledPackage {
    pub folder: PathBuf,
    /// Staged license files
    pub licenses: Vec<PathBuf>,
    /// Staged headers, relative to `include/`
    pub headers: Vec<PathBuf>,
    /// Targets whose install step ran
    pub installed: Vec<Target>,
    pub metadata: PackageMetadata,
    pub metadata_file: PathBuf,
}

/// Stages build results into the package folder
#[derive(Debug)]
pub struct Packager<T> {
    tool: Arc<T>,
    strict_license: bool,
}

impl<T: NativeBuildTool> Packager<T> {
    pub fn new(tool: Arc<T>) -> Self {
        Self {
            tool,
            strict_license: false,
        }
    }

    /// Fail when the source root carries no license file
    #[must_use]
    pub fn strict_license(mut self, strict: bool) -> Self {
        self.strict_license = strict;
        self
    }

    /// Stage licenses, headers and binaries of `results`
    ///
    /// Holds the package folder's staging lock for the whole run; a second
    /// concurrent run fails with [`PackagingError::Busy`].
    pub async fn package(
        &self,
        config: &ResolvedConfiguration,
        results: &[BuildResult],
        cancel: &CancellationToken,
    ) -> Result<InstalledPackage, PackagingError> {
        let layout = config.layout();
        let Some(_lock) = StagingLock::try_acquire(&layout.package_folder)? else {
            return Err(PackagingError::Busy {
                path: layout.package_folder.clone(),
            });
        };

        let licenses = self.stage_licenses(&layout.source_folder, &layout.licenses_dir)?;

        let mut headers = Vec::new();
        for result in results {
            headers.extend(stage_headers(
                &layout.source_folder,
                &result.source_dir,
                &layout.include_dir,
            )?);
        }

        let mut installed = Vec::new();
        for result in results {
            if cancel.is_cancelled() {
                return Err(PackagingError::Cancelled);
            }
            tracing::info!("Installing {}", result.target);
            let output = self
                .tool
                .install(&result.build_dir, &layout.package_folder, cancel)
                .await
                .map_err(|e| match e {
                    ProcessError::Cancelled { .. } => PackagingError::Cancelled,
                    ProcessError::Spawn { error, .. } => PackagingError::Install {
                        target: result.target,
                        diagnostics: error,
                    },
                })?;
            if !output.success {
                return Err(PackagingError::Install {
                    target: result.target,
                    diagnostics: output.diagnostics,
                });
            }
            installed.push(result.target);
        }

        let metadata = package_metadata(config).narrowed_to(&installed);
        let metadata_file = layout.package_folder.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(&metadata).map_err(|e| PackagingError::Metadata {
            error: e.to_string(),
        })?;
        filesystem::write_file(&metadata_file, &json)?;

        tracing::info!(
            "Packaged {} license(s), {} header(s), {} target(s) into {}",
            licenses.len(),
            headers.len(),
            installed.len(),
            layout.package_folder.display()
        );

        Ok(InstalledPackage {
            folder: layout.package_folder.clone(),
            licenses,
            headers,
            installed,
            metadata,
            metadata_file,
        })
    }

    fn stage_licenses(
        &self,
        source_root: &Path,
        licenses_dir: &Path,
    ) -> Result<Vec<PathBuf>, PackagingError> {
        let mut staged = Vec::new();
        for name in LICENSE_FILES {
            let from = source_root.join(name);
            if from.is_file() {
                let to = licenses_dir.join(name);
                filesystem::copy_file(&from, &to)?;
                staged.push(to);
            }
        }

        if staged.is_empty() {
            if self.strict_license {
                return Err(PackagingError::MissingLicense {
                    path: source_root.to_path_buf(),
                });
            }
            tracing::debug!("No license file in {}", source_root.display());
        }
        Ok(staged)
    }
}

fn is_header(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| HEADER_EXTENSIONS.contains(&ext))
}

/// Copy headers under `subtree` into `include_dir`, keeping their path
/// relative to `source_root`
fn stage_headers(
    source_root: &Path,
    subtree: &Path,
    include_dir: &Path,
) -> Result<Vec<PathBuf>, FilesystemError> {
    if !subtree.is_dir() {
        return Ok(Vec::new());
    }

    let mut staged = Vec::new();
    for entry in WalkDir::new(subtree).sort_by_file_name() {
        let entry = entry.map_err(|e| FilesystemError::Walk {
            path: subtree.to_path_buf(),
            error: e.to_string(),
        })?;
        if !entry.file_type().is_file() || !is_header(entry.path()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(source_root) else {
            continue;
        };
        filesystem::copy_file(entry.path(), &include_dir.join(relative))?;
        staged.push(relative.to_path_buf());
    }
    Ok(staged)
}
