//! Workspace manifest (workspace.toml) parsing
//!
//! The manifest is optional; a missing file means every value comes from the
//! declared defaults. Option values here rank below CLI overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::defaults::{DEPENDENCY_ROOT, MANIFEST_FILE};
use crate::core::target::Target;
use crate::error::ManifestError;
use crate::infra::filesystem;

/// The workspace manifest (workspace.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceManifest {
    /// Option overrides
    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,

    /// Requirement version overrides (`fmt = "10.2.1"`)
    #[serde(default)]
    pub versions: BTreeMap<String, String>,

    /// Toolchain file overrides per target
    #[serde(default)]
    pub toolchains: ToolchainFiles,

    /// Dependency provider configuration
    #[serde(default)]
    pub dependencies: DependencyConfig,

    /// Packaging configuration
    #[serde(default)]
    pub package: PackageConfig,
}

/// Toolchain file overrides (`[toolchains]`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ToolchainFiles {
    #[serde(default)]
    pub a55: Option<PathBuf>,
    #[serde(default)]
    pub m33: Option<PathBuf>,
}

impl ToolchainFiles {
    /// Overridden files keyed by target
    pub fn by_target(&self) -> BTreeMap<Target, PathBuf> {
        [
            (Target::ApplicationCore, &self.a55),
            (Target::McuCore, &self.m33),
        ]
        .into_iter()
        .filter_map(|(target, file)| file.clone().map(|f| (target, f)))
        .collect()
    }
}

/// Dependency provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyConfig {
    /// Prefix root searched by the dependency provider
    #[serde(default = "default_dependency_root")]
    pub root: PathBuf,
}

fn default_dependency_root() -> PathBuf {
    PathBuf::from(DEPENDENCY_ROOT)
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            root: default_dependency_root(),
        }
    }
}

/// Packaging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageConfig {
    /// Fail packaging when no license file exists
    #[serde(default)]
    pub strict_license: bool,

    /// Package successful targets even if another target failed
    #[serde(default)]
    pub partial: bool,
}

impl WorkspaceManifest {
    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `workspace.toml` from `workspace_root`, or defaults if absent
    pub fn load(workspace_root: &Path) -> Result<Self, ManifestError> {
        let path = workspace_root.join(MANIFEST_FILE);
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", MANIFEST_FILE);
            return Ok(Self::default());
        }

        let content = filesystem::read_file(&path)?;
        Self::from_toml(&content).map_err(|source| ManifestError::Parse { path, source })
    }

    /// Dependency root resolved against the workspace root
    pub fn dependency_root(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.dependencies.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = WorkspaceManifest::from_toml(
            r#"
[options]
with_fmt = false
build_type = "Debug"

[versions]
spdlog = "1.14.1"

[toolchains]
m33 = "/opt/toolchains/m33.cmake"

[dependencies]
root = "third_party"

[package]
strict_license = true
partial = true
"#,
        )
        .unwrap();

        assert_eq!(
            manifest.options.get("with_fmt"),
            Some(&toml::Value::Boolean(false))
        );
        assert_eq!(manifest.versions.get("spdlog").unwrap(), "1.14.1");
        assert_eq!(
            manifest.toolchains.m33,
            Some(PathBuf::from("/opt/toolchains/m33.cmake"))
        );
        assert_eq!(
            manifest.toolchains.by_target(),
            BTreeMap::from([(Target::McuCore, PathBuf::from("/opt/toolchains/m33.cmake"))])
        );
        assert_eq!(manifest.dependencies.root, PathBuf::from("third_party"));
        assert!(manifest.package.strict_license);
        assert!(manifest.package.partial);
    }

    #[test]
    fn test_empty_manifest_uses_defaults() {
        let manifest = WorkspaceManifest::from_toml("").unwrap();
        assert_eq!(manifest, WorkspaceManifest::default());
        assert_eq!(manifest.dependencies.root, PathBuf::from("deps"));
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(WorkspaceManifest::from_toml("[boards]\nname = \"x\"\n").is_err());
    }

    #[test]
    fn test_unknown_toolchain_target_rejected() {
        let err = WorkspaceManifest::from_toml("[toolchains]\na53 = \"a53.cmake\"\n").unwrap_err();
        assert!(err.to_string().contains("a53"), "{err}");
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let manifest = WorkspaceManifest::load(dir.path()).unwrap();
        assert_eq!(manifest, WorkspaceManifest::default());
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("workspace.toml"), "[options\n").unwrap();
        let err = WorkspaceManifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
        assert!(err.to_string().contains("workspace.toml"));
    }
}
