//! Resolved configuration
//!
//! The immutable snapshot (options, requirements, targets, toolchains, layout)
//! produced once per build invocation. The build driver and the packager only
//! ever read it, so concurrent target builds observe the same view.

use semver::Version;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::layout::{plan_layout, PackageLayout};
use crate::core::manifest::WorkspaceManifest;
use crate::core::options::{resolve_options, OptionOverrides, OptionSchema, ResolvedOptions};
use crate::core::pipeline::PipelineStage;
use crate::core::platform::Platform;
use crate::core::resolver::{
    parse_requirement_override, resolve_requirements, Requirement, RequirementSchema,
};
use crate::core::target::{Target, Toolchain};
use crate::error::{ResolverError, WorkspaceError};

/// Declared option and requirement schemas
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceSchema {
    pub options: OptionSchema,
    pub requirements: RequirementSchema,
}

impl WorkspaceSchema {
    /// The workspace's declared schema
    pub fn workspace() -> Self {
        Self {
            options: OptionSchema::workspace(),
            requirements: RequirementSchema::workspace(),
        }
    }
}

impl Default for WorkspaceSchema {
    fn default() -> Self {
        Self::workspace()
    }
}

/// Inputs of one resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveRequest {
    pub workspace_root: PathBuf,
    pub platform: Platform,
    pub overrides: OptionOverrides,
    pub version_overrides: BTreeMap<String, Version>,
    pub toolchain_files: BTreeMap<Target, PathBuf>,
}

impl ResolveRequest {
    /// Request with no overrides
    pub fn new(workspace_root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            platform,
            overrides: OptionOverrides::default(),
            version_overrides: BTreeMap::new(),
            toolchain_files: BTreeMap::new(),
        }
    }

    /// Replace the option overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: OptionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Force a requirement version
    #[must_use]
    pub fn with_version(mut self, name: &str, version: Version) -> Self {
        self.version_overrides.insert(name.to_string(), version);
        self
    }

    /// Layer the manifest under the CLI values
    ///
    /// `cli_versions` are `name/version` strings and win over `[versions]`.
    pub fn from_manifest(
        workspace_root: &Path,
        platform: Platform,
        manifest: &WorkspaceManifest,
        cli_options: BTreeMap<String, toml::Value>,
        cli_versions: &[String],
    ) -> Result<Self, WorkspaceError> {
        let mut version_overrides = BTreeMap::new();
        for (name, raw) in &manifest.versions {
            let version = Version::parse(raw).map_err(|e| ResolverError::InvalidVersion {
                name: name.clone(),
                version: raw.clone(),
                reason: e.to_string(),
            })?;
            version_overrides.insert(name.clone(), version);
        }
        for raw in cli_versions {
            let (name, version) = parse_requirement_override(raw)?;
            version_overrides.insert(name, version);
        }

        let toolchain_files = manifest
            .toolchains
            .by_target()
            .into_iter()
            .map(|(target, file)| (target, workspace_root.join(file)))
            .collect();

        Ok(Self {
            workspace_root: workspace_root.to_path_buf(),
            platform,
            overrides: OptionOverrides {
                cli: cli_options,
                manifest: manifest.options.clone(),
            },
            version_overrides,
            toolchain_files,
        })
    }
}

/// Immutable snapshot consumed by the build driver and the packager
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfiguration {
    platform: Platform,
    options: ResolvedOptions,
    requirements: Vec<Requirement>,
    targets: Vec<Target>,
    toolchains: BTreeMap<Target, Toolchain>,
    layout: PackageLayout,
}

impl ResolvedConfiguration {
    /// Resolve options, requirements, targets and layout
    pub fn resolve(
        schema: &WorkspaceSchema,
        request: &ResolveRequest,
    ) -> Result<Self, WorkspaceError> {
        Self::resolve_observed(schema, request, |_| {})
    }

    /// Same as [`Self::resolve`], reporting each completed stage
    pub fn resolve_observed(
        schema: &WorkspaceSchema,
        request: &ResolveRequest,
        mut on_stage: impl FnMut(PipelineStage),
    ) -> Result<Self, WorkspaceError> {
        let options = resolve_options(&schema.options, &request.platform, &request.overrides)?;
        on_stage(PipelineStage::OptionsResolved);

        let requirements =
            resolve_requirements(&schema.requirements, &options, &request.version_overrides)?;
        on_stage(PipelineStage::RequirementsResolved);

        let targets: Vec<Target> = Target::ALL
            .into_iter()
            .filter(|t| options.is_enabled(t.toggle_option()))
            .collect();

        let toolchains = targets
            .iter()
            .map(|t| {
                let mut toolchain = Toolchain::for_target(*t, &request.workspace_root);
                if let Some(file) = request.toolchain_files.get(t) {
                    toolchain = toolchain.with_file(file.clone());
                }
                (*t, toolchain)
            })
            .collect();

        let layout = plan_layout(&request.workspace_root, &targets);
        on_stage(PipelineStage::LayoutPlanned);

        Ok(Self {
            platform: request.platform.clone(),
            options,
            requirements,
            targets,
            toolchains,
            layout,
        })
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// Requirements in declaration order
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Requirements consumed by `target`, in declaration order
    pub fn requirements_for(&self, target: Target) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter().filter(move |r| r.applies_to(target))
    }

    /// Selected targets
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn is_selected(&self, target: Target) -> bool {
        self.targets.contains(&target)
    }

    /// Toolchain of a selected target
    pub fn toolchain(&self, target: Target) -> Option<&Toolchain> {
        self.toolchains.get(&target)
    }

    pub fn layout(&self) -> &PackageLayout {
        &self.layout
    }

    /// SHA-256 over a canonical rendering of the snapshot
    ///
    /// Identical inputs always produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("platform={}\n", self.platform));
        for (name, opt) in self.options.iter() {
            hasher.update(format!("option:{name}={}\n", opt.value));
        }
        for (name, _) in self.options.removed() {
            hasher.update(format!("removed:{name}\n"));
        }
        for req in &self.requirements {
            hasher.update(format!("requires:{req}\n"));
        }
        for (target, toolchain) in &self.toolchains {
            hasher.update(format!(
                "target:{target}={}@{}\n",
                toolchain.identity,
                toolchain.file.display()
            ));
        }
        for (target, folder) in &self.layout.build_folders {
            hasher.update(format!("build:{target}={}\n", folder.display()));
        }
        hasher.update(format!("package={}\n", self.layout.package_folder.display()));
        hex::encode(hasher.finalize())
    }
}
