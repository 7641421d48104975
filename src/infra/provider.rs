//! Dependency provider
//!
//! Locates the headers and libraries of a resolved requirement for a given
//! platform/toolchain pair.

use semver::Version;
use serde::Serialize;
use std::path::PathBuf;

use crate::core::platform::Platform;
use crate::core::resolver::Requirement;
use crate::core::target::Toolchain;
use crate::error::ProviderError;

/// A requirement located on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedDependency {
    pub name: String,
    pub version: Version,
    /// Install prefix handed to the native build tool
    pub prefix: PathBuf,
    pub include_dir: PathBuf,
    pub lib_dir: PathBuf,
}

/// Dependency provider collaborator
pub trait DependencyProvider: Send + Sync {
    /// Locate `requirement` for `toolchain` on `platform`
    fn locate(
        &self,
        requirement: &Requirement,
        platform: &Platform,
        toolchain: &Toolchain,
    ) -> Result<LocatedDependency, ProviderError>;
}

/// Looks up prebuilt dependencies under `<root>/<name>/<version>/<toolchain identity>/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixProvider {
    root: PathBuf,
}

impl PrefixProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Prefix a requirement is expected at
    pub fn prefix_for(&self, requirement: &Requirement, toolchain: &Toolchain) -> PathBuf {
        self.root
            .join(&requirement.name)
            .join(requirement.version.to_string())
            .join(&toolchain.identity)
    }
}

impl DependencyProvider for PrefixProvider {
    fn locate(
        &self,
        requirement: &Requirement,
        platform: &Platform,
        toolchain: &Toolchain,
    ) -> Result<LocatedDependency, ProviderError> {
        let prefix = self.prefix_for(requirement, toolchain);
        if !prefix.is_dir() {
            return Err(ProviderError::DependencyNotFound {
                name: requirement.name.clone(),
                version: requirement.version.to_string(),
                toolchain: toolchain.identity.clone(),
                searched: prefix,
            });
        }

        tracing::debug!(
            "Located {} for {} ({}) at {}",
            requirement,
            toolchain.identity,
            platform,
            prefix.display()
        );
        Ok(LocatedDependency {
            name: requirement.name.clone(),
            version: requirement.version.clone(),
            include_dir: prefix.join("include"),
            lib_dir: prefix.join("lib"),
            prefix,
        })
    }
}
