//! Error types for imx93-build
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::target::Target;

/// Option resolution and lookup errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionError {
    /// Override value lies outside the declared domain
    #[error("Option '{name}' has invalid value '{value}': expected {expected}")]
    InvalidValue {
        name: String,
        value: String,
        expected: String,
    },

    /// Override names an option the schema does not declare
    #[error("Unknown option '{name}'")]
    UnknownOption { name: String },

    /// Option was removed during resolution
    #[error("Option '{name}' is not applicable: {reason}")]
    NotApplicable { name: String, reason: String },

    /// Boolean lookup on a non-boolean option
    #[error("Option '{name}' is not a boolean option")]
    NotBoolean { name: String },

    /// Malformed `name=value` override
    #[error("Malformed option override '{raw}': expected name=value")]
    MalformedOverride { raw: String },
}

/// Requirement resolution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolverError {
    /// Two requirement sources pin incompatible versions
    #[error(
        "Version conflict for '{package}': {selected_by} selects {selected}, \
         but {required_by} requires '{constraint}'"
    )]
    VersionConflict {
        package: String,
        selected: String,
        selected_by: String,
        constraint: String,
        required_by: String,
    },

    /// A pin source was moved to a version with no known compatibility rule
    #[error(
        "No compatibility rule for {source_name}/{version}: cannot determine the '{pinned}' version it requires"
    )]
    UnknownCompatibility {
        source_name: String,
        version: String,
        pinned: String,
    },

    /// Version override names an undeclared requirement
    #[error("Unknown requirement '{name}'")]
    UnknownRequirement { name: String },

    /// Version string could not be parsed
    #[error("Invalid version '{version}' for '{name}': {reason}")]
    InvalidVersion {
        name: String,
        version: String,
        reason: String,
    },
}

/// Dependency provider errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Provider cannot supply the requirement for this platform/toolchain
    #[error("Dependency '{name}/{version}' not found for toolchain '{toolchain}' (searched {searched})")]
    DependencyNotFound {
        name: String,
        version: String,
        toolchain: String,
        searched: PathBuf,
    },
}

/// Per-target build errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Target is disabled by the resolved options
    #[error("Target '{target}' is not selected")]
    NotSelected { target: Target },

    /// A requirement could not be located
    #[error("Target '{target}': {source}")]
    Dependency {
        target: Target,
        #[source]
        source: ProviderError,
    },

    /// Configure step exited unsuccessfully
    #[error("Configure failed for target '{target}':\n{diagnostics}")]
    Configure { target: Target, diagnostics: String },

    /// Build step exited unsuccessfully
    #[error("Build failed for target '{target}':\n{diagnostics}")]
    Build { target: Target, diagnostics: String },

    /// Cancellation signal raised while the target was building
    #[error("Build cancelled for target '{target}'")]
    Cancelled { target: Target },

    /// Native tool could not be spawned
    #[error("Target '{target}': native build tool unavailable: {error}")]
    ToolUnavailable { target: Target, error: String },

    /// Filesystem error while preparing the build folder
    #[error("Target '{target}': {error}")]
    Io { target: Target, error: String },
}

impl BuildError {
    /// Target this error belongs to
    pub fn target(&self) -> Target {
        match self {
            Self::NotSelected { target }
            | Self::Dependency { target, .. }
            | Self::Configure { target, .. }
            | Self::Build { target, .. }
            | Self::Cancelled { target }
            | Self::ToolUnavailable { target, .. }
            | Self::Io { target, .. } => *target,
        }
    }
}

/// Packaging errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PackagingError {
    /// Another packaging run holds the staging lock
    #[error("Package folder '{path}' is locked by another packaging run")]
    Busy { path: PathBuf },

    /// No license file found in strict mode
    #[error("No license file found in '{path}'")]
    MissingLicense { path: PathBuf },

    /// Install step failed
    #[error("Install failed for target '{target}':\n{diagnostics}")]
    Install { target: Target, diagnostics: String },

    /// Cancellation signal raised during install
    #[error("Packaging cancelled")]
    Cancelled,

    /// Metadata could not be written
    #[error("Failed to write package metadata: {error}")]
    Metadata { error: String },

    /// Filesystem error
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Filesystem errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to copy file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to walk a directory tree
    #[error("Failed to walk '{path}': {error}")]
    Walk { path: PathBuf, error: String },
}

/// Workspace manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest could not be read
    #[error(transparent)]
    Read(#[from] FilesystemError),

    /// Manifest could not be parsed
    #[error("Failed to parse manifest '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level imx93-build error type
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// Option error
    #[error("Option error: {0}")]
    Option(#[from] OptionError),

    /// Resolver error
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),
}
