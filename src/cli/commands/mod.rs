//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod clean;
pub mod metadata;
pub mod resolve;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cli::output::OutputConfig;
use crate::core::configuration::{ResolveRequest, ResolvedConfiguration, WorkspaceSchema};
use crate::core::manifest::WorkspaceManifest;
use crate::core::options::parse_override;
use crate::core::platform::Platform;

/// Inputs shared by every command that resolves the workspace
#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Option override, `name=value` (repeatable)
    #[arg(short = 'o', long = "option", value_name = "NAME=VALUE")]
    pub options: Vec<String>,

    /// Requirement version override, `name/version` (repeatable)
    #[arg(long, value_name = "NAME/VERSION")]
    pub require: Vec<String>,

    /// Platform to resolve for, `os` or `os-arch` (defaults to the host)
    #[arg(long)]
    pub platform: Option<String>,
}

/// Build-only flags
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Number of parallel jobs per target
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Package the targets that built even if others failed
    #[arg(long)]
    pub partial: bool,

    /// Fail packaging when no license file is present
    #[arg(long)]
    pub strict_license: bool,

    /// Stop after building, without packaging
    #[arg(long)]
    pub no_package: bool,

    /// CMake binary to use instead of the one on PATH
    #[arg(long, env = "IMX93_CMAKE")]
    pub cmake: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the resolved configuration without building
    Resolve {
        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Configure, build and package the selected targets
    Build {
        #[command(flatten)]
        resolve: ResolveArgs,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Print consumer link metadata for the resolved configuration
    Metadata {
        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Remove build and package folders
    Clean,
}

impl Commands {
    /// Execute the command
    pub async fn run(self, workspace: &Path, output: OutputConfig) -> Result<i32> {
        match self {
            Self::Resolve { resolve } => resolve::execute(workspace, &resolve, output).map(|()| 0),
            Self::Build { resolve, build } => {
                build::execute(workspace, &resolve, &build, output).await
            }
            Self::Metadata { resolve } => {
                metadata::execute(workspace, &resolve, output).map(|()| 0)
            }
            Self::Clean => clean::execute(workspace, output).map(|()| 0),
        }
    }
}

/// Load the manifest and turn the CLI arguments into a resolve request
pub(crate) fn load_request(
    workspace: &Path,
    args: &ResolveArgs,
) -> Result<(WorkspaceManifest, ResolveRequest)> {
    let manifest = WorkspaceManifest::load(workspace)
        .with_context(|| format!("Failed to load manifest in {}", workspace.display()))?;

    let platform = match &args.platform {
        Some(raw) => raw
            .parse::<Platform>()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Invalid --platform '{raw}'"))?,
        None => Platform::host(),
    };

    let mut cli_options = BTreeMap::new();
    for raw in &args.options {
        let (name, value) = parse_override(raw)?;
        cli_options.insert(name, value);
    }

    let request =
        ResolveRequest::from_manifest(workspace, platform, &manifest, cli_options, &args.require)?;
    Ok((manifest, request))
}

/// Resolve the workspace for `args`
pub(crate) fn resolve_configuration(
    workspace: &Path,
    args: &ResolveArgs,
) -> Result<ResolvedConfiguration> {
    let (_, request) = load_request(workspace, args)?;
    let config = ResolvedConfiguration::resolve(&WorkspaceSchema::workspace(), &request)
        .context("Failed to resolve workspace configuration")?;
    Ok(config)
}
