//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::OnceLock;

use commands::Commands;
use output::OutputConfig;

/// Version string with the git revision and build target stamped in
fn long_version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| {
        format!(
            "{} (git {}{}, built {} for {} with rustc {})",
            env!("CARGO_PKG_VERSION"),
            option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
            match option_env!("VERGEN_GIT_DIRTY") {
                Some("true") => "-dirty",
                _ => "",
            },
            option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
            option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown"),
            option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown"),
        )
    })
}

/// imx93-build - configure, build and package the dual-core i.MX93 workspace
///
/// Resolves options and requirements for the Cortex-A55 application and the
/// Cortex-M33 firmware, builds both with CMake and stages an installable package.
#[derive(Parser, Debug)]
#[command(name = "imx93-build")]
#[command(author, version, long_version = long_version(), about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Workspace root (defaults to the current directory)
    #[arg(short = 'C', long, global = true, env = "IMX93_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn output(&self) -> OutputConfig {
        OutputConfig::new(self.quiet, self.json, self.verbose)
    }

    /// Execute the CLI command, returning the process exit code
    pub async fn run(self) -> Result<i32> {
        let output = self.output();
        let workspace = match self.workspace {
            Some(path) => path,
            None => std::env::current_dir()?,
        };

        if let Some(cmd) = self.command {
            cmd.run(&workspace, output).await
        } else {
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_flags_parse() {
        let cli = Cli::try_parse_from([
            "imx93-build",
            "-vv",
            "build",
            "-o",
            "shared=true",
            "--option",
            "build_m33=false",
            "--require",
            "spdlog/1.14.1",
            "--platform",
            "linux-armv8",
            "--partial",
            "--jobs",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Build { resolve, build }) => {
                assert_eq!(resolve.options, vec!["shared=true", "build_m33=false"]);
                assert_eq!(resolve.require, vec!["spdlog/1.14.1"]);
                assert_eq!(resolve.platform.as_deref(), Some("linux-armv8"));
                assert!(build.partial);
                assert_eq!(build.jobs, Some(4));
            }
            other => panic!("Expected build command, got {other:?}"),
        }
    }

    #[test]
    fn test_version_mentions_package_version() {
        assert!(long_version().starts_with(env!("CARGO_PKG_VERSION")));
        assert!(long_version().contains(" with rustc "));
    }
}
