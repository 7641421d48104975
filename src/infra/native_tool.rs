//! Native build tool invocation
//!
//! The core issues exactly three kinds of calls: configure and build per
//! target, and install from the packager. Only exit status and captured
//! diagnostics are read back.

use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::core::target::{Target, Toolchain};
use crate::infra::process::{self, ProcessError, ToolOutput};
use crate::infra::provider::LocatedDependency;

/// Everything the configure step needs for one target
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigureInvocation {
    pub target: Target,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub toolchain: Toolchain,
    /// Generated initial-cache script
    pub descriptor: PathBuf,
    /// Located requirements, in requirement order
    pub requirements: Vec<LocatedDependency>,
}

/// Native build tool collaborator
pub trait NativeBuildTool: Send + Sync {
    /// Materialize the build tree for one target
    fn configure(
        &self,
        invocation: &ConfigureInvocation,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<ToolOutput, ProcessError>> + Send;

    /// Compile a configured build tree
    fn build(
        &self,
        build_dir: &Path,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<ToolOutput, ProcessError>> + Send;

    /// Stage built binaries into the package folder
    fn install(
        &self,
        build_dir: &Path,
        package_dir: &Path,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<ToolOutput, ProcessError>> + Send;
}

/// CMake wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmakeTool {
    program: PathBuf,
    jobs: usize,
}

impl CmakeTool {
    /// Wrap the given cmake binary
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            jobs: num_cpus::get(),
        }
    }

    /// Find `cmake` on PATH
    pub fn detect() -> Option<Self> {
        which::which("cmake").ok().map(Self::new)
    }

    /// Set the number of parallel build jobs
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Path to the cmake binary
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// `-S <src> -B <build> -C <descriptor>`
    pub fn configure_args(invocation: &ConfigureInvocation) -> Vec<String> {
        vec![
            "-S".to_string(),
            invocation.source_dir.display().to_string(),
            "-B".to_string(),
            invocation.build_dir.display().to_string(),
            "-C".to_string(),
            invocation.descriptor.display().to_string(),
        ]
    }

    /// `--build <build> --parallel <jobs>`
    pub fn build_args(&self, build_dir: &Path) -> Vec<String> {
        vec![
            "--build".to_string(),
            build_dir.display().to_string(),
            "--parallel".to_string(),
            self.jobs.to_string(),
        ]
    }

    /// `--install <build> --prefix <package>`
    pub fn install_args(build_dir: &Path, package_dir: &Path) -> Vec<String> {
        vec![
            "--install".to_string(),
            build_dir.display().to_string(),
            "--prefix".to_string(),
            package_dir.display().to_string(),
        ]
    }

    fn command(&self, args: Vec<String>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd
    }
}

impl NativeBuildTool for CmakeTool {
    async fn configure(
        &self,
        invocation: &ConfigureInvocation,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ProcessError> {
        process::run(self.command(Self::configure_args(invocation)), cancel).await
    }

    async fn build(
        &self,
        build_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ProcessError> {
        process::run(self.command(self.build_args(build_dir)), cancel).await
    }

    async fn install(
        &self,
        build_dir: &Path,
        package_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ProcessError> {
        process::run(
            self.command(Self::install_args(build_dir, package_dir)),
            cancel,
        )
        .await
    }
}
