//! Build orchestration logic
//!
//! Drives configure and build for each selected target. The application-core
//! and microcontroller-core pipelines share no mutable state, so `build_all`
//! runs them as independent tasks and joins them before packaging.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::defaults::DESCRIPTOR_FILE;
use crate::core::configuration::ResolvedConfiguration;
use crate::core::descriptor::render_descriptor;
use crate::core::target::Target;
use crate::error::BuildError;
use crate::infra::filesystem;
use crate::infra::native_tool::{ConfigureInvocation, NativeBuildTool};
use crate::infra::process::ProcessError;
use crate::infra::provider::{DependencyProvider, LocatedDependency};

/// Artifacts of one successfully built target
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    pub target: Target,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub descriptor: PathBuf,
    pub dependencies: Vec<LocatedDependency>,
    /// Captured configure + build output
    pub diagnostics: String,
}

/// Per-target cancellation signals under one root
///
/// Cancelling a target stops only that target's in-flight process;
/// cancelling the root stops every target.
#[derive(Debug, Clone)]
pub struct BuildCancellation {
    root: CancellationToken,
    targets: BTreeMap<Target, CancellationToken>,
}

impl BuildCancellation {
    pub fn new() -> Self {
        let root = CancellationToken::new();
        let targets = Target::ALL
            .into_iter()
            .map(|t| (t, root.child_token()))
            .collect();
        Self { root, targets }
    }

    /// Token observed by `target`'s build
    pub fn token(&self, target: Target) -> CancellationToken {
        self.targets
            .get(&target)
            .cloned()
            .unwrap_or_else(|| self.root.child_token())
    }

    /// Cancel a single target
    pub fn cancel_target(&self, target: Target) {
        if let Some(token) = self.targets.get(&target) {
            token.cancel();
        }
    }

    /// Cancel every target
    pub fn cancel_all(&self) {
        self.root.cancel();
    }

    /// Root token, raised by [`Self::cancel_all`]
    pub fn root(&self) -> &CancellationToken {
        &self.root
    }
}

impl Default for BuildCancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one target's pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct TargetOutcome {
    pub target: Target,
    pub result: Result<BuildResult, BuildError>,
}

/// Joined outcomes of every selected target, in target order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    outcomes: Vec<TargetOutcome>,
}

impl BuildReport {
    pub fn outcomes(&self) -> &[TargetOutcome] {
        &self.outcomes
    }

    /// Results of targets that built
    pub fn successes(&self) -> Vec<BuildResult> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().cloned())
            .collect()
    }

    /// Errors of targets that did not build
    pub fn failures(&self) -> Vec<&BuildError> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err())
            .collect()
    }

    /// Targets that did not build
    pub fn failed_targets(&self) -> Vec<Target> {
        self.failures().iter().map(|e| e.target()).collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Build driver over a native tool and a dependency provider
#[derive(Debug)]
pub struct BuildDriver<T, P> {
    tool: Arc<T>,
    provider: Arc<P>,
}

impl<T, P> Clone for BuildDriver<T, P> {
    fn clone(&self) -> Self {
        Self {
            tool: Arc::clone(&self.tool),
            provider: Arc::clone(&self.provider),
        }
    }
}

fn process_error(target: Target, error: ProcessError) -> BuildError {
    match error {
        ProcessError::Cancelled { .. } => BuildError::Cancelled { target },
        ProcessError::Spawn { error, .. } => BuildError::ToolUnavailable { target, error },
    }
}

impl<T, P> BuildDriver<T, P>
where
    T: NativeBuildTool + 'static,
    P: DependencyProvider + 'static,
{
    pub fn new(tool: Arc<T>, provider: Arc<P>) -> Self {
        Self { tool, provider }
    }

    /// Configure and build one selected target
    ///
    /// An unselected target fails with [`BuildError::NotSelected`] before
    /// anything is created on disk.
    pub async fn build(
        &self,
        target: Target,
        config: &ResolvedConfiguration,
        cancel: &CancellationToken,
    ) -> Result<BuildResult, BuildError> {
        let (Some(toolchain), Some(build_dir)) =
            (config.toolchain(target), config.layout().build_folder(target))
        else {
            return Err(BuildError::NotSelected { target });
        };
        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled { target });
        }

        let dependencies = config
            .requirements_for(target)
            .map(|req| self.provider.locate(req, config.platform(), toolchain))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| BuildError::Dependency { target, source })?;

        let io = |e: crate::error::FilesystemError| BuildError::Io {
            target,
            error: e.to_string(),
        };
        filesystem::create_dir_all(build_dir).map_err(io)?;
        let descriptor = build_dir.join(DESCRIPTOR_FILE);
        filesystem::write_file(
            &descriptor,
            &render_descriptor(config, target, &dependencies),
        )
        .map_err(io)?;

        let invocation = ConfigureInvocation {
            target,
            source_dir: config.layout().source_dir(target),
            build_dir: build_dir.to_path_buf(),
            toolchain: toolchain.clone(),
            descriptor: descriptor.clone(),
            requirements: dependencies.clone(),
        };

        tracing::info!("Configuring {target} ({})", toolchain.identity);
        let configured = self
            .tool
            .configure(&invocation, cancel)
            .await
            .map_err(|e| process_error(target, e))?;
        if !configured.success {
            return Err(BuildError::Configure {
                target,
                diagnostics: configured.diagnostics,
            });
        }

        tracing::info!("Building {target}");
        let built = self
            .tool
            .build(build_dir, cancel)
            .await
            .map_err(|e| process_error(target, e))?;
        if !built.success {
            return Err(BuildError::Build {
                target,
                diagnostics: built.diagnostics,
            });
        }

        tracing::info!("Built {target}");
        Ok(BuildResult {
            target,
            source_dir: invocation.source_dir,
            build_dir: invocation.build_dir,
            descriptor,
            dependencies,
            diagnostics: configured.diagnostics + &built.diagnostics,
        })
    }

    /// Build every selected target concurrently and join the results
    pub async fn build_all(
        &self,
        config: Arc<ResolvedConfiguration>,
        cancellation: &BuildCancellation,
    ) -> BuildReport {
        if config.targets().is_empty() {
            tracing::info!("No targets selected, nothing to build");
            return BuildReport::default();
        }

        let handles: Vec<_> = config
            .targets()
            .iter()
            .map(|&target| {
                let driver = self.clone();
                let config = Arc::clone(&config);
                let token = cancellation.token(target);
                let handle =
                    tokio::spawn(async move { driver.build(target, &config, &token).await });
                (target, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (target, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(BuildError::Io {
                    target,
                    error: format!("build task failed: {e}"),
                }),
            };
            if let Err(e) = &result {
                tracing::warn!("{e}");
            }
            outcomes.push(TargetOutcome { target, result });
        }

        BuildReport { outcomes }
    }
}
