//! Build pipeline
//!
//! Drives one invocation through its stages:
//! `Declared → OptionsResolved → RequirementsResolved → LayoutPlanned →
//! Built(target)… → Packaged`. Resolution errors end the run before any
//! process is started or folder created.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::core::builder::{BuildCancellation, BuildDriver, BuildReport};
use crate::core::configuration::{ResolveRequest, ResolvedConfiguration, WorkspaceSchema};
use crate::core::package::{InstalledPackage, Packager};
use crate::core::target::Target;
use crate::error::{PackagingError, WorkspaceError};
use crate::infra::native_tool::NativeBuildTool;
use crate::infra::provider::DependencyProvider;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Declared,
    OptionsResolved,
    RequirementsResolved,
    LayoutPlanned,
    Built(Target),
    Packaged,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared => f.write_str("declared"),
            Self::OptionsResolved => f.write_str("options resolved"),
            Self::RequirementsResolved => f.write_str("requirements resolved"),
            Self::LayoutPlanned => f.write_str("layout planned"),
            Self::Built(target) => write!(f, "built {target}"),
            Self::Packaged => f.write_str("packaged"),
        }
    }
}

/// What to do when some targets fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagingMode {
    /// Skip packaging if any selected target failed
    #[default]
    Strict,
    /// Package whatever built
    Partial,
}

/// Inputs of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    pub schema: WorkspaceSchema,
    pub resolve: ResolveRequest,
    pub mode: PackagingMode,
    pub strict_license: bool,
    /// Run the packager at all
    pub package: bool,
}

impl PipelineRequest {
    pub fn new(resolve: ResolveRequest) -> Self {
        Self {
            schema: WorkspaceSchema::workspace(),
            resolve,
            mode: PackagingMode::default(),
            strict_license: false,
            package: true,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: PackagingMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_strict_license(mut self, strict: bool) -> Self {
        self.strict_license = strict;
        self
    }

    /// Stop after the builds
    #[must_use]
    pub fn without_packaging(mut self) -> Self {
        self.package = false;
        self
    }
}

/// Result of the packaging stage
#[derive(Debug, Clone, PartialEq)]
pub enum PackagingOutcome {
    Packaged(InstalledPackage),
    Skipped { reason: String },
    Failed(PackagingError),
}

/// Everything a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub configuration: Arc<ResolvedConfiguration>,
    /// Stages reached, in order
    pub stages: Vec<PipelineStage>,
    pub builds: BuildReport,
    pub packaging: PackagingOutcome,
}

impl PipelineReport {
    /// 0 only if every selected target built and packaging, if run, succeeded
    pub fn exit_code(&self) -> i32 {
        let packaging_ok = !matches!(self.packaging, PackagingOutcome::Failed(_));
        if self.builds.all_succeeded() && packaging_ok {
            0
        } else {
            1
        }
    }

    pub fn installed(&self) -> Option<&InstalledPackage> {
        match &self.packaging {
            PackagingOutcome::Packaged(pkg) => Some(pkg),
            _ => None,
        }
    }
}

fn enter(stages: &mut Vec<PipelineStage>, stage: PipelineStage) {
    match stages.last() {
        Some(prev) => tracing::debug!("Pipeline: {prev} -> {stage}"),
        None => tracing::debug!("Pipeline: {stage}"),
    }
    stages.push(stage);
}

/// Resolve, build and package one workspace invocation
#[derive(Debug)]
pub struct Pipeline<T, P> {
    tool: Arc<T>,
    driver: BuildDriver<T, P>,
}

impl<T, P> Pipeline<T, P>
where
    T: NativeBuildTool + 'static,
    P: DependencyProvider + 'static,
{
    pub fn new(tool: Arc<T>, provider: Arc<P>) -> Self {
        Self {
            driver: BuildDriver::new(Arc::clone(&tool), provider),
            tool,
        }
    }

    /// Run the whole pipeline
    ///
    /// Build and packaging failures are reported in the [`PipelineReport`];
    /// only resolution failures return `Err`.
    pub async fn run(
        &self,
        request: &PipelineRequest,
        cancellation: &BuildCancellation,
    ) -> Result<PipelineReport, WorkspaceError> {
        let mut stages = Vec::new();
        enter(&mut stages, PipelineStage::Declared);

        let configuration = Arc::new(ResolvedConfiguration::resolve_observed(
            &request.schema,
            &request.resolve,
            |stage| enter(&mut stages, stage),
        )?);
        tracing::info!(
            "Resolved {} requirement(s) for target(s) [{}]",
            configuration.requirements().len(),
            configuration
                .targets()
                .iter()
                .map(|t| t.id())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let builds = self
            .driver
            .build_all(Arc::clone(&configuration), cancellation)
            .await;
        for outcome in builds.outcomes() {
            if outcome.result.is_ok() {
                enter(&mut stages, PipelineStage::Built(outcome.target));
            }
        }

        let packaging = self
            .package(request, &configuration, &builds, cancellation)
            .await;
        if matches!(packaging, PackagingOutcome::Packaged(_)) {
            enter(&mut stages, PipelineStage::Packaged);
        }

        Ok(PipelineReport {
            configuration,
            stages,
            builds,
            packaging,
        })
    }

    async fn package(
        &self,
        request: &PipelineRequest,
        configuration: &ResolvedConfiguration,
        builds: &BuildReport,
        cancellation: &BuildCancellation,
    ) -> PackagingOutcome {
        if !request.package {
            return PackagingOutcome::Skipped {
                reason: "packaging disabled".to_string(),
            };
        }
        if cancellation.root().is_cancelled() {
            return PackagingOutcome::Skipped {
                reason: "cancelled".to_string(),
            };
        }
        let failed = builds.failed_targets();
        let nothing_built = builds.successes().is_empty();
        if !failed.is_empty() && (request.mode == PackagingMode::Strict || nothing_built) {
            let names = failed.iter().map(|t| t.id()).collect::<Vec<_>>().join(", ");
            tracing::warn!("Skipping packaging: {names} failed");
            return PackagingOutcome::Skipped {
                reason: format!("{names} failed"),
            };
        }

        let packager =
            Packager::new(Arc::clone(&self.tool)).strict_license(request.strict_license);
        match packager
            .package(configuration, &builds.successes(), cancellation.root())
            .await
        {
            Ok(pkg) => PackagingOutcome::Packaged(pkg),
            Err(e) => {
                tracing::warn!("{e}");
                PackagingOutcome::Failed(e)
            }
        }
    }
}
