//! Build command implementation
//!
//! Implements `imx93-build build`: resolve, build both targets concurrently,
//! then package. Ctrl-C cancels every in-flight target.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use super::{load_request, BuildArgs, ResolveArgs};
use crate::cli::output::{create_spinner, print_json, status, OutputConfig};
use crate::core::builder::BuildCancellation;
use crate::core::package::InstalledPackage;
use crate::core::pipeline::{
    PackagingMode, PackagingOutcome, Pipeline, PipelineReport, PipelineRequest, PipelineStage,
};
use crate::core::target::Target;
use crate::infra::native_tool::CmakeTool;
use crate::infra::provider::PrefixProvider;

#[derive(Serialize)]
struct TargetSummary {
    target: Target,
    built: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum PackagingSummary<'a> {
    Packaged { package: &'a InstalledPackage },
    Skipped { reason: &'a str },
    Failed { error: String },
}

#[derive(Serialize)]
struct BuildSummary<'a> {
    fingerprint: String,
    stages: &'a [PipelineStage],
    targets: Vec<TargetSummary>,
    packaging: PackagingSummary<'a>,
    exit_code: i32,
}

fn summarize(report: &PipelineReport) -> BuildSummary<'_> {
    let targets = report
        .builds
        .outcomes()
        .iter()
        .map(|o| TargetSummary {
            target: o.target,
            built: o.result.is_ok(),
            error: o.result.as_ref().err().map(ToString::to_string),
        })
        .collect();
    let packaging = match &report.packaging {
        PackagingOutcome::Packaged(package) => PackagingSummary::Packaged { package },
        PackagingOutcome::Skipped { reason } => PackagingSummary::Skipped { reason },
        PackagingOutcome::Failed(e) => PackagingSummary::Failed {
            error: e.to_string(),
        },
    };

    BuildSummary {
        fingerprint: report.configuration.fingerprint(),
        stages: &report.stages,
        targets,
        packaging,
        exit_code: report.exit_code(),
    }
}

fn print_report(report: &PipelineReport, output: OutputConfig) {
    if report.builds.is_empty() {
        output.line(format!("{} No targets selected", status::SKIPPED));
    }
    for outcome in report.builds.outcomes() {
        match &outcome.result {
            Ok(result) => output.line(format!(
                "{} {} built in {}",
                status::SUCCESS,
                outcome.target,
                result.build_dir.display()
            )),
            // Failures always reach stderr, even with --quiet.
            Err(e) => eprintln!("{} {e}", status::ERROR),
        }
    }

    match &report.packaging {
        PackagingOutcome::Packaged(pkg) => {
            output.line(format!(
                "{} Packaged into {}",
                status::SUCCESS,
                pkg.folder.display()
            ));
            output.line(format!("  Licenses: {}", pkg.licenses.len()));
            output.line(format!("  Headers:  {}", pkg.headers.len()));
            output.line(format!("  Metadata: {}", pkg.metadata_file.display()));
        }
        PackagingOutcome::Skipped { reason } => {
            output.line(format!("{} Packaging skipped: {reason}", status::WARNING));
        }
        PackagingOutcome::Failed(e) => eprintln!("{} {e}", status::ERROR),
    }
}

/// Execute the build command
pub async fn execute(
    workspace: &Path,
    resolve: &ResolveArgs,
    args: &BuildArgs,
    output: OutputConfig,
) -> Result<i32> {
    let (manifest, request) = load_request(workspace, resolve)?;

    let mode = if args.partial || manifest.package.partial {
        PackagingMode::Partial
    } else {
        PackagingMode::Strict
    };
    let mut request = PipelineRequest::new(request)
        .with_mode(mode)
        .with_strict_license(args.strict_license || manifest.package.strict_license);
    if args.no_package {
        request = request.without_packaging();
    }

    let mut tool = match &args.cmake {
        Some(program) => CmakeTool::new(program.clone()),
        None => CmakeTool::detect().context("cmake not found on PATH (use --cmake)")?,
    };
    if let Some(jobs) = args.jobs {
        tool = tool.with_jobs(jobs);
    }
    tracing::info!("Using {}", tool.program().display());

    let provider = PrefixProvider::new(manifest.dependency_root(workspace));
    let pipeline = Pipeline::new(Arc::new(tool), Arc::new(provider));

    let cancellation = BuildCancellation::new();
    let root = cancellation.root().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling builds");
            root.cancel();
        }
    });

    let spinner = output
        .show_progress()
        .then(|| create_spinner("Building targets..."));
    let result = pipeline.run(&request, &cancellation).await;
    interrupt.abort();
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let report = result.context("Failed to resolve workspace configuration")?;
    if output.json {
        print_json(&summarize(&report))?;
    } else {
        print_report(&report, output);
    }
    Ok(report.exit_code())
}
