//! CLI implementation for `imx93-build resolve`
//!
//! Prints the resolved configuration without touching the filesystem.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use super::{resolve_configuration, ResolveArgs};
use crate::cli::output::{print_json, OutputConfig};
use crate::core::configuration::ResolvedConfiguration;

#[derive(Serialize)]
struct ResolveOutput<'a> {
    fingerprint: String,
    #[serde(flatten)]
    configuration: &'a ResolvedConfiguration,
}

/// Execute the resolve command
pub fn execute(workspace: &Path, args: &ResolveArgs, output: OutputConfig) -> Result<()> {
    let config = resolve_configuration(workspace, args)?;

    if output.json {
        return print_json(&ResolveOutput {
            fingerprint: config.fingerprint(),
            configuration: &config,
        });
    }

    output.line(format!("Platform: {}", config.platform()));
    output.line("Options:");
    for (name, option) in config.options().iter() {
        output.line(format!("  {name} = {} ({:?})", option.value, option.source));
    }
    for (name, reason) in config.options().removed() {
        output.line(format!("  {name} removed: {reason}"));
    }

    output.line("Requirements:");
    if config.requirements().is_empty() {
        output.line("  (none)");
    }
    for req in config.requirements() {
        output.line(format!("  {req}"));
    }

    output.line("Targets:");
    if config.targets().is_empty() {
        output.line("  (none)");
    }
    for &target in config.targets() {
        if let (Some(toolchain), Some(folder)) =
            (config.toolchain(target), config.layout().build_folder(target))
        {
            output.line(format!(
                "  {target}: {} -> {}",
                toolchain.identity,
                folder.display()
            ));
        }
    }

    output.line(format!(
        "Package: {}",
        config.layout().package_folder.display()
    ));
    output.line(format!("Fingerprint: {}", config.fingerprint()));
    Ok(())
}
