//! CLI implementation for `imx93-build metadata`
//!
//! Derives consumer link metadata from the resolved configuration alone,
//! without building anything.

use anyhow::Result;
use std::path::Path;

use super::{resolve_configuration, ResolveArgs};
use crate::cli::output::{print_json, OutputConfig};
use crate::core::package::package_metadata;

/// Execute the metadata command
pub fn execute(workspace: &Path, args: &ResolveArgs, output: OutputConfig) -> Result<()> {
    let config = resolve_configuration(workspace, args)?;
    let metadata = package_metadata(&config);

    if output.json {
        return print_json(&metadata);
    }

    let list = |items: &[String]| {
        if items.is_empty() {
            "(none)".to_string()
        } else {
            items.join(" ")
        }
    };
    output.line(format!("{} {}", metadata.name, metadata.version));
    output.line(format!("  libs:         {}", list(&metadata.libs)));
    output.line(format!("  system libs:  {}", list(&metadata.system_libs)));
    output.line(format!("  defines:      {}", list(&metadata.defines)));
    output.line(format!("  include dirs: {}", list(&metadata.include_dirs)));
    output.line(format!("  bin dirs:     {}", list(&metadata.bin_dirs)));
    output.line(format!("  lib dirs:     {}", list(&metadata.lib_dirs)));
    Ok(())
}
