//! Build targets
//!
//! The workspace holds two independently built subsystems, each with its own
//! toolchain, source subtree and build folder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One independently buildable subsystem of the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Target {
    /// Cortex-A55 application core running Linux
    #[serde(rename = "a55")]
    ApplicationCore,
    /// Cortex-M33 microcontroller core running bare-metal/RTOS firmware
    #[serde(rename = "m33")]
    McuCore,
}

impl Target {
    /// All targets, in build/report order
    pub const ALL: [Target; 2] = [Target::ApplicationCore, Target::McuCore];

    /// Short identity used for folders, manifest keys and logs
    pub fn id(self) -> &'static str {
        match self {
            Target::ApplicationCore => "a55",
            Target::McuCore => "m33",
        }
    }

    /// Option toggling this target's inclusion
    pub fn toggle_option(self) -> &'static str {
        match self {
            Target::ApplicationCore => "build_a55",
            Target::McuCore => "build_m33",
        }
    }

    /// Toolchain identity handed to the dependency provider
    pub fn toolchain_identity(self) -> &'static str {
        match self {
            Target::ApplicationCore => "aarch64-linux-gnu",
            Target::McuCore => "arm-none-eabi",
        }
    }

    /// Toolchain file used when the manifest does not override it
    pub fn default_toolchain_file(self) -> PathBuf {
        PathBuf::from("cmake/toolchains").join(format!("{}.cmake", self.id()))
    }

    /// Source subtree, relative to the workspace root
    pub fn source_subdir(self) -> &'static Path {
        match self {
            Target::ApplicationCore => Path::new("apps/a55"),
            Target::McuCore => Path::new("firmware/m33"),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a55" => Ok(Target::ApplicationCore),
            "m33" => Ok(Target::McuCore),
            other => Err(format!("unknown target '{other}' (expected a55 or m33)")),
        }
    }
}

/// Toolchain descriptor for one target
///
/// Treated as an opaque identity plus a file path only the native build tool
/// reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    /// Identity string (e.g. `aarch64-linux-gnu`)
    pub identity: String,
    /// Toolchain file resolvable by the native build tool
    pub file: PathBuf,
}

impl Toolchain {
    /// Default toolchain for a target, with the file resolved against `workspace_root`
    pub fn for_target(target: Target, workspace_root: &Path) -> Self {
        Self {
            identity: target.toolchain_identity().to_string(),
            file: workspace_root.join(target.default_toolchain_file()),
        }
    }

    /// Replace the toolchain file
    #[must_use]
    pub fn with_file(mut self, file: PathBuf) -> Self {
        self.file = file;
        self
    }
}
