//! Platform model
//!
//! The resolving platform decides which options apply (position-independent
//! code) and which system libraries consumers link against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::defaults::POSIX_SYSTEM_LIBS;

/// Operating system family of the resolving platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    FreeBsd,
    Macos,
    Windows,
    Baremetal,
}

impl Os {
    /// Lowercase name used in CLI arguments and JSON output
    pub fn as_str(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::FreeBsd => "freebsd",
            Os::Macos => "macos",
            Os::Windows => "windows",
            Os::Baremetal => "baremetal",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Os::Linux),
            "freebsd" => Ok(Os::FreeBsd),
            "macos" | "darwin" => Ok(Os::Macos),
            "windows" => Ok(Os::Windows),
            "baremetal" | "none" => Ok(Os::Baremetal),
            other => Err(format!(
                "unknown os '{other}' (expected linux, freebsd, macos, windows or baremetal)"
            )),
        }
    }
}

/// Platform a configuration is resolved for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system family
    pub os: Os,
    /// Architecture name (free-form, e.g. "armv8")
    pub arch: String,
}

impl Platform {
    /// Create a platform description
    pub fn new(os: Os, arch: impl Into<String>) -> Self {
        Self {
            os,
            arch: arch.into(),
        }
    }

    /// Platform of the running host
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "windows" => Os::Windows,
            "macos" => Os::Macos,
            "freebsd" => Os::FreeBsd,
            _ => Os::Linux,
        };
        Self::new(os, std::env::consts::ARCH)
    }

    /// Whether position-independent code is a meaningful concept here
    pub fn supports_fpic(&self) -> bool {
        self.os != Os::Windows
    }

    /// Linux and FreeBSD: consumers link thread, dynamic-load and math libraries
    pub fn is_posix_like(&self) -> bool {
        matches!(self.os, Os::Linux | Os::FreeBsd)
    }

    /// System libraries consumers must link
    pub fn system_libs(&self) -> Vec<String> {
        if self.is_posix_like() {
            POSIX_SYSTEM_LIBS.iter().map(|s| (*s).to_string()).collect()
        } else {
            Vec::new()
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Parses `os` or `os-arch` (e.g. `linux`, `windows-x86_64`)
impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (os, arch) = match s.split_once('-') {
            Some((os, arch)) if !arch.is_empty() => (os, arch.to_string()),
            _ => (s, std::env::consts::ARCH.to_string()),
        };
        Ok(Self::new(os.parse()?, arch))
    }
}
