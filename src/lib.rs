//! imx93-build - build configuration and orchestration for a dual-core i.MX93 workspace
//!
//! Resolves the workspace's options and third-party requirements for a
//! platform, then configures, builds and packages the Cortex-A55 application
//! and the Cortex-M33 firmware as independent targets.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Resolution, build orchestration and packaging
//! - [`infra`] - Infrastructure layer (filesystem, processes, native tool)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
