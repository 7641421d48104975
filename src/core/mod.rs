//! Core business logic module
//!
//! Resolution (options, requirements, layout) is pure. Side effects go
//! through the collaborators in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`platform`] - Host/target platform description
//! - [`target`] - Application-core and microcontroller-core targets
//! - [`options`] - Option schema, validation and platform adjustment
//! - [`resolver`] - Conditional requirements and version pins
//! - [`layout`] - Source/build/package folder planning
//! - [`configuration`] - Immutable resolved snapshot
//! - [`descriptor`] - CMake initial-cache generation
//! - [`builder`] - Per-target configure/build orchestration
//! - [`package`] - Package staging and link metadata
//! - [`pipeline`] - Stage machine tying the above together
//! - [`manifest`] - Optional `workspace.toml`
//! - [`clean`] - Removal of build and package trees

pub mod builder;
pub mod clean;
pub mod configuration;
pub mod descriptor;
pub mod layout;
pub mod manifest;
pub mod options;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod resolver;
pub mod target;
