//! Infrastructure layer
//!
//! Handles all I/O: the filesystem, external processes, the native build
//! tool and the dependency provider.

pub mod filesystem;
pub mod native_tool;
pub mod process;
pub mod provider;
