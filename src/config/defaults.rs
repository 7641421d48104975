//! Default configuration values

/// Workspace package name, also the library name exported for shared builds
pub const WORKSPACE_NAME: &str = "imx93_workspace";

/// Workspace package version
pub const WORKSPACE_VERSION: &str = "0.1.0";

/// Optional workspace manifest at the workspace root
pub const MANIFEST_FILE: &str = "workspace.toml";

/// Shared build root, one subfolder per target beneath it
pub const BUILD_ROOT: &str = "build";

/// Staged package tree
pub const PACKAGE_DIR: &str = "package";

/// Dependency provider prefix root (relative to the workspace)
pub const DEPENDENCY_ROOT: &str = "deps";

/// Package install subpaths
pub const LICENSES_SUBDIR: &str = "licenses";
pub const INCLUDE_SUBDIR: &str = "include";
pub const BIN_SUBDIR: &str = "bin";
pub const LIB_SUBDIR: &str = "lib";

/// License files copied into the package, in lookup order
pub const LICENSE_FILES: &[&str] = &["LICENSE", "LICENSE.txt", "LICENSE.md", "COPYING"];

/// Header extensions staged into `include/`
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hh", "hxx"];

/// Initial-cache script written into each target build folder
pub const DESCRIPTOR_FILE: &str = "workspace-config.cmake";

/// Consumer metadata written at the package root
pub const METADATA_FILE: &str = "package_info.json";

/// Staging lock held by the packager
pub const STAGING_LOCK_FILE: &str = ".staging.lock";

/// System libraries linked by consumers on POSIX-like platforms
pub const POSIX_SYSTEM_LIBS: &[&str] = &["pthread", "dl", "m"];

/// Preprocessor definition enabling the formatting library in application sources
pub const FMT_DEFINE: &str = "USE_FMT";
