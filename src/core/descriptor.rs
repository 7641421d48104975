//! Build-tool descriptor generation
//!
//! Renders the CMake initial-cache script (`cmake -C`) a target is configured
//! with. Output depends only on the resolved configuration and the located
//! dependencies, in requirement order, so repeated runs write identical files.

use std::fmt::Write as _;
use std::path::Path;

use crate::config::defaults::FMT_DEFINE;
use crate::core::configuration::ResolvedConfiguration;
use crate::core::target::Target;
use crate::infra::provider::LocatedDependency;

fn cmake_path(path: &Path) -> String {
    let path = path.display().to_string();
    if cfg!(windows) {
        path.replace('\\', "/")
    } else {
        path
    }
}

/// Escape `value` for use inside a CMake quoted argument
fn cmake_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '"' | '$' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted
}

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

/// Whether position-independent code is requested, `None` when not applicable
///
/// Shared linkage removes the option and implies it.
pub fn position_independent_code(config: &ResolvedConfiguration) -> Option<bool> {
    let options = config.options();
    if let Ok(fpic) = options.get_bool("fPIC") {
        Some(fpic)
    } else if options.is_enabled("shared") {
        Some(true)
    } else {
        None
    }
}

/// Render the initial-cache script for `target`
pub fn render_descriptor(
    config: &ResolvedConfiguration,
    target: Target,
    dependencies: &[LocatedDependency],
) -> String {
    let options = config.options();
    let mut out = String::new();

    let _ = writeln!(out, "# Generated by imx93-build for target '{target}'. Do not edit.");
    let _ = writeln!(out, "# configuration {}", config.fingerprint());

    let cache = |out: &mut String, name: &str, value: &str, kind: &str| {
        let _ = writeln!(out, "set({name} \"{}\" CACHE {kind} \"\")", cmake_quote(value));
    };

    if let Some(toolchain) = config.toolchain(target) {
        cache(&mut out, "CMAKE_TOOLCHAIN_FILE", &cmake_path(&toolchain.file), "FILEPATH");
        cache(&mut out, "WORKSPACE_TOOLCHAIN", &toolchain.identity, "STRING");
    }
    cache(&mut out, "WORKSPACE_TARGET", target.id(), "STRING");

    if let Ok(build_type) = options.get("build_type") {
        cache(&mut out, "CMAKE_BUILD_TYPE", &build_type.to_string(), "STRING");
    }
    cache(
        &mut out,
        "BUILD_SHARED_LIBS",
        on_off(options.is_enabled("shared")),
        "BOOL",
    );
    if let Some(fpic) = position_independent_code(config) {
        cache(&mut out, "CMAKE_POSITION_INDEPENDENT_CODE", on_off(fpic), "BOOL");
    }

    let uses_fmt = dependencies.iter().any(|d| d.name == "fmt");
    cache(&mut out, FMT_DEFINE, on_off(uses_fmt), "BOOL");

    let requirements: Vec<String> = dependencies
        .iter()
        .map(|d| format!("{}/{}", d.name, d.version))
        .collect();
    cache(&mut out, "WORKSPACE_REQUIREMENTS", &requirements.join(";"), "STRING");

    if !dependencies.is_empty() {
        let prefixes: Vec<String> = dependencies.iter().map(|d| cmake_path(&d.prefix)).collect();
        cache(&mut out, "CMAKE_PREFIX_PATH", &prefixes.join(";"), "PATH");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::configuration::{ResolveRequest, WorkspaceSchema};
    use crate::core::options::OptionOverrides;
    use crate::core::platform::{Os, Platform};
    use semver::Version;
    use std::path::PathBuf;

    fn config(os: Os, overrides: OptionOverrides) -> ResolvedConfiguration {
        let request =
            ResolveRequest::new("/ws", Platform::new(os, "armv8")).with_overrides(overrides);
        ResolvedConfiguration::resolve(&WorkspaceSchema::workspace(), &request).unwrap()
    }

    fn dep(name: &str, version: Version) -> LocatedDependency {
        let prefix = PathBuf::from("/deps").join(name);
        LocatedDependency {
            name: name.to_string(),
            version,
            include_dir: prefix.join("include"),
            lib_dir: prefix.join("lib"),
            prefix,
        }
    }

    #[test]
    fn test_descriptor_carries_toolchain_and_requirements() {
        let cfg = config(Os::Linux, OptionOverrides::new());
        let deps = vec![
            dep("fmt", Version::new(10, 2, 1)),
            dep("spdlog", Version::new(1, 14, 1)),
        ];
        let text = render_descriptor(&cfg, Target::ApplicationCore, &deps);

        assert!(text.contains(
            "set(CMAKE_TOOLCHAIN_FILE \"/ws/cmake/toolchains/a55.cmake\" CACHE FILEPATH \"\")"
        ));
        assert!(text.contains("set(CMAKE_BUILD_TYPE \"Release\" CACHE STRING \"\")"));
        assert!(text.contains("set(BUILD_SHARED_LIBS \"OFF\" CACHE BOOL \"\")"));
        assert!(text.contains("set(CMAKE_POSITION_INDEPENDENT_CODE \"ON\" CACHE BOOL \"\")"));
        assert!(text.contains("set(USE_FMT \"ON\" CACHE BOOL \"\")"));
        assert!(text.contains("\"fmt/10.2.1;spdlog/1.14.1\""));
        assert!(text.contains("\"/deps/fmt;/deps/spdlog\""));
    }

    #[test]
    fn test_descriptor_omits_fpic_when_not_applicable() {
        let cfg = config(Os::Windows, OptionOverrides::new());
        let text = render_descriptor(&cfg, Target::ApplicationCore, &[]);
        assert!(!text.contains("CMAKE_POSITION_INDEPENDENT_CODE"));
        assert!(!text.contains("CMAKE_PREFIX_PATH"));
    }

    #[test]
    fn test_shared_implies_position_independent_code() {
        let cfg = config(Os::Linux, OptionOverrides::new().cli("shared", true));
        assert_eq!(position_independent_code(&cfg), Some(true));
        let text = render_descriptor(&cfg, Target::McuCore, &[]);
        assert!(text.contains("set(BUILD_SHARED_LIBS \"ON\" CACHE BOOL \"\")"));
        assert!(text.contains("set(CMAKE_POSITION_INDEPENDENT_CODE \"ON\" CACHE BOOL \"\")"));
        assert!(text.contains("set(USE_FMT \"OFF\" CACHE BOOL \"\")"));
    }

    #[test]
    fn test_cache_values_are_escaped() {
        assert_eq!(cmake_quote("plain/path"), "plain/path");
        assert_eq!(cmake_quote(r#"a"b"#), r#"a\"b"#);
        assert_eq!(cmake_quote(r"a\b"), r"a\\b");
        assert_eq!(cmake_quote("${HOME}"), r"\${HOME}");
    }

    #[cfg(unix)]
    #[test]
    fn test_descriptor_escapes_dependency_prefix() {
        let cfg = config(Os::Linux, OptionOverrides::new());
        let prefix = PathBuf::from(r#"/deps/we"ird\fmt"#);
        let deps = vec![LocatedDependency {
            name: "fmt".to_string(),
            version: Version::new(10, 2, 1),
            include_dir: prefix.join("include"),
            lib_dir: prefix.join("lib"),
            prefix,
        }];

        let text = render_descriptor(&cfg, Target::ApplicationCore, &deps);
        assert!(
            text.contains(r#"set(CMAKE_PREFIX_PATH "/deps/we\"ird\\fmt" CACHE PATH "")"#),
            "{text}"
        );
    }

    #[test]
    fn test_descriptor_is_reproducible() {
        let deps = vec![dep("spdlog", Version::new(1, 14, 1))];
        let a = render_descriptor(&config(Os::Linux, OptionOverrides::new()), Target::ApplicationCore, &deps);
        let b = render_descriptor(&config(Os::Linux, OptionOverrides::new()), Target::ApplicationCore, &deps);
        assert_eq!(a, b);
    }
}
