//! Common test utilities and helpers
//!
//! Shared workspace fixtures and a shell-script stand-in for `cmake` that
//! records every invocation in `tools/cmake.log`.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test workspace context
pub struct TestProject {
    /// Temporary directory holding the workspace
    pub dir: TempDir,
}

impl TestProject {
    /// Create an empty workspace in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Workspace with sources, a license and the prebuilt dependency prefixes
    pub fn seeded() -> Self {
        let project = Self::new();
        project.create_file("LICENSE", "MIT License\n");
        project.create_file("apps/a55/CMakeLists.txt", "project(app)\n");
        project.create_file("apps/a55/include/imx93/app.hpp", "#pragma once\n");
        project.create_file("apps/a55/src/main.cpp", "int main() {}\n");
        project.create_file("firmware/m33/CMakeLists.txt", "project(fw)\n");
        project.create_file("firmware/m33/include/fw.h", "#pragma once\n");
        for (name, version) in [("fmt", "10.2.1"), ("spdlog", "1.14.1")] {
            project.create_dir(&format!("deps/{name}/{version}/aarch64-linux-gnu/include"));
            project.create_dir(&format!("deps/{name}/{version}/aarch64-linux-gnu/lib"));
        }
        project
    }

    /// Get the path to the workspace directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the workspace
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the workspace
    pub fn create_dir(&self, name: &str) {
        std::fs::create_dir_all(self.dir.path().join(name)).expect("Failed to create directory");
    }

    /// Check if a file exists in the workspace
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the workspace
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Install a fake `cmake` at `tools/cmake`
    ///
    /// `script` entries are `step:target` (fail that step) or
    /// `hang:step:target` (block until killed), e.g. `"build:m33"`.
    #[cfg(unix)]
    pub fn fake_cmake(&self, script: &[&str]) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let fails = script
            .iter()
            .filter(|s| !s.starts_with("hang:"))
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let hangs = script
            .iter()
            .filter_map(|s| s.strip_prefix("hang:"))
            .collect::<Vec<_>>()
            .join(" ");

        let body = format!(
            r#"#!/bin/sh
log="$(dirname "$0")/cmake.log"
fails="{fails}"
hangs="{hangs}"
case "$1" in
  -S) step=configure; build="$4"; descriptor="$6" ;;
  --build) step=build; build="$2" ;;
  --install) step=install; build="$2"; prefix="$4" ;;
  *) echo "unexpected arguments: $*" >&2; exit 2 ;;
esac
target=$(basename "$build")
echo "$step $target" >> "$log"
for f in $fails; do
  if [ "$f" = "$step:$target" ]; then echo "$step failed for $target" >&2; exit 1; fi
done
for h in $hangs; do
  if [ "$h" = "$step:$target" ]; then exec sleep 30; fi
done
if [ "$step" = configure ] && [ ! -f "$descriptor" ]; then
  echo "missing descriptor $descriptor" >&2; exit 1
fi
if [ "$step" = install ]; then
  mkdir -p "$prefix/bin" && echo "$target" > "$prefix/bin/$target.elf"
fi
exit 0
"#
        );

        let path = self.dir.path().join("tools/cmake");
        self.create_file("tools/cmake", &body);
        let mut perms = std::fs::metadata(&path).expect("stat cmake").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod cmake");
        path
    }

    /// Lines the fake cmake logged, in call order
    pub fn cmake_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("tools/cmake.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Run the CLI inside this workspace
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_imx93-build"))
            .current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .env_remove("IMX93_WORKSPACE")
            .env_remove("IMX93_CMAKE")
            .args(args)
            .output()
            .expect("Failed to execute imx93-build")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample manifest exercising every section
pub const SAMPLE_MANIFEST: &str = r#"
[options]
build_m33 = false
build_type = "Debug"

[versions]
spdlog = "1.14.1"

[toolchains]
a55 = "cmake/toolchains/custom-a55.cmake"

[dependencies]
root = "deps"

[package]
strict_license = true
partial = false
"#;
