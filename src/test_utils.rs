//! Test utilities
//!
//! Generators for proptest plus a scripted native build tool that records
//! every invocation instead of spawning processes.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::infra::native_tool::{ConfigureInvocation, NativeBuildTool};
use crate::infra::process::{ProcessError, ToolOutput};

pub mod generators {
    use proptest::prelude::*;

    /// Any boolean option of the workspace schema
    pub fn boolean_option() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("with_fmt"),
            Just("build_a55"),
            Just("build_m33"),
            Just("shared"),
            Just("fPIC"),
        ]
    }

    /// A valid build type
    pub fn build_type() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("Debug"),
            Just("Release"),
            Just("RelWithDebInfo"),
            Just("MinSizeRel"),
        ]
    }

    /// A semver version string
    pub fn semver_version() -> impl Strategy<Value = String> {
        (0u64..30, 0u64..30, 0u64..30)
            .prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
    }
}

/// Seed the dependency prefixes the application core needs under `<root>/deps`
pub fn seed_dependencies(root: &Path) {
    for (name, version) in [("fmt", "10.2.1"), ("spdlog", "1.14.1")] {
        let prefix = root.join("deps").join(name).join(version).join("aarch64-linux-gnu");
        std::fs::create_dir_all(prefix.join("include")).unwrap();
        std::fs::create_dir_all(prefix.join("lib")).unwrap();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Step {
    Configure,
    Build,
    Install,
}

/// Native build tool double driven by a script of per-target failures
#[derive(Debug, Default)]
pub struct ScriptedTool {
    calls: Mutex<Vec<String>>,
    failures: BTreeMap<(Step, String), String>,
    hangs: Vec<String>,
}

impl ScriptedTool {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fail_configure(mut self, target: &str, diagnostics: &str) -> Self {
        self.failures
            .insert((Step::Configure, target.to_string()), diagnostics.to_string());
        self
    }

    #[must_use]
    pub fn fail_build(mut self, target: &str, diagnostics: &str) -> Self {
        self.failures
            .insert((Step::Build, target.to_string()), diagnostics.to_string());
        self
    }

    #[must_use]
    pub fn fail_install(mut self, target: &str, diagnostics: &str) -> Self {
        self.failures
            .insert((Step::Install, target.to_string()), diagnostics.to_string());
        self
    }

    /// Build step for `target` blocks until cancelled
    #[must_use]
    pub fn hang_build(mut self, target: &str) -> Self {
        self.hangs.push(target.to_string());
        self
    }

    /// Recorded invocations, e.g. `"configure a55"`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, step: Step, target: &str) -> ToolOutput {
        let verb = match step {
            Step::Configure => "configure",
            Step::Build => "build",
            Step::Install => "install",
        };
        self.calls.lock().unwrap().push(format!("{verb} {target}"));
        match self.failures.get(&(step, target.to_string())) {
            Some(diagnostics) => ToolOutput::failed(1, diagnostics.clone()),
            None => ToolOutput::ok(),
        }
    }
}

fn target_of(build_dir: &Path) -> String {
    build_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl NativeBuildTool for ScriptedTool {
    async fn configure(
        &self,
        invocation: &ConfigureInvocation,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ProcessError> {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled {
                program: "scripted".to_string(),
            });
        }
        Ok(self.record(Step::Configure, invocation.target.id()))
    }

    async fn build(
        &self,
        build_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ProcessError> {
        let target = target_of(build_dir);
        if self.hangs.contains(&target) {
            cancel.cancelled().await;
        }
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled {
                program: "scripted".to_string(),
            });
        }
        Ok(self.record(Step::Build, &target))
    }

    async fn install(
        &self,
        build_dir: &Path,
        package_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ProcessError> {
        if cancel.is_cancelled() {
            return Err(ProcessError::Cancelled {
                program: "scripted".to_string(),
            });
        }
        let target = target_of(build_dir);
        let output = self.record(Step::Install, &target);
        if output.success {
            let binary = package_dir.join("bin").join(format!("{target}.elf"));
            std::fs::create_dir_all(package_dir.join("bin")).unwrap();
            std::fs::write(binary, target.as_bytes()).unwrap();
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_scripted_tool_records_and_fails() {
        let tool = ScriptedTool::new().fail_build("m33", "boom");
        let token = CancellationToken::new();
        let ok = tool.build(Path::new("/ws/build/a55"), &token).await.unwrap();
        let bad = tool.build(Path::new("/ws/build/m33"), &token).await.unwrap();
        assert!(ok.success);
        assert!(!bad.success);
        assert_eq!(bad.diagnostics, "boom");
        assert_eq!(tool.calls(), vec!["build a55", "build m33"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_build_type_generator_is_nonempty(bt in build_type()) {
            prop_assert!(!bt.is_empty());
        }
    }
}
