//! External process execution
//!
//! Runs native tool invocations to completion, capturing their diagnostic
//! output. A raised cancellation token terminates the in-flight process and,
//! on Unix, every process it spawned.

use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Process execution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessError {
    /// Program could not be started
    #[error("Failed to run '{program}': {error}")]
    Spawn { program: String, error: String },

    /// Cancellation signal raised before the process finished
    #[error("Process '{program}' was cancelled")]
    Cancelled { program: String },
}

/// Exit status and captured output of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    /// stdout followed by stderr
    pub diagnostics: String,
}

impl ToolOutput {
    /// Successful output with no diagnostics
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            diagnostics: String::new(),
        }
    }

    /// Failed output with the given diagnostics
    pub fn failed(code: i32, diagnostics: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            diagnostics: diagnostics.into(),
        }
    }
}

/// Run `command` until it exits or `cancel` fires
pub async fn run(mut command: Command, cancel: &CancellationToken) -> Result<ToolOutput, ProcessError> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    if cancel.is_cancelled() {
        return Err(ProcessError::Cancelled { program });
    }

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Own process group, so cancellation also reaches make/ninja/compilers.
    #[cfg(unix)]
    command.process_group(0);

    tracing::debug!("Running {:?}", command.as_std());
    let child = command.spawn().map_err(|e| ProcessError::Spawn {
        program: program.clone(),
        error: e.to_string(),
    })?;
    #[cfg(unix)]
    let pid = child.id();

    // Dropping the wait future drops the child, which kills it.
    tokio::select! {
        output = child.wait_with_output() => {
            let output = output.map_err(|e| ProcessError::Spawn {
                program: program.clone(),
                error: e.to_string(),
            })?;
            let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
            diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
            Ok(ToolOutput {
                success: output.status.success(),
                code: output.status.code(),
                diagnostics,
            })
        }
        () = cancel.cancelled() => {
            tracing::warn!("Terminating '{}' after cancellation", program);
            #[cfg(unix)]
            if let Some(pid) = pid {
                kill_process_group(pid).await;
            }
            Err(ProcessError::Cancelled { program })
        }
    }
}

/// SIGKILL every process in the group led by `pgid`
#[cfg(unix)]
async fn kill_process_group(pgid: u32) {
    let status = Command::new("kill")
        .arg("-KILL")
        .arg("--")
        .arg(format!("-{pgid}"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(s) if s.success() => {}
        Ok(s) => tracing::debug!("kill of process group {pgid} exited with {s}"),
        Err(e) => tracing::warn!("Failed to signal process group {pgid}: {e}"),
    }
}
