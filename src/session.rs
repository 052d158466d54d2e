/// Single child-process run: spawn the command in the exec dir, capture
/// stdout/stderr (to files or in memory), report exit code and duration.
use crate::command::CommandSpec;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

/// Result of a completed child process.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Process exit code (None if killed by signal).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock duration of the run.
    pub duration: Duration,
    /// Child PID (for logging/diagnostics).
    pub pid: u32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit code for reporting, `-1` when the child was killed by a signal.
    pub fn reported_exit_code(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }
}

/// Errors that can occur while running the child process.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Failed to create an output file.
    #[error("failed to create output file {}: {source}", path.display())]
    OutputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to spawn the subprocess.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed while waiting for the child or reading its output.
    #[error("I/O error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Spawn `spec` in `cwd` with stdout/stderr redirected to files, then read
/// both files back once the child exits.
pub async fn run_to_files(
    spec: &CommandSpec,
    cwd: &Path,
    stdout_path: &Path,
    stderr_path: &Path,
) -> Result<ExecutionResult, SessionError> {
    let stdout_file = create_output(stdout_path)?;
    let stderr_file = create_output(stderr_path)?;

    tracing::info!(
        command = %spec,
        cwd = %cwd.display(),
        stdout = %stdout_path.display(),
        stderr = %stderr_path.display(),
        "spawning child process"
    );

    let start = Instant::now();
    let mut child = Command::new(spec.program())
        .args(spec.args())
        .current_dir(cwd)
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file))
        .spawn()
        .map_err(|source| SessionError::Spawn {
            command: spec.to_string(),
            source,
        })?;

    let pid = child.id().unwrap_or(0);
    tracing::debug!(pid, "child process started");

    let status = child.wait().await.map_err(|source| SessionError::Io {
        command: spec.to_string(),
        source,
    })?;
    let duration = start.elapsed();

    let stdout = read_output(spec, stdout_path).await?;
    let stderr = read_output(spec, stderr_path).await?;

    let result = ExecutionResult {
        exit_code: status.code(),
        stdout,
        stderr,
        duration,
        pid,
    };
    log_completion(&result);
    Ok(result)
}

/// Spawn `spec` in `cwd` and capture stdout/stderr in memory.
pub async fn run_captured(spec: &CommandSpec, cwd: &Path) -> Result<ExecutionResult, SessionError> {
    tracing::info!(command = %spec, cwd = %cwd.display(), "spawning child process");

    let start = Instant::now();
    let child = Command::new(spec.program())
        .args(spec.args())
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SessionError::Spawn {
            command: spec.to_string(),
            source,
        })?;

    let pid = child.id().unwrap_or(0);
    tracing::debug!(pid, "child process started");

    let output = child
        .wait_with_output()
        .await
        .map_err(|source| SessionError::Io {
            command: spec.to_string(),
            source,
        })?;

    let result = ExecutionResult {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration: start.elapsed(),
        pid,
    };
    log_completion(&result);
    Ok(result)
}

fn create_output(path: &Path) -> Result<std::fs::File, SessionError> {
    std::fs::File::create(path).map_err(|source| SessionError::OutputFile {
        path: path.to_path_buf(),
        source,
    })
}

async fn read_output(spec: &CommandSpec, path: &Path) -> Result<String, SessionError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| SessionError::Io {
        command: spec.to_string(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn log_completion(result: &ExecutionResult) {
    tracing::info!(
        pid = result.pid,
        exit_code = ?result.exit_code,
        stdout_bytes = result.stdout.len(),
        stderr_bytes = result.stderr.len(),
        duration_ms = result.duration.as_millis() as u64,
        "child process completed"
    );
}
