//! The metrics gatherer: run one external command and log the metrics it
//! reports.
//!
//! Two flavours share the same steps. [`gather_from_script`] runs a test
//! script through a launcher, captures output to files, and tolerates both a
//! failing script and non-JSON output. [`gather_from_runner`] optionally
//! installs a runtime environment, runs a test command with in-memory capture,
//! and treats every failure as fatal.

use crate::command::CommandSpec;
use crate::config::{RunnerConfig, ScriptConfig};
use crate::error::{GatherError, Result};
use crate::install;
use crate::metrics::{self, CollectedMetrics, MetricsSource};
use crate::session;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// What happened when running the test script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    /// The script succeeded; its stdout was parsed (or kept raw).
    Collected(CollectedMetrics),
    /// The script exited nonzero; its output was not parsed.
    ScriptFailed { exit_code: Option<i32>, stderr: String },
}

/// Launcher followed by the script path.
///
/// A relative script path is resolved against the current directory, since
/// the child runs inside the exec dir.
pub fn script_command(config: &ScriptConfig) -> Result<CommandSpec> {
    let exec_file = std::path::absolute(&config.exec_file).map_err(|source| {
        GatherError::ScriptPath {
            path: config.exec_file.clone(),
            source,
        }
    })?;
    Ok(config
        .launcher
        .clone()
        .arg(exec_file.to_string_lossy().into_owned()))
}

/// Run the test script and collect the metrics it prints on stdout.
///
/// A script that exits nonzero is logged together with its stderr and
/// reported as [`ScriptOutcome::ScriptFailed`] rather than as an error.
pub async fn gather_from_script(config: &ScriptConfig) -> Result<ScriptOutcome> {
    let command = script_command(config)?;
    tracing::info!(args = ?command.argv(), "args to be used in process");

    let result = session::run_to_files(
        &command,
        &config.exec_dir,
        &config.stdout_path(),
        &config.stderr_path(),
    )
    .await?;

    if !result.success() {
        tracing::error!(
            exit_code = ?result.exit_code,
            "error running script: {}",
            result.stderr
        );
        return Ok(ScriptOutcome::ScriptFailed {
            exit_code: result.exit_code,
            stderr: result.stderr,
        });
    }

    let metrics = metrics::parse_lenient(&result.stdout);
    tracing::info!("metrics collected are {metrics}");
    Ok(ScriptOutcome::Collected(metrics))
}

/// Install the runtime environment (if configured), run the test command,
/// and return the decoded metrics.
pub async fn gather_from_runner(config: &RunnerConfig) -> Result<Value> {
    install::install_if_configured(
        &config.install_command,
        config.runtime_environment.as_deref(),
        &config.exec_dir,
    )
    .await?;

    if let MetricsSource::File(path) = &config.metrics_source {
        metrics::clear_file(&metrics_path(&config.exec_dir, path))?;
    }

    tracing::info!(args = ?config.test_command.argv(), "args to be used in process");
    let result = session::run_captured(&config.test_command, &config.exec_dir).await?;

    // The caller logs the error, which carries the captured stderr.
    if !result.success() {
        return Err(GatherError::CommandFailed {
            command: config.test_command.to_string(),
            exit_code: result.reported_exit_code(),
            stderr: result.stderr,
        });
    }

    let value = match &config.metrics_source {
        MetricsSource::Stdout => metrics::parse_strict(&result.stdout)?,
        MetricsSource::File(path) => {
            let path = metrics_path(&config.exec_dir, path);
            tracing::debug!(path = %path.display(), "loading metrics file");
            metrics::load_file(&path)?
        }
    };

    tracing::info!("metrics collected are {value}");
    Ok(value)
}

/// Metrics file location; relative paths live in the exec dir.
fn metrics_path(exec_dir: &Path, path: &Path) -> PathBuf {
    exec_dir.join(path)
}
