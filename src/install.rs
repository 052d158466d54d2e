/// Runtime environment installation that precedes a test run.
use crate::command::CommandSpec;
use crate::error::{GatherError, Result};
use crate::session;
use std::path::Path;

/// Placeholder in the install command replaced by the environment name.
pub const RUNTIME_ENVIRONMENT_PLACEHOLDER: &str = "runtime_environment";

/// Install `runtime_environment` by running `install_command` in `cwd`.
///
/// A nonzero exit is an error carrying the captured stderr.
pub async fn install_runtime_environment(
    install_command: &CommandSpec,
    runtime_environment: &str,
    cwd: &Path,
) -> Result<()> {
    let command = install_command.substitute(RUNTIME_ENVIRONMENT_PLACEHOLDER, runtime_environment);
    tracing::info!(
        runtime_environment,
        args = ?command.argv(),
        "installing runtime environment"
    );

    let result = session::run_captured(&command, cwd).await?;
    if !result.success() {
        return Err(GatherError::Install {
            runtime_environment: runtime_environment.to_string(),
            exit_code: result.reported_exit_code(),
            stderr: result.stderr,
        });
    }

    tracing::debug!(stdout = %result.stdout, "install output");
    tracing::info!(runtime_environment, "runtime environment installed");
    Ok(())
}

/// Install the configured environment, if any.
pub async fn install_if_configured(
    install_command: &CommandSpec,
    runtime_environment: Option<&str>,
    cwd: &Path,
) -> Result<()> {
    match runtime_environment {
        Some(name) => install_runtime_environment(install_command, name, cwd).await,
        None => {
            tracing::debug!("no runtime environment configured, skipping installation");
            Ok(())
        }
    }
}
