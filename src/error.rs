//! Error type shared by both pipeline tasks.
//!
//! Every variant is fatal for the run and maps to an exit code.

use crate::config::ConfigError;
use crate::metrics::MetricsError;
use crate::session::SessionError;
use std::path::PathBuf;
use thiserror::Error;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Any failure that aborts the run.
pub const FAILURE: i32 = 1;

#[derive(Error, Debug)]
pub enum GatherError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The command could not be resolved before spawning.
    #[error("failed to resolve script path {}: {source}", path.display())]
    ScriptPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("installing runtime environment {runtime_environment} failed with exit code {exit_code}: {stderr}")]
    Install {
        runtime_environment: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("`{command}` failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl GatherError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            GatherError::Config(_)
            | GatherError::Session(_)
            | GatherError::ScriptPath { .. }
            | GatherError::Install { .. }
            | GatherError::CommandFailed { .. }
            | GatherError::Metrics(_) => FAILURE,
        }
    }
}

/// Result type alias for gather operations.
pub type Result<T> = std::result::Result<T, GatherError>;
