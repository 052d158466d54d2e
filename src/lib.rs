//! Pipeline task helpers: run a model's test script or test command and log
//! the JSON metrics it reports.
//!
//! Two executables share this library: `gather-metrics` (script variant) and
//! `gather-test-metrics` (test-runner variant). Both are configured entirely
//! through environment variables; see [`config`].

pub mod command;
pub mod config;
pub mod error;
pub mod gather;
pub mod install;
pub mod logging;
pub mod metrics;
pub mod session;
