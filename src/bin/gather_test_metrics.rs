use clap::Parser;
use pipeline_helpers::config::RunnerConfig;
use pipeline_helpers::error::{self, GatherError};
use pipeline_helpers::gather;
use pipeline_helpers::install::RUNTIME_ENVIRONMENT_PLACEHOLDER;
use pipeline_helpers::logging;
use std::process::ExitCode;

/// Install a runtime environment, run the model tests, and log the metrics
/// they report.
///
/// Settings come from environment variables (PIPELINE_EXEC_DIR,
/// PIPELINE_TEST_COMMAND, PIPELINE_METRICS_PATH, PIPELINE_RUNTIME_ENVIRONMENT,
/// PIPELINE_INSTALL_COMMAND, PIPELINE_DEBUG). Exits 1 on any failure.
#[derive(Parser, Debug)]
#[command(name = "gather-test-metrics", version, about)]
pub struct Cli {
    /// Print resolved settings and the commands to run, don't run them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = RunnerConfig::from_env();
    logging::init(config.as_ref().is_ok_and(|c| c.debug));
    tracing::info!(
        "pipeline-helpers task: gather_test_metrics v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::debug!(?cli, "parsed CLI arguments");

    let config = match config {
        Ok(config) => config,
        Err(err) => return fail(GatherError::from(err)),
    };

    if cli.dry_run {
        dry_run(&config);
        return ExitCode::from(error::SUCCESS as u8);
    }

    match gather::gather_from_runner(&config).await {
        Ok(_) => ExitCode::from(error::SUCCESS as u8),
        Err(err) => fail(err),
    }
}

fn dry_run(config: &RunnerConfig) {
    println!(
        "{}",
        serde_json::to_string_pretty(config).unwrap_or_else(|e| format!("{config:?} ({e})"))
    );
    if let Some(name) = &config.runtime_environment {
        let install = config
            .install_command
            .substitute(RUNTIME_ENVIRONMENT_PLACEHOLDER, name);
        println!("install: {install}");
    }
    println!("command: {}", config.test_command);
}

fn fail(err: GatherError) -> ExitCode {
    tracing::error!("{err}");
    ExitCode::from(err.exit_code() as u8)
}
