use clap::Parser;
use pipeline_helpers::config::ScriptConfig;
use pipeline_helpers::error::{self, GatherError};
use pipeline_helpers::gather::{self, ScriptOutcome};
use pipeline_helpers::logging;
use std::process::ExitCode;

/// Run a model test script in a pipeline task and log the metrics it prints.
///
/// Settings come from environment variables (PIPELINE_EXEC_DIR,
/// PIPELINE_STDOUT_PATH, PIPELINE_STDERR_PATH, MODEL_TEST_PATH,
/// PIPELINE_EXEC_FILE, PIPELINE_SCRIPT_LAUNCHER, PIPELINE_DEBUG).
#[derive(Parser, Debug)]
#[command(name = "gather-metrics", version, about)]
pub struct Cli {
    /// Print resolved settings and the command to run, don't run it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = ScriptConfig::from_env();
    logging::init(config.as_ref().is_ok_and(|c| c.debug));
    tracing::info!(
        "pipeline-helpers task: gather_metrics v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::debug!(?cli, "parsed CLI arguments");

    let config = match config {
        Ok(config) => config,
        Err(err) => return fail(GatherError::from(err)),
    };

    if cli.dry_run {
        return match dry_run(&config) {
            Ok(()) => ExitCode::from(error::SUCCESS as u8),
            Err(err) => fail(err),
        };
    }

    match gather::gather_from_script(&config).await {
        Ok(ScriptOutcome::Collected(_)) => ExitCode::from(error::SUCCESS as u8),
        // Already logged with the script's stderr; not a task failure.
        Ok(ScriptOutcome::ScriptFailed { .. }) => ExitCode::from(error::SUCCESS as u8),
        Err(err) => fail(err),
    }
}

fn dry_run(config: &ScriptConfig) -> error::Result<()> {
    let command = gather::script_command(config)?;
    println!(
        "{}",
        serde_json::to_string_pretty(config).unwrap_or_else(|e| format!("{config:?} ({e})"))
    );
    println!("command: {command}");
    Ok(())
}

fn fail(err: GatherError) -> ExitCode {
    tracing::error!("{err}");
    ExitCode::from(err.exit_code() as u8)
}
