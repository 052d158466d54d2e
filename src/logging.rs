use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Call once per process, before any logging.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` when
/// the debug flag is on.
pub fn init(debug: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_target(false)
        .with_thread_ids(false)
        .with_ansi(std::io::stdout().is_terminal())
        .init();
}

fn filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(debug)))
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}
