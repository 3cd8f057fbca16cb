// stderr logging for the CLI

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins, then `-v`, then the
/// settings file filter.
pub fn init(verbose: bool, configured: &str) {
    let fallback = if verbose { "debug" } else { configured };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
