//! Logging setup for the CLI binary.
//!
//! A compact `tracing` subscriber writing to stderr. The level comes from
//! the `RPACK_LOG` environment variable when set, else from the `--debug`
//! flag. Script `print` output arrives under the `rpack::script` target.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. Call once at process start.
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("RPACK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
