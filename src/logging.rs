//! Tracing subscriber bootstrap for the binaries.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Installs a stderr subscriber. `RUST_LOG` takes precedence over the default level, which
/// is `debug` for trellis when `verbose` and `info` otherwise.
pub fn setup_logging(verbose: bool) {
    let default = if verbose { "trellis=debug,info" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .try_init()
        .ok();
}
