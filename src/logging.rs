//! Tracing setup for the binaries
//!
//! The filter comes from `STOWAWAY_LOG` when set, otherwise `info`, or
//! `debug` when the caller asks for verbose output. Logs go to stderr so
//! stdout stays free for reports and listings.

use std::env;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a tracing filter directive
pub const LOG_ENV: &str = "STOWAWAY_LOG";

/// Install the global subscriber; later calls are ignored
pub fn init_logger(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| default.to_string());
    let filter_layer = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter_layer)
        .try_init();
}
