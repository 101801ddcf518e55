//! Tracing setup for the command-line tool.

use color_eyre::eyre::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding a tracing filter, e.g. `reconcile_ops=debug`.
pub const LOG_ENV: &str = "RECONCILE_LOG";

/// Install a stderr subscriber.
///
/// The filter comes from `RECONCILE_LOG` when set, otherwise from the number
/// of `-v` flags.
pub fn init(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter_layer = EnvFilter::try_from_env(LOG_ENV).or_else(|_| EnvFilter::try_new(level))?;
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
