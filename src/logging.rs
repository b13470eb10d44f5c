use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

pub const DEFAULT_DIRECTIVE: &str = "ferrite_cnn=info";

/// Installs the global subscriber. Log lines go to stderr so the report on
/// stdout stays clean. `RUST_LOG` takes precedence over `verbosity`
/// (0 = info, 1 = debug, 2+ = trace).
pub fn init(verbosity: u8) -> Result<()> {
    let directive = match verbosity {
        0 => DEFAULT_DIRECTIVE,
        1 => "ferrite_cnn=debug",
        _ => "ferrite_cnn=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("cannot install log subscriber: {}", e)))
}
