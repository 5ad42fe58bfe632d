//! Console and file logging.

use std::path::Path;

use tracing_appender::rolling;
use tracing_subscriber::{
    fmt, prelude::*, registry::Registry, util::SubscriberInitExt, EnvFilter,
};

pub const LOG_ENV: &str = "DEVPATH_LOG";
const LOG_FILE: &str = "devpath.log";

/// Console output filtered by `DEVPATH_LOG` (default `warn`), plus an
/// `info`-level plain-text log in `log_dir`.
pub fn init_logging(log_dir: &Path) -> anyhow::Result<()> {
    let console_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(rolling::never(log_dir, LOG_FILE))
        .with_filter(EnvFilter::new("info"));

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
