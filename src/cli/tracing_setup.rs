//! Tracing subscriber setup
//!
//! Console events go to stderr so stdout stays free for the frame trace.

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log file name prefix inside `log_dir`
pub const LOG_FILE_PREFIX: &str = "xyeshark.log";

/// Pick the filter directive: `-v` wins, then `-q`, then the config level
pub fn filter_directive(config: &LoggingConfig, verbose: bool, quiet: bool) -> &str {
    if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        &config.level
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the computed level. When `log_dir` is set, events are
/// also written to a daily rolling file; keep the returned guard alive until
/// exit so buffered lines are flushed.
pub fn init_tracing(
    config: &LoggingConfig,
    verbose: bool,
    quiet: bool,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(config, verbose, quiet)))?;

    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(guard)
}
