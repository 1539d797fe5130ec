//! Structured logging for canopy tools.
//!
//! Console output with uptime timestamps and targets, plus an optional JSON
//! log file for inspecting a streaming session afterwards. The level comes
//! from `RUST_LOG` when set, otherwise from the config's `debug.log_level`.
//! Records emitted through the `log` facade are forwarded as well.

use std::path::{Path, PathBuf};

use canopy_config::Config;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config name a level.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log written inside the log directory.
pub const LOG_FILE_NAME: &str = "canopy.log";

/// Install the global subscriber.
///
/// With `debug_build` and a `log_dir`, records are also written as JSON
/// lines to `log_dir/canopy.log`. Failing to create the file only disables
/// the file layer.
///
/// ```no_run
/// use canopy_config::Config;
/// use canopy_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_file_path(log_dir))
    {
        subscriber.with(json_layer(log_file)).init();
        return;
    }

    subscriber.init();
}

/// Directives for the config's log level, falling back to [`DEFAULT_FILTER`].
pub fn filter_directives(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.trim().to_string()
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// JSON-lines layer without ANSI codes, one object per event.
pub fn json_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_timer(fmt::time::uptime())
        .json()
}
