//! Headless viewer that streams a tileset from disk while a camera flies toward it.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p canopy-viewer -- --tileset data/city/tileset.json --show-stats`.

mod content;
mod flight;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use canopy_config::{CliArgs, Config, default_config_dir};
use clap::Parser;
use tracing::{error, info};

use crate::session::{READY_TIMEOUT, SessionOptions, run_session};

/// Roughly 60 frames per second.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| PathBuf::from(".canopy"));

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    canopy_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let options = SessionOptions {
        frames: args.frames,
        frame_interval: FRAME_INTERVAL,
        ready_timeout: READY_TIMEOUT,
    };

    match run_session(&config, options) {
        Ok(summary) => {
            info!(
                url = %summary.metadata.url,
                geometric_error = summary.metadata.geometric_error,
                frames = summary.frames,
                peak_selected = summary.peak_selected,
                total_commands = summary.total_commands,
                "{}",
                summary.last_statistics
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
