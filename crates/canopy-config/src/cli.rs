//! Command-line argument parsing for the canopy viewer.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Canopy command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "canopy", about = "Streams a hierarchical tileset along a camera path")]
pub struct CliArgs {
    /// Root tileset description.
    #[arg(long)]
    pub tileset: Option<String>,

    /// Maximum screen-space error in pixels.
    #[arg(long)]
    pub max_sse: Option<f64>,

    /// Maximum concurrent content requests.
    #[arg(long)]
    pub max_requests: Option<usize>,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 120)]
    pub frames: u32,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log per-frame statistics.
    #[arg(long)]
    pub show_stats: bool,

    /// Freeze the selection after the first frame.
    #[arg(long)]
    pub freeze: bool,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref url) = args.tileset {
            self.tileset.url = url.clone();
        }
        if let Some(sse) = args.max_sse {
            self.tileset.maximum_screen_space_error = sse;
        }
        if let Some(requests) = args.max_requests {
            self.tileset.maximum_pending_requests = requests;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        // Flags only switch things on; the file decides otherwise.
        if args.show_stats {
            self.tileset.debug_show_statistics = true;
        }
        if args.freeze {
            self.tileset.debug_freeze_frame = true;
        }
    }
}
