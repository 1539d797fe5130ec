//! One streaming session: load a tileset from disk and fly toward it.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use canopy_config::{Config, ConfigError};
use canopy_cull::Perspective;
use canopy_tiles::{
    FileTransport, FrameState, Pass, RequestScheduler, Statistics, ThreadedFetcher, Tileset,
    TilesetError, TilesetMetadata, TilesetOptions,
};
use glam::DVec3;
use tracing::{debug, info};

use crate::content::{CountingSink, PayloadFactory};
use crate::flight::FlightPath;

/// How long to wait for the root hierarchy before giving up.
pub const READY_TIMEOUT: Duration = Duration::from_secs(10);

const READY_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to start fetch workers: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("tileset failed: {0}")]
    Tileset(#[from] TilesetError),

    #[error("tileset was not ready after {0:?}")]
    Timeout(Duration),
}

/// Frame count and pacing for [`run_session`].
#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    pub frames: u32,
    pub frame_interval: Duration,
    pub ready_timeout: Duration,
}

/// What a finished session observed.
#[derive(Clone, Debug)]
pub struct SessionSummary {
    pub metadata: TilesetMetadata,
    pub frames: u32,
    /// Largest selection seen in any frame.
    pub peak_selected: usize,
    /// Draw commands issued over the whole flight.
    pub total_commands: usize,
    pub last_statistics: Statistics,
}

/// Splits `data/city/tileset.json` into the transport root and the root URL.
pub fn split_tileset_location(location: &str) -> (&Path, String) {
    let path = Path::new(location);
    let root = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let url = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| location.to_owned());
    (root, url)
}

pub fn tileset_options(config: &Config, url: String) -> TilesetOptions {
    let tileset = &config.tileset;
    TilesetOptions {
        url,
        show: tileset.show,
        maximum_screen_space_error: tileset.maximum_screen_space_error,
        debug_show_statistics: tileset.debug_show_statistics,
        debug_freeze_frame: tileset.debug_freeze_frame,
    }
}

/// Stream the configured tileset while the camera approaches its root.
pub fn run_session(config: &Config, options: SessionOptions) -> Result<SessionSummary, SessionError> {
    config.validate()?;

    let (data_root, url) = split_tileset_location(&config.tileset.url);
    info!(root = %data_root.display(), url = %url, "opening tileset");

    let transport = Arc::new(FileTransport::new(data_root));
    let fetcher = ThreadedFetcher::new(
        transport,
        config.fetch.worker_threads,
        config.fetch.queue_capacity,
    )
    .map_err(SessionError::Spawn)?;
    let scheduler = RequestScheduler::new(config.tileset.maximum_pending_requests);

    let mut tileset = Tileset::new(
        tileset_options(config, url),
        Box::new(fetcher),
        Box::new(PayloadFactory),
        scheduler,
    );
    tileset.on_load_progress(|progress| {
        debug!(
            pending = progress.pending_requests,
            processing = progress.processing,
            "load progress"
        );
    });

    let metadata = wait_until_ready(&mut tileset, options.ready_timeout)?;

    let target = tileset
        .root()
        .and_then(|root| tileset.tile(root))
        .map(|tile| tile.bounding_volume().center())
        .unwrap_or(DVec3::ZERO);

    let view = &config.view;
    let perspective = Perspective::new(
        view.fov_y_degrees.to_radians(),
        view.aspect_ratio(),
        view.near,
        view.far,
    );
    let viewport_height = f64::from(view.viewport_height);
    let path = FlightPath::toward(
        target,
        metadata.geometric_error,
        viewport_height,
        perspective.sse_denominator(),
        config.tileset.maximum_screen_space_error,
        view.near,
        options.frames,
    );

    let mut sink = CountingSink::default();
    let mut peak_selected = 0;
    let mut total_commands = 0;

    for frame_index in 0..options.frames {
        let frame = FrameState::from_perspective(
            &perspective,
            path.position_at(frame_index),
            path.direction(),
            path.up(),
            viewport_height,
            Pass::Render,
        );
        sink.reset();
        tileset.update(&frame, &mut sink);

        let stats = tileset.statistics();
        peak_selected = peak_selected.max(stats.selected);
        total_commands += sink.commands;
        debug!(
            frame = frame_index,
            distance = path.distance_at(frame_index),
            %stats,
            "frame"
        );

        if !options.frame_interval.is_zero() {
            std::thread::sleep(options.frame_interval);
        }
    }

    let last_statistics = *tileset.statistics();
    tileset.destroy();

    info!(
        frames = options.frames,
        peak_selected,
        total_commands,
        "session finished"
    );

    Ok(SessionSummary {
        metadata,
        frames: options.frames,
        peak_selected,
        total_commands,
        last_statistics,
    })
}

/// Drain completions until the readiness signal resolves.
fn wait_until_ready(
    tileset: &mut Tileset,
    timeout: Duration,
) -> Result<TilesetMetadata, SessionError> {
    let ready = tileset.ready_signal();
    let started = Instant::now();
    loop {
        tileset.poll_completions();
        if let Some(outcome) = ready.try_get() {
            return outcome.clone().map_err(SessionError::from);
        }
        if started.elapsed() >= timeout {
            return Err(SessionError::Timeout(timeout));
        }
        std::thread::sleep(READY_POLL_INTERVAL);
    }
}
