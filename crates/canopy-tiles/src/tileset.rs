//! The public entry point: a streamed tileset driven once per frame.

use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::content::{ContentFactory, RenderSink};
use crate::error::{FetchError, TilesetError};
use crate::fetch::{Completion, CompletionReceiver, Fetcher, RequestKind, completion_channel};
use crate::frame::FrameState;
use crate::lifecycle::{ContentLoader, attach_hierarchy};
use crate::scheduler::RequestScheduler;
use crate::stats::{LoadProgress, Statistics, StatisticsPrinter};
use crate::tile::{Tile, TileId, TileTree};
use crate::traversal::Selector;

/// Default screen-space error budget in pixels.
pub const DEFAULT_MAXIMUM_SCREEN_SPACE_ERROR: f64 = 16.0;

/// Construction options for a [`Tileset`].
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetOptions {
    /// Location of the root hierarchy description.
    pub url: String,
    /// When `false`, `update` only observes completions.
    pub show: bool,
    /// Refinement threshold in pixels.
    pub maximum_screen_space_error: f64,
    /// Log the statistics line whenever it changes.
    pub debug_show_statistics: bool,
    /// Keep re-rendering the previous selection without traversing.
    pub debug_freeze_frame: bool,
}

impl TilesetOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            show: true,
            maximum_screen_space_error: DEFAULT_MAXIMUM_SCREEN_SPACE_ERROR,
            debug_show_statistics: false,
            debug_freeze_frame: false,
        }
    }
}

/// What the root hierarchy resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetMetadata {
    pub url: String,
    pub geometric_error: f64,
    pub properties: Map<String, Value>,
}

/// One-shot readiness signal. Every clone observes the same outcome.
#[derive(Debug, Clone, Default)]
pub struct ReadySignal {
    cell: Arc<OnceLock<Result<TilesetMetadata, TilesetError>>>,
}

impl ReadySignal {
    /// The outcome, once the root hierarchy has loaded or failed.
    pub fn try_get(&self) -> Option<&Result<TilesetMetadata, TilesetError>> {
        self.cell.get()
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    fn resolve(&self, outcome: Result<TilesetMetadata, TilesetError>) {
        if self.cell.set(outcome).is_err() {
            warn!("ready signal resolved twice");
        }
    }
}

/// A hierarchical level-of-detail tileset.
///
/// Call [`update`](Tileset::update) once per frame. Each call drains fetch
/// completions, advances processing tiles, selects the tiles to draw, hands
/// them to the render sink and finally fires deferred load-progress events.
pub struct Tileset {
    url: String,
    /// When `false`, `update` only observes completions.
    pub show: bool,
    pub maximum_screen_space_error: f64,
    pub debug_show_statistics: bool,
    pub debug_freeze_frame: bool,

    tree: TileTree,
    root: Option<TileId>,
    geometric_error: f64,
    properties: Map<String, Value>,
    loader: ContentLoader,
    completions: CompletionReceiver,
    selected: Vec<TileId>,
    stack: Vec<TileId>,
    epoch: u64,
    printer: StatisticsPrinter,
    ready: ReadySignal,
    destroyed: bool,
}

impl Tileset {
    /// Create a tileset and start fetching its root hierarchy.
    ///
    /// `scheduler` bounds concurrent content requests; share one between
    /// tilesets that draw from the same transport.
    pub fn new(
        options: TilesetOptions,
        fetcher: Box<dyn Fetcher>,
        factory: Box<dyn ContentFactory>,
        scheduler: Arc<RequestScheduler>,
    ) -> Self {
        let (sender, completions) = completion_channel();
        let loader = ContentLoader::new(scheduler, fetcher, factory, sender);
        loader.load_root(&options.url);

        Self {
            url: options.url,
            show: options.show,
            maximum_screen_space_error: options.maximum_screen_space_error,
            debug_show_statistics: options.debug_show_statistics,
            debug_freeze_frame: options.debug_freeze_frame,
            tree: TileTree::new(),
            root: None,
            geometric_error: 0.0,
            properties: Map::new(),
            loader,
            completions,
            selected: Vec::new(),
            stack: Vec::new(),
            epoch: 0,
            printer: StatisticsPrinter::default(),
            ready: ReadySignal::default(),
            destroyed: false,
        }
    }

    /// Location of the root hierarchy description.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the root hierarchy has loaded.
    pub fn is_ready(&self) -> bool {
        !self.destroyed && self.root.is_some()
    }

    /// Handle resolving when the root hierarchy loads or fails.
    pub fn ready_signal(&self) -> ReadySignal {
        self.ready.clone()
    }

    /// Metadata of the root description.
    pub fn properties(&self) -> Result<&Map<String, Value>, TilesetError> {
        self.check_ready()?;
        Ok(&self.properties)
    }

    /// Error of rendering nothing at all.
    pub fn geometric_error(&self) -> Result<f64, TilesetError> {
        self.check_ready()?;
        Ok(self.geometric_error)
    }

    fn check_ready(&self) -> Result<(), TilesetError> {
        if self.destroyed {
            Err(TilesetError::Destroyed)
        } else if self.root.is_none() {
            Err(TilesetError::NotReady)
        } else {
            Ok(())
        }
    }

    pub fn root(&self) -> Option<TileId> {
        self.root
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tree.get(id)
    }

    /// Tiles chosen by the last traversal.
    pub fn selected_tiles(&self) -> &[TileId] {
        &self.selected
    }

    pub fn statistics(&self) -> &Statistics {
        &self.loader.stats
    }

    /// Tiles currently in the processing queue.
    pub fn processing_tiles(&self) -> &[TileId] {
        self.loader.processing_queue()
    }

    /// Register a load-progress listener. Snapshots are delivered at the end of `update`.
    pub fn on_load_progress(&mut self, listener: impl FnMut(LoadProgress) + 'static) {
        if self.destroyed {
            return;
        }
        self.loader.progress.subscribe(Box::new(listener));
    }

    /// Apply every fetch completion received so far.
    pub fn poll_completions(&mut self) {
        if self.destroyed {
            return;
        }
        while let Ok(completion) = self.completions.try_recv() {
            self.apply_completion(completion);
        }
    }

    fn apply_completion(&mut self, completion: Completion) {
        let Completion { kind, url, result } = completion;
        match kind {
            RequestKind::Content(id) => self.loader.complete_content(&mut self.tree, id, &url, result),
            RequestKind::Hierarchy { parent: Some(pointer) } => {
                self.loader
                    .complete_nested_hierarchy(&mut self.tree, pointer, &url, result)
            }
            RequestKind::Hierarchy { parent: None } => self.complete_root(&url, result),
        }
    }

    fn complete_root(&mut self, url: &str, result: Result<Vec<u8>, FetchError>) {
        if self.root.is_some() || self.ready.is_resolved() {
            debug!(url, "ignoring duplicate root hierarchy");
            return;
        }
        match attach_hierarchy(&mut self.tree, url, result, None) {
            Ok(loaded) => {
                self.root = Some(loaded.root);
                self.geometric_error = loaded.geometric_error;
                self.properties = loaded.properties;
                info!(url, tiles = self.tree.len(), "tileset ready");
                self.ready.resolve(Ok(TilesetMetadata {
                    url: url.to_owned(),
                    geometric_error: self.geometric_error,
                    properties: self.properties.clone(),
                }));
            }
            Err(err) => {
                warn!(url, error = %err, "root hierarchy failed to load");
                self.ready.resolve(Err(TilesetError::RootLoad(Arc::new(err))));
            }
        }
    }

    /// Advance the tileset by one frame.
    ///
    /// Processing runs before traversal, which runs before the selection is
    /// handed to `sink`, which runs before deferred notifications fire. Pick
    /// passes leave streaming state alone: completions stay queued until the
    /// next render pass, and nothing is requested or processed.
    pub fn update(&mut self, frame: &FrameState, sink: &mut dyn RenderSink) {
        if self.destroyed {
            return;
        }
        if frame.allows_out_of_core() {
            self.poll_completions();
        }

        let Some(root) = self.root else {
            return;
        };
        if !self.show {
            return;
        }

        self.loader.stats.clear_frame();
        if frame.allows_out_of_core() {
            self.loader.process_queue(&mut self.tree, frame);
        }

        if !self.debug_freeze_frame {
            self.epoch += 1;
            Selector {
                tree: &mut self.tree,
                loader: &mut self.loader,
                frame,
                maximum_screen_space_error: self.maximum_screen_space_error,
                selected: &mut self.selected,
                stack: &mut self.stack,
                epoch: self.epoch,
            }
            .select(root, self.geometric_error);
        }

        let mut commands = 0;
        for &id in &self.selected {
            commands += sink.accept(id, self.tree[id].content(), frame);
        }
        let stats = &mut self.loader.stats;
        stats.selected = self.selected.len();
        stats.number_of_commands = commands;

        self.loader.progress.flush();

        if self.debug_show_statistics {
            self.printer.report(&self.loader.stats, frame.pass);
        }
    }

    /// Release tiles, queued work and listeners.
    ///
    /// Dropping in-flight tiles returns their request slots. Safe to call
    /// more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.tree = TileTree::new();
        self.root = None;
        self.selected.clear();
        self.stack.clear();
        self.properties.clear();
        self.loader.clear();
        debug!(url = %self.url, "tileset destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}
