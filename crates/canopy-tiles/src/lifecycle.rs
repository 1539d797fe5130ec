//! Content streaming: request admission, fetch completion and the
//! processing queue that moves tiles towards `Ready`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::content::{ContentFactory, ProcessingStatus};
use crate::description::TilesetDescription;
use crate::error::{FetchError, LoadError};
use crate::fetch::{CompletionSender, FetchResponder, Fetcher, RequestKind};
use crate::frame::FrameState;
use crate::hierarchy::{LoadedHierarchy, build_hierarchy};
use crate::scheduler::RequestScheduler;
use crate::stats::{ProgressEvents, Statistics};
use crate::tile::{ContentState, TileId, TileKind, TileTree};

/// Drives tiles through `Unloaded → Loading → Processing → Ready | Failed`.
pub(crate) struct ContentLoader {
    scheduler: Arc<RequestScheduler>,
    fetcher: Box<dyn Fetcher>,
    factory: Box<dyn ContentFactory>,
    completions: CompletionSender,
    processing: Vec<TileId>,
    pub(crate) stats: Statistics,
    pub(crate) progress: ProgressEvents,
}

impl ContentLoader {
    pub(crate) fn new(
        scheduler: Arc<RequestScheduler>,
        fetcher: Box<dyn Fetcher>,
        factory: Box<dyn ContentFactory>,
        completions: CompletionSender,
    ) -> Self {
        Self {
            scheduler,
            fetcher,
            factory,
            completions,
            processing: Vec::new(),
            stats: Statistics::default(),
            progress: ProgressEvents::default(),
        }
    }

    pub(crate) fn has_capacity(&self) -> bool {
        self.scheduler.has_capacity()
    }

    pub(crate) fn processing_queue(&self) -> &[TileId] {
        &self.processing
    }

    fn notify(&mut self) {
        self.progress.enqueue(self.stats.progress());
    }

    /// Fetch the top-level hierarchy description.
    pub(crate) fn load_root(&self, url: &str) {
        debug!(url, "loading root hierarchy");
        self.fetch(url, RequestKind::Hierarchy { parent: None });
    }

    fn fetch(&self, url: &str, kind: RequestKind) {
        let responder = FetchResponder::new(self.completions.clone(), kind, url.to_owned());
        self.fetcher.fetch(url, responder);
    }

    /// Request an unloaded tile's content.
    ///
    /// Renderable content needs a scheduler slot and is skipped when none is
    /// free. Hierarchy pointers load their description instead. Returns
    /// `true` if the tile left `Unloaded`.
    pub(crate) fn request_content(&mut self, tree: &mut TileTree, id: TileId) -> bool {
        if !tree[id].is_content_unloaded() {
            return false;
        }
        let url = match tree[id].kind() {
            TileKind::Content { url } => url.clone(),
            TileKind::Hierarchy { .. } => return self.load_hierarchy(tree, id),
            TileKind::Empty => return false,
        };

        let Some(slot) = self.scheduler.try_admit() else {
            return false;
        };
        tree[id].begin_loading(Some(slot));
        self.stats.number_of_pending_requests += 1;
        self.notify();

        debug!(tile = %id, url = %url, pending = self.scheduler.pending(), "requesting content");
        self.fetch(&url, RequestKind::Content(id));
        true
    }

    /// Start loading the hierarchy a pointer tile refers to.
    pub(crate) fn load_hierarchy(&mut self, tree: &mut TileTree, id: TileId) -> bool {
        let tile = &mut tree[id];
        let TileKind::Hierarchy { url } = tile.kind() else {
            return false;
        };
        if !tile.is_content_unloaded() {
            return false;
        }
        let url = url.clone();
        tile.begin_loading(None);

        debug!(tile = %id, url = %url, "loading nested hierarchy");
        self.fetch(&url, RequestKind::Hierarchy { parent: Some(id) });
        true
    }

    /// Handle the fetch outcome of a tile's renderable content.
    pub(crate) fn complete_content(
        &mut self,
        tree: &mut TileTree,
        id: TileId,
        url: &str,
        result: Result<Vec<u8>, FetchError>,
    ) {
        if tree.get(id).map(|t| t.state()) != Some(ContentState::Loading) {
            debug!(tile = %id, url, "ignoring completion for tile that is not loading");
            return;
        }
        self.stats.number_of_pending_requests = self.stats.number_of_pending_requests.saturating_sub(1);

        let created = result
            .map_err(|e| e.to_string())
            .and_then(|bytes| self.factory.create(url, bytes).map_err(|e| e.to_string()));
        match created {
            Ok(content) => {
                tree[id].begin_processing(content);
                self.processing.push(id);
                self.stats.number_processing += 1;
            }
            Err(reason) => {
                warn!(tile = %id, url, %reason, "content request failed");
                tree.mark_failed(id);
            }
        }
        self.notify();
    }

    /// Attach a fetched nested hierarchy below its pointer tile.
    ///
    /// Failure is local to the pointer tile, which becomes `Failed`.
    pub(crate) fn complete_nested_hierarchy(
        &mut self,
        tree: &mut TileTree,
        pointer: TileId,
        url: &str,
        result: Result<Vec<u8>, FetchError>,
    ) {
        if tree.get(pointer).map(|t| t.state()) != Some(ContentState::Loading) {
            debug!(tile = %pointer, url, "ignoring hierarchy for tile that is not loading");
            return;
        }
        match attach_hierarchy(tree, url, result, Some(pointer)) {
            Ok(loaded) => {
                tree.set_nested_root(pointer, loaded.root);
                tree.mark_ready(pointer);
                debug!(tile = %pointer, url, root = %loaded.root, "nested hierarchy attached");
            }
            Err(err) => {
                warn!(tile = %pointer, url, error = %err, "nested hierarchy failed to load");
                tree.mark_failed(pointer);
            }
        }
    }

    /// Advance every processing tile by one step.
    ///
    /// Walks the queue backwards so finished tiles can be removed in place.
    pub(crate) fn process_queue(&mut self, tree: &mut TileTree, frame: &FrameState) {
        for index in (0..self.processing.len()).rev() {
            let id = self.processing[index];
            let status = match tree[id].content_mut() {
                Some(content) => content.process(frame),
                None => ProcessingStatus::Failed("processing tile has no content".to_owned()),
            };
            match status {
                ProcessingStatus::Pending => continue,
                ProcessingStatus::Ready => {
                    tree.mark_ready(id);
                    debug!(tile = %id, "content ready");
                }
                ProcessingStatus::Failed(reason) => {
                    warn!(tile = %id, %reason, "content processing failed");
                    tree.mark_failed(id);
                }
            }
            self.processing.remove(index);
            self.stats.number_processing = self.stats.number_processing.saturating_sub(1);
            self.notify();
        }
    }

    /// Forget queued work, counters, listeners and snapshots.
    pub(crate) fn clear(&mut self) {
        self.processing.clear();
        self.progress.clear();
        self.stats = Statistics::default();
    }
}

/// Parse a fetched description and insert its tiles.
pub(crate) fn attach_hierarchy(
    tree: &mut TileTree,
    url: &str,
    result: Result<Vec<u8>, FetchError>,
    attach_to: Option<TileId>,
) -> Result<LoadedHierarchy, LoadError> {
    let bytes = result?;
    let description = TilesetDescription::from_slice(&bytes)?;
    Ok(build_hierarchy(tree, description, url, attach_to)?)
}
