//! Tiles and the arena that owns them.
//!
//! Tiles live in a [`TileTree`] and refer to each other by [`TileId`]. The
//! tree only grows during a session: nested hierarchies append new tiles,
//! nothing is ever removed.

use std::fmt;
use std::ops::{Index, IndexMut};

use canopy_cull::{BoundingVolume, PlaneMask};

use crate::content::TileContent;
use crate::scheduler::RequestSlot;

/// Index of a tile in its [`TileTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub(crate) usize);

impl TileId {
    /// Position of the tile in creation order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile#{}", self.0)
    }
}

/// How a tile's children relate to its own content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refinement {
    /// Children add detail on top of the parent, which stays rendered.
    Add,
    /// Children supersede the parent; exactly one level is shown.
    Replace,
}

/// Lifecycle of a tile's content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentState {
    /// Never requested.
    Unloaded,
    /// Fetch in flight.
    Loading,
    /// Fetched, advancing through post-fetch processing.
    Processing,
    /// Renderable (or, for a hierarchy pointer, expanded).
    Ready,
    /// Fetch or processing failed. Terminal.
    Failed,
}

/// What a tile's content reference points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileKind {
    /// Structural tile without content.
    Empty,
    /// Renderable payload at a resolved URL.
    Content { url: String },
    /// Another hierarchy description to splice in below this tile.
    Hierarchy { url: String },
}

/// A node of the tile hierarchy.
pub struct Tile {
    geometric_error: f64,
    bounding_volume: BoundingVolume,
    content_bounding_volume: Option<BoundingVolume>,
    refinement: Refinement,
    kind: TileKind,
    parent: Option<TileId>,
    pub(crate) children: Vec<TileId>,
    nested_root: Option<TileId>,
    state: ContentState,
    content: Option<Box<dyn TileContent>>,
    slot: Option<RequestSlot>,
    children_without_content: usize,

    // Rewritten by every traversal.
    pub(crate) distance_to_camera: f64,
    pub(crate) parent_plane_mask: PlaneMask,
    pub(crate) selected_epoch: u64,
}

impl Tile {
    /// Create an unattached tile. Structural tiles start out ready.
    pub fn new(
        geometric_error: f64,
        bounding_volume: BoundingVolume,
        content_bounding_volume: Option<BoundingVolume>,
        refinement: Refinement,
        kind: TileKind,
        parent: Option<TileId>,
    ) -> Self {
        let state = match kind {
            TileKind::Empty => ContentState::Ready,
            TileKind::Content { .. } | TileKind::Hierarchy { .. } => ContentState::Unloaded,
        };
        Self {
            geometric_error,
            bounding_volume,
            content_bounding_volume,
            refinement,
            kind,
            parent,
            children: Vec::new(),
            nested_root: None,
            state,
            content: None,
            slot: None,
            children_without_content: 0,
            distance_to_camera: 0.0,
            parent_plane_mask: PlaneMask::INDETERMINATE,
            selected_epoch: 0,
        }
    }

    /// Geometric error of this tile; 0 for exact leaves.
    pub fn geometric_error(&self) -> f64 {
        self.geometric_error
    }

    /// Volume enclosing the tile and all its descendants.
    pub fn bounding_volume(&self) -> &BoundingVolume {
        &self.bounding_volume
    }

    /// Tighter volume around the tile's own content, if described.
    pub fn content_bounding_volume(&self) -> Option<&BoundingVolume> {
        self.content_bounding_volume.as_ref()
    }

    /// Refinement policy, fixed at construction.
    pub fn refinement(&self) -> Refinement {
        self.refinement
    }

    /// Content reference.
    pub fn kind(&self) -> &TileKind {
        &self.kind
    }

    /// Whether the content reference is another hierarchy description.
    pub fn has_nested_hierarchy(&self) -> bool {
        matches!(self.kind, TileKind::Hierarchy { .. })
    }

    /// Non-owning back-reference to the parent.
    pub fn parent(&self) -> Option<TileId> {
        self.parent
    }

    /// Children in current traversal order.
    pub fn children(&self) -> &[TileId] {
        &self.children
    }

    /// Root of the nested hierarchy once it has been loaded.
    pub fn nested_root(&self) -> Option<TileId> {
        self.nested_root
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ContentState {
        self.state
    }

    /// Decoded content while processing or ready.
    pub fn content(&self) -> Option<&dyn TileContent> {
        self.content.as_deref()
    }

    /// Number of direct children whose content is not ready yet. A pointer
    /// child counts until its nested root is ready.
    pub fn children_without_content(&self) -> usize {
        self.children_without_content
    }

    /// Distance to the viewpoint computed by the last traversal that reached this tile.
    pub fn distance_to_camera(&self) -> f64 {
        self.distance_to_camera
    }

    /// Whether the tile currently holds a scheduler slot.
    pub fn holds_request_slot(&self) -> bool {
        self.slot.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.state == ContentState::Ready
    }

    pub fn is_content_unloaded(&self) -> bool {
        self.state == ContentState::Unloaded
    }

    pub(crate) fn begin_loading(&mut self, slot: Option<RequestSlot>) {
        debug_assert_eq!(self.state, ContentState::Unloaded);
        self.state = ContentState::Loading;
        self.slot = slot;
    }

    pub(crate) fn begin_processing(&mut self, content: Box<dyn TileContent>) {
        debug_assert_eq!(self.state, ContentState::Loading);
        self.state = ContentState::Processing;
        self.content = Some(content);
    }

    pub(crate) fn content_mut(&mut self) -> Option<&mut (dyn TileContent + 'static)> {
        self.content.as_deref_mut()
    }

    fn finish(&mut self, state: ContentState) {
        debug_assert!(
            matches!(self.state, ContentState::Loading | ContentState::Processing),
            "{:?} cannot move to {:?}",
            self.state,
            state
        );
        self.state = state;
        self.slot = None;
        if state == ContentState::Failed {
            self.content = None;
        }
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("geometric_error", &self.geometric_error)
            .field("refinement", &self.refinement)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("children_without_content", &self.children_without_content)
            .finish_non_exhaustive()
    }
}

/// Arena owning every tile of a tileset, nested hierarchies included.
#[derive(Debug, Default)]
pub struct TileTree {
    tiles: Vec<Tile>,
}

impl TileTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns `true` if the tree holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Look up a tile.
    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.0)
    }

    /// Iterate over all tiles in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (TileId, &Tile)> {
        self.tiles.iter().enumerate().map(|(i, tile)| (TileId(i), tile))
    }

    /// Add a tile, linking it under its parent.
    ///
    /// A child that is not ready yet counts toward the parent's
    /// children-without-content.
    pub fn insert(&mut self, tile: Tile) -> TileId {
        let id = TileId(self.tiles.len());
        let parent = tile.parent;
        let ready = tile.is_ready();
        self.tiles.push(tile);

        if let Some(parent) = parent {
            let parent = &mut self.tiles[parent.0];
            parent.children.push(id);
            if !ready {
                parent.children_without_content += 1;
            }
        }
        id
    }

    /// Record `root` as the expansion of the hierarchy pointer `pointer`.
    pub(crate) fn set_nested_root(&mut self, pointer: TileId, root: TileId) {
        self.tiles[pointer.0].nested_root = Some(root);
    }

    /// Move a tile into `Ready`, releasing its request slot and telling the parent.
    ///
    /// A hierarchy pointer only has content once its nested root does, so
    /// its parent is told when that root becomes ready instead.
    pub(crate) fn mark_ready(&mut self, id: TileId) {
        self.tiles[id.0].finish(ContentState::Ready);
        if self.has_content(id) {
            self.propagate_content(id);
        }
    }

    /// Ready, and for a pointer, expanded into a ready nested root.
    fn has_content(&self, id: TileId) -> bool {
        let tile = &self.tiles[id.0];
        tile.is_ready()
            && (!tile.has_nested_hierarchy()
                || tile.nested_root.is_some_and(|root| self.has_content(root)))
    }

    /// `id` just gained content: count it off its parent, and keep going up
    /// while the parent is a pointer expanded into `id`.
    fn propagate_content(&mut self, mut id: TileId) {
        while let Some(parent_id) = self.tiles[id.0].parent {
            let parent = &mut self.tiles[parent_id.0];
            parent.children_without_content = parent.children_without_content.saturating_sub(1);
            if parent.nested_root != Some(id) || !parent.is_ready() {
                break;
            }
            id = parent_id;
        }
    }

    /// Move a tile into `Failed`, releasing its request slot.
    pub(crate) fn mark_failed(&mut self, id: TileId) {
        self.tiles[id.0].finish(ContentState::Failed);
    }
}

impl Index<TileId> for TileTree {
    type Output = Tile;

    fn index(&self, id: TileId) -> &Tile {
        &self.tiles[id.0]
    }
}

impl IndexMut<TileId> for TileTree {
    fn index_mut(&mut self, id: TileId) -> &mut Tile {
        &mut self.tiles[id.0]
    }
}
