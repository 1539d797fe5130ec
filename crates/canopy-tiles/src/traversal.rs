//! Per-frame tile selection.
//!
//! The tree is walked depth-first with an explicit stack. Children are pushed
//! farthest-first so the nearest one is explored next. Each visited tile is
//! culled against the frustum, its screen-space error is compared with the
//! budget, and it is either selected, refined to its children or used as a
//! stand-in while those children stream in.

use std::cmp::Ordering;
use std::mem;

use canopy_cull::{Intersection, PlaneMask};

use crate::frame::FrameState;
use crate::lifecycle::ContentLoader;
use crate::sse::screen_space_error;
use crate::tile::{ContentState, Refinement, TileId, TileTree};

/// Mutable state borrowed for one selection pass.
pub(crate) struct Selector<'a> {
    pub(crate) tree: &'a mut TileTree,
    pub(crate) loader: &'a mut ContentLoader,
    pub(crate) frame: &'a FrameState,
    pub(crate) maximum_screen_space_error: f64,
    pub(crate) selected: &'a mut Vec<TileId>,
    /// Scratch stack reused across frames.
    pub(crate) stack: &'a mut Vec<TileId>,
    /// Identifies this pass; a tile whose `selected_epoch` matches is already selected.
    pub(crate) epoch: u64,
}

impl Selector<'_> {
    fn out_of_core(&self) -> bool {
        self.frame.allows_out_of_core()
    }

    fn distance(&self, id: TileId) -> f64 {
        self.tree[id]
            .bounding_volume()
            .distance_to(self.frame.camera_position)
    }

    fn sse(&self, geometric_error: f64, id: TileId) -> f64 {
        screen_space_error(
            geometric_error,
            self.tree[id].distance_to_camera,
            self.frame.viewport_height,
            self.frame.sse_denominator,
        )
    }

    fn plane_mask(&self, id: TileId) -> PlaneMask {
        let tile = &self.tree[id];
        self.frame
            .culling_volume
            .visibility_with_plane_mask(tile.bounding_volume(), tile.parent_plane_mask)
    }

    /// Rebuild the selection starting at `root`.
    ///
    /// `tileset_geometric_error` is the error of drawing nothing at all.
    pub(crate) fn select(&mut self, root: TileId, tileset_geometric_error: f64) {
        self.selected.clear();
        self.stack.clear();

        let distance = self.distance(root);
        let tile = &mut self.tree[root];
        tile.distance_to_camera = distance;
        tile.parent_plane_mask = PlaneMask::INDETERMINATE;

        if self.sse(tileset_geometric_error, root) <= self.maximum_screen_space_error {
            return;
        }

        if self.tree[root].is_content_unloaded() {
            if self.tree[root].has_nested_hierarchy() {
                self.select_nested(root, false, true);
            } else if self.out_of_core() {
                self.loader.request_content(self.tree, root);
            }
            return;
        }

        self.stack.push(root);
        while let Some(id) = self.stack.pop() {
            self.loader.stats.visited += 1;

            let plane_mask = self.plane_mask(id);
            if plane_mask == PlaneMask::OUTSIDE {
                continue;
            }
            let fully_visible = plane_mask == PlaneMask::INSIDE;
            let geometric_error = self.tree[id].geometric_error();
            let sse = self.sse(geometric_error, id);

            match self.tree[id].refinement() {
                Refinement::Add => self.refine_additive(id, plane_mask, fully_visible, sse),
                Refinement::Replace => self.refine_replace(id, plane_mask, fully_visible, sse),
            }
        }
    }

    /// Additive tiles render regardless of their error; children add detail on top.
    fn refine_additive(&mut self, id: TileId, plane_mask: PlaneMask, fully_visible: bool, sse: f64) {
        let max = self.maximum_screen_space_error;
        if !self.tree[id].has_nested_hierarchy() {
            self.select_tile(id, fully_visible);
        } else if sse <= max {
            self.select_nested(id, fully_visible, false);
        }

        if sse <= max {
            return;
        }

        let tile = &self.tree[id];
        let any_children_loaded = tile.children_without_content() < tile.children().len();
        if !any_children_loaded && !self.loader.has_capacity() {
            return;
        }

        let geometric_error = tile.geometric_error();
        self.sort_children(id);
        for index in 0..self.tree[id].children.len() {
            let child = self.tree[id].children[index];
            self.tree[child].parent_plane_mask = plane_mask;

            // Parent error with the child's distance: does the child need to exist at all?
            if self.sse(geometric_error, child) <= max {
                continue;
            }
            let visible = self.plane_mask(child) != PlaneMask::OUTSIDE;
            if self.tree[child].is_content_unloaded() && visible && self.out_of_core() {
                self.loader.request_content(self.tree, child);
            } else {
                self.stack.push(child);
            }
        }
    }

    /// Replace tiles show either themselves or their children, never both.
    fn refine_replace(&mut self, id: TileId, plane_mask: PlaneMask, fully_visible: bool, sse: f64) {
        let tile = &self.tree[id];
        if sse <= self.maximum_screen_space_error || tile.children().is_empty() {
            self.select_self(id, fully_visible);
            return;
        }

        let all_children_loaded = tile.children_without_content() == 0;
        if all_children_loaded || self.loader.has_capacity() {
            self.sort_children(id);
        }
        let child_count = self.tree[id].children.len();

        if !all_children_loaded {
            // Best available detail until the children arrive.
            self.select_self(id, fully_visible);
            if self.out_of_core() {
                for index in (0..child_count).rev() {
                    if !self.loader.has_capacity() {
                        break;
                    }
                    let child = self.tree[id].children[index];
                    self.request_missing_content(child);
                }
            }
            return;
        }

        for index in 0..child_count {
            let child = self.tree[id].children[index];
            self.tree[child].parent_plane_mask = plane_mask;
            self.stack.push(child);
        }
    }

    /// Request what keeps `child` from having content: its own payload or
    /// hierarchy, or the root of the hierarchy it already expanded into.
    fn request_missing_content(&mut self, child: TileId) {
        let mut id = child;
        while self.tree[id].is_ready()
            && let Some(root) = self.tree[id].nested_root()
        {
            id = root;
        }
        if self.tree[id].is_content_unloaded() {
            self.loader.request_content(self.tree, id);
        }
    }

    fn select_self(&mut self, id: TileId, fully_visible: bool) {
        if self.tree[id].has_nested_hierarchy() {
            self.select_nested(id, fully_visible, true);
        } else {
            self.select_tile(id, fully_visible);
        }
    }

    /// Update child distances and sort them farthest-first, nearest last.
    ///
    /// Equal distances fall back to tile order so the pass is deterministic.
    fn sort_children(&mut self, id: TileId) {
        let mut children = mem::take(&mut self.tree[id].children);
        for &child in &children {
            let distance = self.distance(child);
            self.tree[child].distance_to_camera = distance;
        }
        children.sort_by(|&a, &b| farthest_first(self.tree, a, b));
        self.tree[id].children = children;
    }

    /// Handle a tile whose content is another hierarchy.
    ///
    /// Once the nested root exists it stands in for the pointer tile:
    /// pointer roots are followed, an unloaded root is requested and a ready
    /// one is selected. Until then the hierarchy is loaded and, when
    /// `replace` is set, the pointer's parent is selected to avoid a gap.
    fn select_nested(&mut self, pointer: TileId, fully_visible: bool, replace: bool) {
        let mut pointer = pointer;
        while let Some(root) = self.tree[pointer].nested_root() {
            if self.tree[root].has_nested_hierarchy() {
                pointer = root;
                continue;
            }
            match self.tree[root].state() {
                ContentState::Ready => self.select_tile(root, fully_visible),
                ContentState::Unloaded => {
                    if self.out_of_core() {
                        self.loader.request_content(self.tree, root);
                    }
                    if replace {
                        self.select_stand_in(pointer, fully_visible);
                    }
                }
                ContentState::Loading | ContentState::Processing => {
                    if replace {
                        self.select_stand_in(pointer, fully_visible);
                    }
                }
                ContentState::Failed => {}
            }
            return;
        }

        if replace {
            self.select_stand_in(pointer, fully_visible);
        }
        if self.out_of_core() {
            self.loader.load_hierarchy(self.tree, pointer);
        }
    }

    fn select_stand_in(&mut self, pointer: TileId, fully_visible: bool) {
        if let Some(parent) = self.tree[pointer].parent() {
            self.select_tile(parent, fully_visible);
        }
    }

    /// Append a ready tile whose content is in view.
    fn select_tile(&mut self, id: TileId, fully_visible: bool) {
        let tile = &self.tree[id];
        if !tile.is_ready() || tile.selected_epoch == self.epoch {
            return;
        }
        let visible = fully_visible
            || tile.content_bounding_volume().is_none_or(|volume| {
                self.frame.culling_volume.visibility(volume) != Intersection::Outside
            });
        if visible {
            self.tree[id].selected_epoch = self.epoch;
            self.selected.push(id);
        }
    }
}

fn farthest_first(tree: &TileTree, a: TileId, b: TileId) -> Ordering {
    tree[b]
        .distance_to_camera
        .total_cmp(&tree[a].distance_to_camera)
        .then(b.cmp(&a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::attach_hierarchy;
    use crate::scheduler::RequestScheduler;
    use crate::test_support::{
        CLOSE, CountingFactory, FAR, ManualFetcher, TWO_LEVEL, frame_at, make_ready, pick_frame_at,
    };
    use crate::error::FetchError;
    use crate::fetch::completion_channel;
    use canopy_cull::{CullingVolume, Plane};
    use glam::DVec3;
    use std::sync::Arc;

    struct World {
        tree: TileTree,
        loader: ContentLoader,
        fetcher: ManualFetcher,
        scheduler: Arc<RequestScheduler>,
        root: TileId,
        geometric_error: f64,
        selected: Vec<TileId>,
        stack: Vec<TileId>,
        epoch: u64,
    }

    impl World {
        fn new(json: &str, max_pending: usize) -> Self {
            let mut tree = TileTree::new();
            let loaded = attach_hierarchy(&mut tree, "tileset.json", Ok(json.as_bytes().to_vec()), None).unwrap();
            let scheduler = RequestScheduler::new(max_pending);
            let fetcher = ManualFetcher::default();
            let (tx, _rx) = completion_channel();
            let loader = ContentLoader::new(
                Arc::clone(&scheduler),
                Box::new(fetcher.clone()),
                Box::new(CountingFactory::new(1)),
                tx,
            );
            Self {
                tree,
                loader,
                fetcher,
                scheduler,
                root: loaded.root,
                geometric_error: loaded.geometric_error,
                selected: Vec::new(),
                stack: Vec::new(),
                epoch: 0,
            }
        }

        fn select(&mut self, frame: &FrameState) -> Vec<TileId> {
            self.epoch += 1;
            self.loader.stats.clear_frame();
            Selector {
                tree: &mut self.tree,
                loader: &mut self.loader,
                frame,
                maximum_screen_space_error: 16.0,
                selected: &mut self.selected,
                stack: &mut self.stack,
                epoch: self.epoch,
            }
            .select(self.root, self.geometric_error);
            self.selected.clone()
        }

        fn children(&self, id: TileId) -> Vec<TileId> {
            let mut children = self.tree[id].children().to_vec();
            children.sort();
            children
        }

        fn ready(&mut self, id: TileId) {
            make_ready(&mut self.tree, id);
        }
    }

    /// Far away the root alone meets the budget and nothing is requested.
    #[test]
    fn test_far_selects_root_only() {
        let mut w = World::new(TWO_LEVEL, 6);
        w.ready(w.root);
        let selected = w.select(&frame_at(FAR));
        assert_eq!(selected, vec![w.root]);
        assert!(w.fetcher.requested_urls().is_empty());
        assert_eq!(w.scheduler.pending(), 0);
    }

    /// Close up with both children ready, they replace the root.
    #[test]
    fn test_close_with_ready_children_selects_children() {
        let mut w = World::new(TWO_LEVEL, 6);
        w.ready(w.root);
        for child in w.children(w.root) {
            w.ready(child);
        }
        let mut selected = w.select(&frame_at(CLOSE));
        selected.sort();
        assert_eq!(selected, w.children(w.root));
        assert!(!selected.contains(&w.root));
    }

    /// Close up with unloaded children the root stands in and both children are requested.
    #[test]
    fn test_close_with_unloaded_children_requests_them() {
        let mut w = World::new(TWO_LEVEL, 6);
        w.ready(w.root);
        let before = w.loader.stats.number_of_pending_requests;

        let selected = w.select(&frame_at(CLOSE));
        assert_eq!(selected, vec![w.root]);
        assert_eq!(w.scheduler.pending(), 2);
        assert_eq!(w.loader.stats.number_of_pending_requests, before + 2);
        let mut urls = w.fetcher.requested_urls();
        urls.sort();
        assert_eq!(urls, vec!["a.b3dm".to_owned(), "b.b3dm".to_owned()]);
    }

    /// A saturated scheduler admits nothing, and earlier admissions are kept.
    #[test]
    fn test_saturated_scheduler_admits_nothing() {
        let mut w = World::new(TWO_LEVEL, 1);
        w.ready(w.root);
        let held = w.scheduler.try_admit().unwrap();

        let selected = w.select(&frame_at(CLOSE));
        assert_eq!(selected, vec![w.root]);
        assert!(w.fetcher.requested_urls().is_empty());
        assert_eq!(w.scheduler.pending(), 1);
        for child in w.children(w.root) {
            assert!(w.tree[child].is_content_unloaded());
        }
        drop(held);
    }

    /// With one slot only the nearest child is requested.
    #[test]
    fn test_limited_capacity_requests_nearest_first() {
        let mut w = World::new(TWO_LEVEL, 1);
        w.ready(w.root);
        // Closer to child b (+x).
        w.select(&frame_at(DVec3::new(120.0, 0.0, 500.0)));
        assert_eq!(w.fetcher.requested_urls(), vec!["b.b3dm".to_owned()]);
    }

    /// The unloaded root is requested and nothing is selected.
    #[test]
    fn test_unloaded_root_is_requested() {
        let mut w = World::new(TWO_LEVEL, 6);
        let selected = w.select(&frame_at(CLOSE));
        assert!(selected.is_empty());
        assert_eq!(w.fetcher.requested_urls(), vec!["root.b3dm".to_owned()]);
    }

    /// Viewing from beyond the tileset's own error selects nothing.
    #[test]
    fn test_tileset_error_fast_reject() {
        let mut w = World::new(TWO_LEVEL, 6);
        w.ready(w.root);
        let selected = w.select(&frame_at(DVec3::new(0.0, 0.0, 1.0e6)));
        assert!(selected.is_empty());
        assert_eq!(w.loader.stats.visited, 0);
    }

    /// A fully loaded replace tile within budget hides its descendants.
    #[test]
    fn test_replace_excludes_descendants() {
        let mut w = World::new(TWO_LEVEL, 6);
        let mut all: Vec<TileId> = w.tree.iter().map(|(id, _)| id).collect();
        all.sort();
        for id in all {
            w.ready(id);
        }
        let selected = w.select(&frame_at(FAR));
        assert_eq!(selected, vec![w.root]);
    }

    const ADDITIVE: &str = r#"{
        "geometricError": 500,
        "root": {
            "boundingVolume": { "sphere": [0, 0, 0, 100] },
            "geometricError": 100, "refine": "ADD",
            "content": { "url": "root.pnts" },
            "children": [
                { "boundingVolume": { "sphere": [0, 0, 0, 50] }, "geometricError": 10,
                  "content": { "url": "child.pnts" },
                  "children": [
                      { "boundingVolume": { "sphere": [0, 0, 0, 25] }, "geometricError": 0,
                        "content": { "url": "leaf.pnts" } }
                  ] }
            ]
        }
    }"#;

    /// Additive ancestors stay selected alongside their descendants.
    #[test]
    fn test_additive_keeps_ancestors() {
        let mut w = World::new(ADDITIVE, 6);
        let ids: Vec<TileId> = w.tree.iter().map(|(id, _)| id).collect();
        for &id in &ids {
            w.ready(id);
        }
        let selected = w.select(&frame_at(DVec3::new(0.0, 0.0, 60.0)));
        assert_eq!(selected.len(), 3);
        for id in ids {
            assert!(selected.contains(&id));
        }
    }

    /// Additive children are requested once the parent exceeds the budget.
    #[test]
    fn test_additive_requests_visible_children() {
        let mut w = World::new(ADDITIVE, 6);
        w.ready(w.root);
        let selected = w.select(&frame_at(DVec3::new(0.0, 0.0, 400.0)));
        assert_eq!(selected, vec![w.root]);
        assert_eq!(w.fetcher.requested_urls(), vec!["child.pnts".to_owned()]);
    }

    /// Pick passes never mutate streaming state.
    #[test]
    fn test_pick_pass_is_read_only() {
        let mut w = World::new(TWO_LEVEL, 6);
        w.ready(w.root);
        let selected = w.select(&pick_frame_at(CLOSE));
        assert_eq!(selected, vec![w.root]);
        assert!(w.fetcher.requested_urls().is_empty());
        assert_eq!(w.scheduler.pending(), 0);

        let mut fresh = World::new(TWO_LEVEL, 6);
        fresh.select(&pick_frame_at(CLOSE));
        assert!(fresh.tree[fresh.root].is_content_unloaded());
    }

    /// Tiles behind the frustum are skipped along with their subtrees.
    #[test]
    fn test_culled_children_are_skipped() {
        let mut w = World::new(TWO_LEVEL, 6);
        for id in w.tree.iter().map(|(id, _)| id).collect::<Vec<_>>() {
            w.ready(id);
        }
        // Keep only x >= 10, which excludes child a centered at x = -50 with radius 50.
        let mut frame = frame_at(CLOSE);
        frame.culling_volume = CullingVolume::new(vec![Plane::new(DVec3::X, -10.0)]);
        let selected = w.select(&frame);

        let b = w.children(w.root)[1];
        assert_eq!(selected, vec![b]);
    }

    /// A tight content volume outside the frustum keeps a tile out of the selection.
    #[test]
    fn test_content_volume_culls_selection() {
        let json = r#"{ "geometricError": 500, "root": {
            "boundingVolume": { "sphere": [0, 0, 0, 100] }, "geometricError": 1,
            "content": { "url": "root.b3dm", "boundingVolume": { "sphere": [-80, 0, 0, 10] } } } }"#;
        let mut w = World::new(json, 6);
        w.ready(w.root);
        let mut frame = frame_at(CLOSE);
        frame.culling_volume = CullingVolume::new(vec![Plane::new(DVec3::X, 0.0)]);
        assert!(w.select(&frame).is_empty());
        assert_eq!(w.loader.stats.visited, 1);
    }

    /// Equal distances are broken by tile order, identically every frame.
    #[test]
    fn test_equal_distance_tie_break_is_deterministic() {
        let mut w = World::new(TWO_LEVEL, 1);
        w.ready(w.root);
        let children = w.children(w.root);
        let (a, b) = (children[0], children[1]);
        // CLOSE is equidistant from both children.
        assert_eq!(w.distance_from_close(a), w.distance_from_close(b));
        w.select(&frame_at(CLOSE));
        assert_eq!(w.fetcher.requested_urls(), vec!["a.b3dm".to_owned()]);
        let order = w.tree[w.root].children().to_vec();

        for _ in 0..5 {
            w.select(&frame_at(CLOSE));
            assert_eq!(w.tree[w.root].children(), &order[..]);
        }
        assert_eq!(order, vec![b, a]);
    }

    impl World {
        fn distance_from_close(&self, id: TileId) -> f64 {
            self.tree[id].bounding_volume().distance_to(CLOSE)
        }
    }

    /// Repeated passes over unchanged state select the same tiles.
    #[test]
    fn test_repeated_selection_is_identical() {
        let mut w = World::new(TWO_LEVEL, 6);
        for id in w.tree.iter().map(|(id, _)| id).collect::<Vec<_>>() {
            w.ready(id);
        }
        let first = w.select(&frame_at(CLOSE));
        let second = w.select(&frame_at(CLOSE));
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    const NESTED: &str = r#"{
        "geometricError": 500,
        "root": {
            "boundingVolume": { "sphere": [0, 0, 0, 100] },
            "geometricError": 100,
            "content": { "url": "root.b3dm" },
            "children": [
                { "boundingVolume": { "sphere": [0, 0, 0, 100] }, "geometricError": 10,
                  "content": { "url": "city/tileset.json" } }
            ]
        }
    }"#;

    const CITY: &str = r#"{ "geometricError": 10, "root": {
        "boundingVolume": { "sphere": [0, 0, 0, 100] }, "geometricError": 10,
        "content": { "url": "city.b3dm" } } }"#;

    /// A pointer within budget loads its hierarchy while its parent stands in,
    /// then its nested root is requested and finally selected.
    #[test]
    fn test_nested_hierarchy_delegation() {
        let mut w = World::new(NESTED, 6);
        w.ready(w.root);
        let pointer = w.tree[w.root].children()[0];
        let frame = frame_at(CLOSE);

        // The pointer is not ready, so the root stands in and the pointer is loaded.
        assert_eq!(w.select(&frame), vec![w.root]);
        assert_eq!(w.fetcher.requested_urls(), vec!["city/tileset.json".to_owned()]);
        assert_eq!(w.tree[pointer].state(), ContentState::Loading);

        w.fetcher.take("city/tileset.json");
        w.loader
            .complete_nested_hierarchy(&mut w.tree, pointer, "city/tileset.json", Ok(CITY.as_bytes().to_vec()));
        let nested_root = w.tree[pointer].nested_root().unwrap();

        // The pointer is ready now; its nested root is requested, the root still stands in.
        assert_eq!(w.select(&frame), vec![w.root]);
        assert!(w.fetcher.requested_urls().contains(&"city/city.b3dm".to_owned()));
        assert_eq!(w.tree[nested_root].state(), ContentState::Loading);

        w.ready(nested_root);
        assert_eq!(w.select(&frame), vec![nested_root]);
    }

    const SIBLINGS: &str = r#"{
        "geometricError": 500,
        "root": {
            "boundingVolume": { "sphere": [0, 0, 0, 100] },
            "geometricError": 100,
            "refine": "REPLACE",
            "content": { "url": "root.b3dm" },
            "children": [
                { "boundingVolume": { "sphere": [-50, 0, 0, 50] }, "geometricError": 10,
                  "content": { "url": "a.b3dm" } },
                { "boundingVolume": { "sphere": [50, 0, 0, 50] }, "geometricError": 10,
                  "content": { "url": "b/tileset.json" } }
            ]
        }
    }"#;

    const SIBLING_B: &str = r#"{ "geometricError": 10, "root": {
        "boundingVolume": { "sphere": [50, 0, 0, 50] }, "geometricError": 10,
        "content": { "url": "b.b3dm" } } }"#;

    /// Attaching a nested hierarchy does not make its parent descend early:
    /// the parent stands in alone until the nested root is ready.
    #[test]
    fn test_attached_pointer_keeps_replace_parent_exclusive() {
        let mut w = World::new(SIBLINGS, 6);
        let (a, b) = (w.tree[w.root].children()[0], w.tree[w.root].children()[1]);
        w.ready(w.root);
        w.ready(a);
        let frame = frame_at(CLOSE);

        assert_eq!(w.select(&frame), vec![w.root]);
        assert_eq!(w.tree[b].state(), ContentState::Loading);

        w.fetcher.take("b/tileset.json");
        w.loader
            .complete_nested_hierarchy(&mut w.tree, b, "b/tileset.json", Ok(SIBLING_B.as_bytes().to_vec()));
        let nested_root = w.tree[b].nested_root().unwrap();
        assert_eq!(w.tree[nested_root].state(), ContentState::Unloaded);
        assert_eq!(w.tree[w.root].children_without_content(), 1);

        // Still one level: the root alone, while the nested root is requested.
        assert_eq!(w.select(&frame), vec![w.root]);
        assert_eq!(w.tree[nested_root].state(), ContentState::Loading);
        assert!(w.fetcher.requested_urls().contains(&"b/b.b3dm".to_owned()));

        w.ready(nested_root);
        assert_eq!(w.tree[w.root].children_without_content(), 0);
        let mut selected = w.select(&frame);
        selected.sort();
        assert_eq!(selected, vec![a, nested_root]);
    }

    /// A nested root that fails leaves its replace parent standing in.
    #[test]
    fn test_failed_nested_root_keeps_stand_in() {
        let mut w = World::new(SIBLINGS, 6);
        let (a, b) = (w.tree[w.root].children()[0], w.tree[w.root].children()[1]);
        w.ready(w.root);
        w.ready(a);
        let frame = frame_at(CLOSE);
        w.select(&frame);

        w.fetcher.take("b/tileset.json");
        w.loader
            .complete_nested_hierarchy(&mut w.tree, b, "b/tileset.json", Ok(SIBLING_B.as_bytes().to_vec()));
        let nested_root = w.tree[b].nested_root().unwrap();
        w.select(&frame);

        w.fetcher.take("b/b.b3dm");
        w.loader.complete_content(
            &mut w.tree,
            nested_root,
            "b/b.b3dm",
            Err(FetchError::NotFound("b/b.b3dm".into())),
        );
        assert_eq!(w.tree[nested_root].state(), ContentState::Failed);

        for _ in 0..3 {
            assert_eq!(w.select(&frame), vec![w.root]);
        }
    }

    /// A failed nested hierarchy only affects its own branch.
    #[test]
    fn test_failed_nested_hierarchy_is_local() {
        let mut w = World::new(NESTED, 6);
        w.ready(w.root);
        let pointer = w.tree[w.root].children()[0];
        let frame = frame_at(CLOSE);
        w.select(&frame);

        w.fetcher.take("city/tileset.json");
        w.loader
            .complete_nested_hierarchy(&mut w.tree, pointer, "city/tileset.json", Ok(b"{}".to_vec()));
        assert_eq!(w.tree[pointer].state(), ContentState::Failed);

        for _ in 0..3 {
            assert_eq!(w.select(&frame), vec![w.root]);
        }
        assert_eq!(w.fetcher.requested_urls(), vec!["city/tileset.json".to_owned()]);
    }
}
