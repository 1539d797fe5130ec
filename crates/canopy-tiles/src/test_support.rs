//! Fixtures shared by the unit tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use canopy_cull::CullingVolume;
use glam::DVec3;

use crate::content::{ContentFactory, ProcessingStatus, RenderSink, TileContent};
use crate::error::{ContentError, FetchError};
use crate::fetch::{FetchResponder, Fetcher};
use crate::frame::{FrameState, Pass};
use crate::tile::{ContentState, TileId, TileTree};

/// Root error 100 with two replace children of error 10 either side of the origin.
pub const TWO_LEVEL: &str = r#"{
    "properties": { "name": "two-level" },
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
              "content": { "url": "b.b3dm" } }
        ]
    }
}"#;

/// Root projected error 10 px: within budget.
pub const FAR: DVec3 = DVec3::new(0.0, 0.0, 5_100.0);
/// Root projected error 100 px, children about 9 px.
pub const CLOSE: DVec3 = DVec3::new(0.0, 0.0, 600.0);

/// Render frame without culling planes, 1000 px high, 90 degree field of view.
pub fn frame_at(position: DVec3) -> FrameState {
    FrameState {
        camera_position: position,
        culling_volume: CullingVolume::default(),
        viewport_height: 1000.0,
        sse_denominator: 2.0,
        pass: Pass::Render,
    }
}

pub fn pick_frame_at(position: DVec3) -> FrameState {
    FrameState {
        pass: Pass::Pick,
        ..frame_at(position)
    }
}

/// Force a tile to `Ready` regardless of its current state.
pub fn make_ready(tree: &mut TileTree, id: TileId) {
    match tree[id].state() {
        ContentState::Ready => {}
        ContentState::Unloaded => {
            tree[id].begin_loading(None);
            tree.mark_ready(id);
        }
        _ => tree.mark_ready(id),
    }
}

/// Records requests and answers them only when told to.
#[derive(Clone, Default)]
pub struct ManualFetcher {
    outstanding: Rc<RefCell<Vec<FetchResponder>>>,
    history: Rc<RefCell<Vec<String>>>,
}

impl ManualFetcher {
    /// Every URL ever requested, in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.history.borrow().clone()
    }

    /// URLs still waiting for an answer.
    pub fn outstanding(&self) -> Vec<String> {
        self.outstanding
            .borrow()
            .iter()
            .map(|r| r.url().to_owned())
            .collect()
    }

    /// Remove the first outstanding request for `url`.
    pub fn take(&self, url: &str) -> Option<FetchResponder> {
        let mut outstanding = self.outstanding.borrow_mut();
        let index = outstanding.iter().position(|r| r.url() == url)?;
        Some(outstanding.remove(index))
    }

    pub fn respond(&self, url: &str, result: Result<Vec<u8>, FetchError>) {
        let responder = self
            .take(url)
            .unwrap_or_else(|| panic!("no outstanding request for {url}"));
        responder.respond(result);
    }

    pub fn respond_ok(&self, url: &str, bytes: &[u8]) {
        self.respond(url, Ok(bytes.to_vec()));
    }
}

impl Fetcher for ManualFetcher {
    fn fetch(&self, url: &str, responder: FetchResponder) {
        self.history.borrow_mut().push(url.to_owned());
        self.outstanding.borrow_mut().push(responder);
    }
}

/// Content that becomes ready after a fixed number of processing steps.
#[derive(Debug)]
pub struct CountingContent {
    remaining: usize,
    fail: bool,
}

impl TileContent for CountingContent {
    fn process(&mut self, _frame: &FrameState) -> ProcessingStatus {
        if self.fail {
            return ProcessingStatus::Failed("decoder gave up".to_owned());
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            ProcessingStatus::Ready
        } else {
            ProcessingStatus::Pending
        }
    }
}

/// Creates [`CountingContent`], optionally failing chosen URLs.
#[derive(Debug, Default)]
pub struct CountingFactory {
    steps: usize,
    decode_failures: HashSet<String>,
    processing_failures: HashSet<String>,
}

impl CountingFactory {
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }

    pub fn failing_decode(mut self, url: &str) -> Self {
        self.decode_failures.insert(url.to_owned());
        self
    }

    pub fn failing_processing(mut self, url: &str) -> Self {
        self.processing_failures.insert(url.to_owned());
        self
    }
}

impl ContentFactory for CountingFactory {
    fn create(&self, url: &str, _bytes: Vec<u8>) -> Result<Box<dyn TileContent>, ContentError> {
        if self.decode_failures.contains(url) {
            return Err(ContentError::Decode {
                url: url.to_owned(),
                reason: "corrupt payload".to_owned(),
            });
        }
        Ok(Box::new(CountingContent {
            remaining: self.steps,
            fail: self.processing_failures.contains(url),
        }))
    }
}

/// Render sink remembering what it was handed. Each tile issues one command.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub accepted: Vec<TileId>,
}

impl RenderSink for RecordingSink {
    fn accept(&mut self, tile: TileId, _content: Option<&dyn TileContent>, _frame: &FrameState) -> usize {
        self.accepted.push(tile);
        1
    }
}
