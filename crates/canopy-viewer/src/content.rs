//! Stand-in content and render collaborators for the headless viewer.
//!
//! Payloads are not decoded; their size decides how many processing steps a
//! tile takes, which is enough to exercise the processing queue.

use canopy_tiles::{
    ContentError, ContentFactory, FrameState, ProcessingStatus, RenderSink, TileContent, TileId,
};

/// Bytes processed per frame by a single tile.
pub const BYTES_PER_STEP: usize = 64 * 1024;

/// A fetched payload that takes one step per [`BYTES_PER_STEP`] bytes.
#[derive(Debug)]
pub struct PayloadContent {
    len: usize,
    processed: usize,
}

impl TileContent for PayloadContent {
    fn process(&mut self, _frame: &FrameState) -> ProcessingStatus {
        self.processed = (self.processed + BYTES_PER_STEP).min(self.len);
        if self.processed >= self.len {
            ProcessingStatus::Ready
        } else {
            ProcessingStatus::Pending
        }
    }
}

#[derive(Debug, Default)]
pub struct PayloadFactory;

impl ContentFactory for PayloadFactory {
    fn create(&self, url: &str, bytes: Vec<u8>) -> Result<Box<dyn TileContent>, ContentError> {
        if bytes.is_empty() {
            return Err(ContentError::Decode {
                url: url.to_owned(),
                reason: "empty payload".to_owned(),
            });
        }
        Ok(Box::new(PayloadContent {
            len: bytes.len(),
            processed: 0,
        }))
    }
}

/// Counts what a renderer would draw: one command per content tile.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub tiles: usize,
    pub commands: usize,
}

impl CountingSink {
    pub fn reset(&mut self) {
        self.tiles = 0;
        self.commands = 0;
    }
}

impl RenderSink for CountingSink {
    fn accept(
        &mut self,
        _tile: TileId,
        content: Option<&dyn TileContent>,
        _frame: &FrameState,
    ) -> usize {
        self.tiles += 1;
        let commands = usize::from(content.is_some());
        self.commands += commands;
        commands
    }
}
