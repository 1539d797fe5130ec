//! Interfaces to the content decode and render collaborators.
//!
//! Payload decoding and draw-command generation live outside this crate.
//! A [`ContentFactory`] turns fetched bytes into a [`TileContent`], which is
//! then advanced once per frame until it reports completion. Selected tiles
//! are handed to a [`RenderSink`].

use crate::error::ContentError;
use crate::frame::FrameState;
use crate::tile::TileId;

/// Outcome of one processing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingStatus {
    /// More steps are needed.
    Pending,
    /// The content is ready to render.
    Ready,
    /// Processing failed; the tile will never be rendered.
    Failed(String),
}

/// Decoded tile payload.
pub trait TileContent {
    /// Advance post-fetch processing (decode, upload) by one step.
    fn process(&mut self, frame: &FrameState) -> ProcessingStatus;
}

/// Creates content from fetched payload bytes.
pub trait ContentFactory {
    /// Build content for the payload fetched from `url`.
    fn create(&self, url: &str, bytes: Vec<u8>) -> Result<Box<dyn TileContent>, ContentError>;
}

/// Receives the tiles selected for rendering each frame.
pub trait RenderSink {
    /// Accept one selected tile. `content` is `None` for structural tiles.
    ///
    /// Returns the number of draw commands issued for the tile.
    fn accept(
        &mut self,
        tile: TileId,
        content: Option<&dyn TileContent>,
        frame: &FrameState,
    ) -> usize;
}
