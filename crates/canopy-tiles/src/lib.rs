//! Hierarchical level-of-detail tile streaming: tile tree, content lifecycle,
//! request scheduling, screen-space-error driven selection and nested
//! hierarchies.

mod content;
mod description;
mod error;
mod fetch;
mod frame;
mod hierarchy;
mod lifecycle;
mod scheduler;
mod sse;
mod stats;
mod tile;
mod tileset;
mod traversal;

#[cfg(test)]
mod test_support;

pub use content::{ContentFactory, ProcessingStatus, RenderSink, TileContent};
pub use description::{
    BoundingVolumeDescription, ContentDescription, RefineDescription, TileDescription, TilesetDescription,
};
pub use error::{ContentError, DescriptionError, FetchError, LoadError, TilesetError};
pub use fetch::{
    Completion, FetchResponder, Fetcher, FileTransport, RequestKind, ThreadedFetcher, Transport,
};
pub use frame::{FrameState, Pass};
pub use hierarchy::{LoadedHierarchy, build_hierarchy};
pub use scheduler::{DEFAULT_MAX_PENDING_REQUESTS, RequestScheduler, RequestSlot};
pub use sse::{MIN_DISTANCE, screen_space_error};
pub use stats::{LoadProgress, LoadProgressListener, Statistics};
pub use tile::{ContentState, Refinement, Tile, TileId, TileKind, TileTree};
pub use tileset::{
    DEFAULT_MAXIMUM_SCREEN_SPACE_ERROR, ReadySignal, Tileset, TilesetMetadata, TilesetOptions,
};
