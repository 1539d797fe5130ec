//! Error types for fetching, describing, decoding and driving a tileset.

use std::sync::Arc;

use thiserror::Error;

/// Failure of the transport while fetching a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Nothing exists at the requested location.
    #[error("not found: {0}")]
    NotFound(String),
    /// The transport failed while reading the resource.
    #[error("failed to read {url}: {source}")]
    Io {
        /// The requested URL.
        url: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The fetcher's request queue is full.
    #[error("request queue full, dropped {0}")]
    QueueFull(String),
    /// The request was dropped without an answer.
    #[error("request dropped before completion")]
    Disconnected,
}

/// A hierarchy description that could not be turned into tiles.
#[derive(Debug, Error)]
pub enum DescriptionError {
    /// The document is not valid JSON or lacks required fields.
    #[error("failed to parse hierarchy description: {0}")]
    Parse(#[source] serde_json::Error),
    /// A geometric error is negative or not finite.
    #[error("invalid geometric error: {value}")]
    InvalidGeometricError {
        /// The offending value.
        value: f64,
    },
    /// A bounding volume names neither a box nor a sphere.
    #[error("bounding volume must specify a box or a sphere")]
    MissingBoundingVolume,
    /// A bounding volume has the wrong number of components.
    #[error("{kind} bounding volume expects {expected} numbers, got {actual}")]
    MalformedBoundingVolume {
        /// `"box"` or `"sphere"`.
        kind: &'static str,
        /// Required component count.
        expected: usize,
        /// Component count found.
        actual: usize,
    },
}

/// Failure of a single hierarchy load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The description could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The description was fetched but is malformed.
    #[error(transparent)]
    Description(#[from] DescriptionError),
}

/// Failure reported by the content decode collaborator.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The payload could not be decoded.
    #[error("failed to decode {url}: {reason}")]
    Decode {
        /// Content URL.
        url: String,
        /// Human-readable reason.
        reason: String,
    },
}

/// Errors surfaced by the public [`Tileset`](crate::Tileset) API.
#[derive(Debug, Clone, Error)]
pub enum TilesetError {
    /// The root hierarchy has not resolved yet.
    #[error("the tileset is not loaded; wait for the ready signal")]
    NotReady,
    /// The tileset was destroyed.
    #[error("the tileset has been destroyed")]
    Destroyed,
    /// The root hierarchy failed to load; the tileset never becomes ready.
    #[error("failed to load root hierarchy: {0}")]
    RootLoad(#[source] Arc<LoadError>),
}
