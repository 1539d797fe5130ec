//! Asynchronous fetch abstraction.
//!
//! A [`Fetcher`] starts a request and answers it later, from any thread,
//! through the [`FetchResponder`] it was handed. Answers arrive as
//! [`Completion`]s on a channel the tileset drains at the start of every
//! frame, so completions only ever mutate tiles on the frame thread.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use tracing::debug;

use crate::error::FetchError;
use crate::tile::TileId;

/// What a completed request was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Renderable payload of a tile.
    Content(TileId),
    /// A hierarchy description; `parent` is the pointer tile, or `None` for
    /// the top-level description.
    Hierarchy { parent: Option<TileId> },
}

/// The answer to one request.
#[derive(Debug)]
pub struct Completion {
    pub kind: RequestKind,
    pub url: String,
    pub result: Result<Vec<u8>, FetchError>,
}

pub(crate) type CompletionSender = Sender<Completion>;
pub(crate) type CompletionReceiver = Receiver<Completion>;

pub(crate) fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    unbounded()
}

/// One-shot handle used to answer a request.
///
/// A responder dropped without an answer reports
/// [`FetchError::Disconnected`], so every request reaches a terminal outcome.
#[derive(Debug)]
pub struct FetchResponder {
    sender: Option<CompletionSender>,
    kind: RequestKind,
    url: String,
}

impl FetchResponder {
    pub(crate) fn new(sender: CompletionSender, kind: RequestKind, url: String) -> Self {
        Self {
            sender: Some(sender),
            kind,
            url,
        }
    }

    /// URL of the request being answered.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver the outcome of the request.
    pub fn respond(mut self, result: Result<Vec<u8>, FetchError>) {
        self.send(result);
    }

    fn send(&mut self, result: Result<Vec<u8>, FetchError>) {
        if let Some(sender) = self.sender.take() {
            // The tileset may already be gone; nobody is left to tell.
            let _ = sender.send(Completion {
                kind: self.kind,
                url: std::mem::take(&mut self.url),
                result,
            });
        }
    }
}

impl Drop for FetchResponder {
    fn drop(&mut self) {
        self.send(Err(FetchError::Disconnected));
    }
}

/// Starts requests without blocking the caller.
pub trait Fetcher {
    /// Begin fetching `url`. `responder` must eventually be answered or dropped.
    fn fetch(&self, url: &str, responder: FetchResponder);
}

/// Blocking resource access used by [`ThreadedFetcher`] workers.
pub trait Transport: Send + Sync + 'static {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Reads URLs as paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileTransport {
    root: PathBuf,
}

impl FileTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Transport for FileTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.root.join(url.trim_start_matches('/'));
        fs::read(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound(url.to_owned()),
            _ => FetchError::Io {
                url: url.to_owned(),
                source,
            },
        })
    }
}

struct FetchTask {
    url: String,
    responder: FetchResponder,
}

/// Fixed pool of worker threads running a [`Transport`].
///
/// Requests beyond the queue capacity are answered immediately with
/// [`FetchError::QueueFull`].
pub struct ThreadedFetcher {
    task_sender: Sender<FetchTask>,
    in_flight: Arc<AtomicU64>,
}

impl ThreadedFetcher {
    /// Spawn `thread_count` workers sharing a queue of `queue_capacity` tasks.
    pub fn new(
        transport: Arc<dyn Transport>,
        thread_count: usize,
        queue_capacity: usize,
    ) -> io::Result<Self> {
        let (task_sender, task_receiver) = bounded::<FetchTask>(queue_capacity);
        let in_flight = Arc::new(AtomicU64::new(0));

        for index in 0..thread_count.max(1) {
            let receiver = task_receiver.clone();
            let transport = Arc::clone(&transport);
            let in_flight = Arc::clone(&in_flight);

            std::thread::Builder::new()
                .name(format!("canopy-fetch-{index}"))
                .spawn(move || {
                    while let Ok(task) = receiver.recv() {
                        let result = transport.get(&task.url);
                        debug!(url = %task.url, ok = result.is_ok(), "fetch finished");
                        task.responder.respond(result);
                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })?;
        }

        Ok(Self {
            task_sender,
            in_flight,
        })
    }

    /// Requests queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }
}

impl Fetcher for ThreadedFetcher {
    fn fetch(&self, url: &str, responder: FetchResponder) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let task = FetchTask {
            url: url.to_owned(),
            responder,
        };
        if let Err(err) = self.task_sender.try_send(task) {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            let (task, error) = match err {
                TrySendError::Full(task) => {
                    let error = FetchError::QueueFull(task.url.clone());
                    (task, error)
                }
                TrySendError::Disconnected(task) => (task, FetchError::Disconnected),
            };
            task.responder.respond(Err(error));
        }
    }
}
