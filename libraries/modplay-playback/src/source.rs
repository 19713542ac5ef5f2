//! Track source capability
//!
//! Acquiring the bytes of a track (disk, drop payload, network) is
//! asynchronous and may fail. The player issues a [`LoadRequest`] whenever
//! the playlist cursor lands on a track and polls for the matching
//! [`LoadedTrack`] once per frame tick.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{PlaybackError, Result};
use crate::types::{Track, TrackLocation};

/// Request for the bytes of one track
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Monotonic request id; only the latest one is honoured
    pub id: u64,

    /// Track to fetch
    pub track: Track,
}

/// Result of a [`LoadRequest`]
#[derive(Debug)]
pub struct LoadedTrack {
    /// Id of the request this answers
    pub id: u64,

    /// Display name of the track
    pub name: String,

    /// The bytes, or why they could not be acquired
    pub outcome: Result<Arc<[u8]>>,
}

/// Asynchronous provider of track bytes
pub trait TrackSource: Send {
    /// Queue a fetch; must not block on I/O for long
    fn request(&mut self, request: LoadRequest);

    /// Next finished fetch, if any (non-blocking)
    fn poll_ready(&mut self) -> Option<LoadedTrack>;
}

/// Fetch the bytes behind a track on the calling thread
pub fn read_track(track: &Track) -> Result<Arc<[u8]>> {
    match &track.location {
        TrackLocation::Memory(data) => Ok(Arc::clone(data)),
        TrackLocation::Path(path) => std::fs::read(path)
            .map(Arc::from)
            .map_err(|e| PlaybackError::load(&track.name, e)),
    }
}

/// Source that fetches during `request` and answers on the next poll
///
/// Suitable for in-memory tracks and tests; file reads happen on the
/// control thread.
#[derive(Debug, Default)]
pub struct InlineSource {
    ready: VecDeque<LoadedTrack>,
}

impl InlineSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackSource for InlineSource {
    fn request(&mut self, request: LoadRequest) {
        let outcome = read_track(&request.track);
        self.ready.push_back(LoadedTrack {
            id: request.id,
            name: request.track.name,
            outcome,
        });
    }

    fn poll_ready(&mut self) -> Option<LoadedTrack> {
        self.ready.pop_front()
    }
}
