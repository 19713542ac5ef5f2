//! Background Track Loader
//!
//! Reads track files on a dedicated thread so the frame loop never waits on
//! disk I/O. The player issues requests and polls for results once per tick.
//!
//! ## Architecture
//!
//! ```text
//! Frame Loop (control thread)     Track Loader Thread
//!        │                              │
//!        │  request(LoadRequest)        │
//!        │─────────────────────────────>│
//!        │                              │ read_track()
//!        │                              │ (disk I/O)
//!        │                              │
//!        │  poll_ready() -> Some(track) │
//!        │<─────────────────────────────│
//!        │                              │
//! ```

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError, TrySendError};
use modplay_playback::{read_track, LoadRequest, LoadedTrack, PlaybackError, TrackSource};
use std::collections::VecDeque;
use std::thread::{self, JoinHandle};

use crate::error::Result;

/// Requests waiting for the loader thread before new ones are refused
const REQUEST_QUEUE_DEPTH: usize = 16;

/// Background track loader
///
/// Dropping the loader closes the request channel and joins the thread once
/// the file it is reading (if any) is done.
pub struct FileTrackLoader {
    /// Channel to send load requests
    request_tx: Option<Sender<LoadRequest>>,
    /// Channel to receive load results
    result_rx: Receiver<LoadedTrack>,
    /// Requests refused on the control side, answered on the next poll
    refused: VecDeque<LoadedTrack>,
    thread: Option<JoinHandle<()>>,
}

impl FileTrackLoader {
    /// Spawn the loader thread
    pub fn new() -> Result<Self> {
        let (request_tx, request_rx) = bounded::<LoadRequest>(REQUEST_QUEUE_DEPTH);
        let (result_tx, result_rx) = unbounded::<LoadedTrack>();

        let thread = thread::Builder::new()
            .name("track-loader".to_string())
            .spawn(move || Self::loader_thread(&request_rx, &result_tx))?;

        Ok(Self {
            request_tx: Some(request_tx),
            result_rx,
            refused: VecDeque::new(),
            thread: Some(thread),
        })
    }

    fn loader_thread(requests: &Receiver<LoadRequest>, results: &Sender<LoadedTrack>) {
        tracing::debug!("Track loader started");

        while let Ok(request) = requests.recv() {
            let outcome = read_track(&request.track);
            match &outcome {
                Ok(data) => {
                    tracing::debug!(request = request.id, track = %request.track.name, bytes = data.len(), "Track read");
                }
                Err(e) => {
                    tracing::warn!(request = request.id, error = %e, "Track read failed");
                }
            }

            let loaded = LoadedTrack {
                id: request.id,
                name: request.track.name,
                outcome,
            };
            if results.send(loaded).is_err() {
                break;
            }
        }

        tracing::debug!("Track loader stopped");
    }

    fn refuse(&mut self, request: LoadRequest, reason: &str) {
        tracing::warn!(request = request.id, track = %request.track.name, reason, "Load request refused");
        self.refused.push_back(LoadedTrack {
            id: request.id,
            outcome: Err(PlaybackError::load(&request.track.name, reason)),
            name: request.track.name,
        });
    }
}

impl TrackSource for FileTrackLoader {
    fn request(&mut self, request: LoadRequest) {
        let Some(tx) = &self.request_tx else {
            self.refuse(request, "loader shut down");
            return;
        };
        match tx.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => self.refuse(request, "load queue full"),
            Err(TrySendError::Disconnected(request)) => self.refuse(request, "loader thread exited"),
        }
    }

    fn poll_ready(&mut self) -> Option<LoadedTrack> {
        if let Some(refused) = self.refused.pop_front() {
            return Some(refused);
        }
        match self.result_rx.try_recv() {
            Ok(loaded) => Some(loaded),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for FileTrackLoader {
    fn drop(&mut self) {
        // Closing the channel ends the thread's recv loop.
        self.request_tx = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Track loader thread panicked");
            }
        }
    }
}
