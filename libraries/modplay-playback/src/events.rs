//! Playback events
//!
//! Events are queued synchronously inside the call that caused them and
//! handed out by [`crate::Player::drain_events`]:
//! - State changes (play/pause/stop)
//! - Track lifecycle (started, finished, failed to load)
//! - Playlist exhaustion and engine-requested termination

use serde::{Deserialize, Serialize};

/// Events emitted by the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// The playing flag was set or cleared
    ///
    /// Emitted once per Play/Pause/Stop call, used by UIs to flip a
    /// play/pause indicator.
    StateChanged {
        /// New value of the playing flag
        playing: bool,
    },

    /// A track was started and is now the live session
    TrackStarted {
        /// Display name
        name: String,
        /// Playlist index
        index: usize,
    },

    /// The engine ran out of frames during playback
    TrackFinished {
        /// Display name
        name: String,
    },

    /// A track could not be fetched or opened; the player stays idle
    TrackLoadFailed {
        /// Display name
        name: String,
        /// Human readable reason
        message: String,
    },

    /// A finished track had no successor
    PlaylistEnded,

    /// The engine asked to terminate in response to input
    TerminateRequested,
}

/// Signals raised on the audio thread for the control thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSignal {
    /// The session with this generation reached end of track
    Finished {
        /// Generation of the session that finished
        generation: u64,
    },
}

/// Pending events, queued in emission order
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<PlaybackEvent>,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event
    pub fn emit(&mut self, event: PlaybackEvent) {
        self.pending.push(event);
    }

    /// Take all events queued since the last drain
    pub fn drain(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Whether events are waiting
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
