//! Playback session - the play/pause/stop state machine
//!
//! ```text
//!            Start            Play
//!   Idle ────────────► Paused ─────► Playing
//!    ▲                   ▲  ◄─────────  │
//!    │                   │    Pause     │
//!    └──── Stop ─────────┴──────────────┘
//! ```
//!
//! The engine handle lives in a slot shared with the audio thread. The
//! control side only ever touches it under the slot lock; the audio side
//! only ever `try_lock`s it, so a swap or release can never happen while a
//! callback is rendering from the handle, and the callback never waits.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::engine::{Decoder, EngineHandle};
use crate::error::Result;
use crate::events::{EventQueue, PlaybackEvent};
use crate::types::PlaybackState;
use crate::visual::DisplayFrame;

/// State shared between the control thread and the audio thread
pub(crate) struct SharedSession {
    pub(crate) engine: Mutex<Option<Box<dyn EngineHandle>>>,
    pub(crate) playing: AtomicBool,
    /// Bumped on every start, read by the audio thread under the slot lock
    pub(crate) generation: AtomicU64,
    pub(crate) sample_rate: u32,
}

impl SharedSession {
    fn new(sample_rate: u32) -> Self {
        Self {
            engine: Mutex::new(None),
            playing: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            sample_rate,
        }
    }
}

/// Control-side view of the active session
///
/// At most one engine handle is alive at a time: [`start`](Self::start) is
/// the only place that creates one and it releases the previous one first.
pub struct PlaybackSession {
    shared: Arc<SharedSession>,
    decoder: Box<dyn Decoder>,
    track_name: Option<String>,
}

impl PlaybackSession {
    /// Create an idle session rendering at `sample_rate`
    pub fn new(sample_rate: u32, decoder: Box<dyn Decoder>) -> Self {
        Self {
            shared: Arc::new(SharedSession::new(sample_rate)),
            decoder,
            track_name: None,
        }
    }

    pub(crate) fn shared(&self) -> Arc<SharedSession> {
        Arc::clone(&self.shared)
    }

    fn slot(&self) -> MutexGuard<'_, Option<Box<dyn EngineHandle>>> {
        self.shared
            .engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the live handle with a new one built from `data`
    ///
    /// Stops (and releases) any current handle before the engine is asked
    /// for a new one. Playback is not started; call [`play`](Self::play).
    pub fn start(&mut self, name: &str, data: Arc<[u8]>, events: &mut EventQueue) -> Result<()> {
        if self.has_handle() {
            self.stop(events);
        }

        let handle = self.decoder.create(self.shared.sample_rate, name, data)?;

        let mut slot = self.slot();
        *slot = Some(handle);
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        drop(slot);

        self.track_name = Some(name.to_string());
        tracing::debug!(track = name, "Engine handle created");
        Ok(())
    }

    /// Set the playing flag
    ///
    /// Without a handle this is a silent no-op. With one it always notifies,
    /// even if already playing.
    pub fn play(&mut self, events: &mut EventQueue) {
        if !self.has_handle() {
            tracing::debug!("Play ignored: no track started");
            return;
        }
        self.shared.playing.store(true, Ordering::Release);
        events.emit(PlaybackEvent::StateChanged { playing: true });
    }

    /// Clear the playing flag and notify
    pub fn pause(&mut self, events: &mut EventQueue) {
        self.shared.playing.store(false, Ordering::Release);
        events.emit(PlaybackEvent::StateChanged { playing: false });
    }

    /// Pause, then release the engine handle (idempotent)
    pub fn stop(&mut self, events: &mut EventQueue) {
        self.pause(events);
        let released = self.slot().take();
        if released.is_some() {
            tracing::debug!(track = ?self.track_name, "Engine handle released");
        }
        // dropped outside the slot lock
        drop(released);
        self.track_name = None;
    }

    /// Whether audio is flowing
    ///
    /// The audio thread clears the flag on end of track, so this may turn
    /// false without a control-side call.
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    /// Whether an engine handle is alive
    pub fn has_handle(&self) -> bool {
        self.slot().is_some()
    }

    /// Current state machine state
    pub fn state(&self) -> PlaybackState {
        if !self.has_handle() {
            PlaybackState::Idle
        } else if self.is_playing() {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    /// Generation of the live handle (bumped on every start)
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Sample rate the engine is asked to render at
    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }

    /// Name of the started track
    pub fn track_name(&self) -> Option<&str> {
        self.track_name.as_deref()
    }

    /// Forward a key batch to the engine
    ///
    /// Returns the engine's terminate request; false when there is no handle.
    pub fn apply_input(&mut self, keys: &[String]) -> bool {
        match self.slot().as_mut() {
            Some(engine) => engine.apply_input(keys),
            None => false,
        }
    }

    /// Let the engine draw into `frame`
    ///
    /// Only the capture runs under the slot lock; the caller draws the frame
    /// to the real sink once this returns. False when there is no handle.
    pub fn capture_display(&mut self, frame: &mut DisplayFrame) -> bool {
        frame.clear();
        match self.slot().as_mut() {
            Some(engine) => {
                engine.display(frame);
                true
            }
            None => false,
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        // Release on the control thread even if the renderer outlives us.
        self.shared.playing.store(false, Ordering::Release);
        let released = self.slot().take();
        drop(released);
    }
}
