//! Player - the playback orchestrator
//!
//! Owns the session, the playlist, the input queue and the injected
//! collaborators, and runs everything that happens on the control thread.
//! The audio thread only ever sees the [`AudioRenderer`] returned by
//! [`Player::new`].
//!
//! A host drives the player by calling the transport methods from its UI
//! handlers and [`Player::tick`] once per frame, then draining events:
//!
//! ```text
//!   UI handlers ──► toggle_play_pause / next / prev / load_files / on_drop
//!   key capture ──► InputQueue::push
//!   frame loop  ──► tick(now) ──► drain_events()
//!   audio thread ─► AudioRenderer::render_interleaved
//! ```

use crossbeam_channel::{bounded, Receiver};
use std::sync::Arc;
use std::time::Instant;

use crate::{
    engine::Decoder,
    error::Result,
    events::{AudioSignal, EventQueue, PlaybackEvent},
    input::InputQueue,
    playlist::Playlist,
    renderer::AudioRenderer,
    session::PlaybackSession,
    source::{LoadRequest, LoadedTrack, TrackSource},
    types::{DropPayload, PlaybackState, PlayerConfig, Track},
    visual::{DisplayFrame, FrameThrottle, VisualSink},
};

/// Playback orchestrator
pub struct Player {
    config: PlayerConfig,
    session: PlaybackSession,
    playlist: Playlist,
    input: InputQueue,
    source: Box<dyn TrackSource>,
    visual: Box<dyn VisualSink>,
    /// Engine display captured under the slot lock, drawn after it
    frame: DisplayFrame,
    throttle: FrameThrottle,
    signals: Receiver<AudioSignal>,
    events: EventQueue,

    /// Id handed to the next load request
    next_request_id: u64,

    /// Latest request still in flight; anything else the source answers is stale
    pending_request: Option<u64>,
}

impl Player {
    /// Create a player and the renderer that feeds its audio output
    ///
    /// # Errors
    /// Returns [`crate::PlaybackError::InvalidConfig`] if the config has zero
    /// sample rate, block size, frame rate or signal capacity.
    pub fn new(
        config: PlayerConfig,
        decoder: Box<dyn Decoder>,
        source: Box<dyn TrackSource>,
        visual: Box<dyn VisualSink>,
    ) -> Result<(Self, AudioRenderer)> {
        config.validate()?;

        let session = PlaybackSession::new(config.sample_rate, decoder);
        let (signal_tx, signal_rx) = bounded(config.signal_capacity);
        let renderer = AudioRenderer::new(session.shared(), signal_tx, config.block_frames);

        tracing::debug!(
            sample_rate = config.sample_rate,
            block_frames = config.block_frames,
            fps = config.target_fps,
            "Player created"
        );

        let player = Self {
            throttle: FrameThrottle::new(config.target_fps),
            config,
            session,
            playlist: Playlist::new(),
            input: InputQueue::new(),
            source,
            visual,
            frame: DisplayFrame::new(),
            signals: signal_rx,
            events: EventQueue::new(),
            next_request_id: 1,
            pending_request: None,
        };
        Ok((player, renderer))
    }

    // ===== Transport =====

    /// Pause when playing, play otherwise
    pub fn toggle_play_pause(&mut self) {
        if self.session.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Resume the started track (no-op when nothing is started)
    pub fn play(&mut self) {
        self.session.play(&mut self.events);
    }

    /// Pause output, keeping the track
    pub fn pause(&mut self) {
        self.session.pause(&mut self.events);
    }

    /// Stop and release the current track
    ///
    /// Also abandons a track load that is still in flight.
    pub fn stop(&mut self) {
        if let Some(id) = self.pending_request.take() {
            tracing::debug!(request = id, "Pending load cancelled");
        }
        self.session.stop(&mut self.events);
    }

    /// Whether audio is flowing
    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    /// Current session state
    pub fn state(&self) -> PlaybackState {
        self.session.state()
    }

    // ===== Navigation =====

    /// Stop, then move to the next track and load it
    ///
    /// Returns false at the end of the playlist; playback stays stopped.
    pub fn next(&mut self) -> bool {
        self.stop();
        if self.playlist.advance() {
            self.request_current();
            true
        } else {
            false
        }
    }

    /// Stop, then move to the previous track and load it
    ///
    /// Returns false at the start of the playlist; playback stays stopped.
    pub fn prev(&mut self) -> bool {
        self.stop();
        if self.playlist.retreat() {
            self.request_current();
            true
        } else {
            false
        }
    }

    /// Replace the playlist and load its first track
    ///
    /// An empty selection is ignored and returns false. Otherwise the current
    /// track is stopped right away.
    pub fn load_files(&mut self, tracks: Vec<Track>) -> bool {
        if !self.playlist.replace(tracks) {
            tracing::debug!("Empty selection ignored");
            return false;
        }
        tracing::info!(tracks = self.playlist.len(), "Playlist loaded");
        self.stop();
        self.request_current();
        true
    }

    /// Load the file items of a drop payload as the new playlist
    pub fn on_drop(&mut self, payload: DropPayload) -> bool {
        let dropped = payload.items.len();
        let tracks = payload.into_tracks();
        if tracks.len() < dropped {
            tracing::debug!(skipped = dropped - tracks.len(), "Non-file drop items skipped");
        }
        self.load_files(tracks)
    }

    /// Start a track from bytes that are already in memory, bypassing the
    /// playlist
    ///
    /// Returns whether the engine accepted the data.
    pub fn start(&mut self, name: &str, data: &[u8]) -> bool {
        if let Some(id) = self.pending_request.take() {
            tracing::debug!(request = id, "Pending load superseded");
        }
        let index = self.playlist.cursor().unwrap_or(0);
        self.start_track(name, Arc::from(data), index)
    }

    fn request_current(&mut self) {
        let Some(track) = self.playlist.current().cloned() else {
            return;
        };
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.pending_request = Some(id);

        tracing::debug!(request = id, track = %track.name, "Requesting track");
        self.source.request(LoadRequest { id, track });
    }

    fn start_track(&mut self, name: &str, data: Arc<[u8]>, index: usize) -> bool {
        self.visual.reset();
        match self.session.start(name, data, &mut self.events) {
            Ok(()) => {
                tracing::info!(track = name, index, "Track started");
                self.events.emit(PlaybackEvent::TrackStarted {
                    name: name.to_string(),
                    index,
                });
                self.session.play(&mut self.events);
                true
            }
            Err(e) => {
                tracing::warn!(track = name, error = %e, "Engine rejected track");
                self.events.emit(PlaybackEvent::TrackLoadFailed {
                    name: name.to_string(),
                    message: e.to_string(),
                });
                false
            }
        }
    }

    // ===== Frame loop =====

    /// Run one frame-loop iteration
    ///
    /// In order: finished loads are started, audio signals are handled
    /// (auto-advance on end of track), the input batch is forwarded to the
    /// engine, and the visualization is refreshed if the throttle allows
    /// and audio is playing. The engine draws into a captured frame; the
    /// sink only sees it after the audio thread has the slot back.
    pub fn tick(&mut self, now: Instant) {
        self.collect_loads();
        self.collect_signals();
        self.dispatch_input();

        if self.throttle.ready(now)
            && self.session.is_playing()
            && self.session.capture_display(&mut self.frame)
        {
            self.visual.begin_frame();
            self.frame.replay(self.visual.as_mut());
            self.visual.end_frame();
        }
    }

    fn collect_loads(&mut self) {
        while let Some(loaded) = self.source.poll_ready() {
            self.handle_loaded(loaded);
        }
    }

    fn handle_loaded(&mut self, loaded: LoadedTrack) {
        if self.pending_request != Some(loaded.id) {
            tracing::debug!(request = loaded.id, track = %loaded.name, "Dropping stale load");
            return;
        }
        self.pending_request = None;

        match loaded.outcome {
            Ok(data) => {
                let index = self.playlist.cursor().unwrap_or(0);
                self.start_track(&loaded.name, data, index);
            }
            Err(e) => {
                tracing::warn!(track = %loaded.name, error = %e, "Track load failed");
                self.events.emit(PlaybackEvent::TrackLoadFailed {
                    name: loaded.name,
                    message: e.to_string(),
                });
            }
        }
    }

    fn collect_signals(&mut self) {
        while let Ok(signal) = self.signals.try_recv() {
            match signal {
                AudioSignal::Finished { generation } => self.handle_finished(generation),
            }
        }
    }

    fn handle_finished(&mut self, generation: u64) {
        if generation != self.session.generation() || !self.session.has_handle() {
            tracing::debug!(generation, "Ignoring finish from a superseded track");
            return;
        }

        let name = self.session.track_name().unwrap_or_default().to_string();
        tracing::info!(track = %name, "Track finished");
        self.events.emit(PlaybackEvent::TrackFinished { name });

        if !self.next() {
            tracing::info!("Playlist ended");
            self.events.emit(PlaybackEvent::PlaylistEnded);
        }
    }

    fn dispatch_input(&mut self) {
        let keys = self.input.drain();
        if keys.is_empty() {
            return;
        }
        if !self.session.has_handle() {
            tracing::trace!(keys = keys.len(), "Input discarded: no track started");
            return;
        }
        if self.session.apply_input(&keys) {
            tracing::info!("Engine requested termination");
            self.stop();
            self.events.emit(PlaybackEvent::TerminateRequested);
        }
    }

    // ===== Input, events, queries =====

    /// Handle to the input queue, for the key-capture side
    pub fn input(&self) -> InputQueue {
        self.input.clone()
    }

    /// Queue one key identifier for the next tick
    pub fn push_key(&self, key: impl Into<String>) {
        self.input.push(key);
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain()
    }

    /// Whether events are waiting
    pub fn has_pending_events(&self) -> bool {
        self.events.has_pending()
    }

    /// The playlist
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Track under the playlist cursor
    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.current()
    }

    /// Name of the started track
    pub fn track_name(&self) -> Option<&str> {
        self.session.track_name()
    }

    /// Whether a track load is in flight
    pub fn is_loading(&self) -> bool {
        self.pending_request.is_some()
    }

    /// Configuration the player was built with
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }
}
