//! Host loop
//!
//! Terminal input arrives on a crossbeam channel from a blocking reader
//! thread. Each iteration drains that channel, ticks the player, reacts to
//! the player's events and redraws the two status rows.

use crate::keys::{classify, pasted_paths, HostAction};
use crate::terminal::draw_status;
use crossbeam_channel::{Receiver, Sender};
use crossterm::event::{self, Event, KeyEvent};
use modplay_playback::{DropPayload, PlaybackEvent, PlaybackState, Player, Track};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const HELP: &str = "space play/pause  n/p next/prev  esc quit";

/// Input delivered by the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Key(KeyEvent),
    /// Bracketed paste, which is how terminals deliver dropped files
    Paste(String),
}

/// Blocking terminal reader running on its own thread
pub struct InputThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InputThread {
    /// Start reading terminal events into `tx`
    pub fn spawn(tx: Sender<HostEvent>) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("terminal-input".into())
            .spawn(move || {
                while !thread_stop.load(Ordering::Relaxed) {
                    let event = match event::poll(Duration::from_millis(100)) {
                        Ok(true) => match event::read() {
                            Ok(Event::Key(key)) => HostEvent::Key(key),
                            Ok(Event::Paste(text)) => HostEvent::Paste(text),
                            Ok(_) => continue,
                            Err(e) => {
                                tracing::error!(error = %e, "Terminal read failed");
                                break;
                            }
                        },
                        Ok(false) => continue,
                        Err(e) => {
                            tracing::error!(error = %e, "Terminal poll failed");
                            break;
                        }
                    };
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for InputThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Esc or Ctrl-C
    UserQuit,
    /// The last track finished
    PlaylistEnded,
    /// The engine asked to terminate
    Terminated,
    /// The input channel closed
    InputClosed,
}

/// The player plus the host's view of it
pub struct App<W: Write> {
    player: Player,
    status: Option<W>,
    message: String,
    exit: Option<ExitReason>,
}

impl<W: Write> App<W> {
    /// `status` receives the two header rows; `None` runs headless
    pub fn new(player: Player, status: Option<W>) -> Self {
        Self {
            player,
            status,
            message: HELP.to_string(),
            exit: None,
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// Set once the loop should stop
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit
    }

    /// Current message row
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Writer receiving the status rows
    pub fn status_writer(&self) -> Option<&W> {
        self.status.as_ref()
    }

    /// React to one terminal event
    pub fn handle(&mut self, event: HostEvent) {
        match event {
            HostEvent::Key(key) => match classify(&key) {
                HostAction::TogglePlayPause => self.player.toggle_play_pause(),
                HostAction::Next => {
                    if !self.player.next() {
                        self.message = "Already at the last track".to_string();
                    }
                }
                HostAction::Prev => {
                    if !self.player.prev() {
                        self.message = "Already at the first track".to_string();
                    }
                }
                HostAction::Quit => {
                    self.player.stop();
                    self.exit = Some(ExitReason::UserQuit);
                }
                HostAction::Forward(key) => self.player.push_key(key),
                HostAction::Ignore => {}
            },
            HostEvent::Paste(text) => {
                let tracks: Vec<Track> = pasted_paths(&text).into_iter().map(Track::from_path).collect();
                if tracks.is_empty() {
                    tracing::debug!("Paste contained no files");
                    self.message = "Nothing playable in paste".to_string();
                } else {
                    self.player.on_drop(DropPayload::from_files(tracks));
                }
            }
        }
    }

    /// One iteration: tick, react to player events, redraw the status rows
    ///
    /// Returns the events the player emitted.
    pub fn step(&mut self, now: Instant) -> Vec<PlaybackEvent> {
        self.player.tick(now);
        let events = self.player.drain_events();

        for event in &events {
            match event {
                PlaybackEvent::TrackStarted { name, .. } => {
                    tracing::info!(track = %name, "Now playing");
                    self.message = HELP.to_string();
                }
                PlaybackEvent::TrackLoadFailed { name, message } => {
                    tracing::warn!(track = %name, error = %message, "Track could not be played");
                    self.message = format!("Could not play {name}: {message}");
                }
                PlaybackEvent::TrackFinished { name } => {
                    tracing::debug!(track = %name, "Track finished");
                }
                PlaybackEvent::PlaylistEnded => {
                    tracing::info!("Playlist ended");
                    self.exit.get_or_insert(ExitReason::PlaylistEnded);
                }
                PlaybackEvent::TerminateRequested => {
                    tracing::info!("Engine requested exit");
                    self.exit.get_or_insert(ExitReason::Terminated);
                }
                PlaybackEvent::StateChanged { .. } => {}
            }
        }

        self.redraw_status();
        events
    }

    /// Top status row
    pub fn status_line(&self) -> String {
        let state = match self.player.state() {
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::Idle if self.player.is_loading() => "Loading",
            PlaybackState::Idle => "Stopped",
        };
        let playlist = self.player.playlist();
        // Arrows mark where p and n can still go
        let position = playlist
            .cursor()
            .map(|i| {
                let back = if playlist.has_previous() { "< " } else { "" };
                let forward = if playlist.has_next() { " >" } else { "" };
                format!("{back}{}/{}{forward}", i + 1, playlist.len())
            })
            .unwrap_or_else(|| "-/-".to_string());
        let name = self.player.current_track().map_or("", |t| t.name.as_str());
        format!("{state}  {position}  {name}")
    }

    fn redraw_status(&mut self) {
        let top = self.status_line();
        if let Some(out) = self.status.as_mut() {
            let result = draw_status(out, 0, &top).and_then(|()| draw_status(out, 1, &self.message));
            if let Err(e) = result {
                tracing::warn!(error = %e, "Status redraw failed");
                self.status = None;
            }
        }
    }

    /// Run until quit, end of playlist or engine exit
    pub fn run(&mut self, input: &Receiver<HostEvent>, tick: Duration) -> ExitReason {
        loop {
            loop {
                match input.try_recv() {
                    Ok(event) => self.handle(event),
                    Err(crossbeam_channel::TryRecvError::Empty) => break,
                    Err(crossbeam_channel::TryRecvError::Disconnected) => {
                        self.exit.get_or_insert(ExitReason::InputClosed);
                        break;
                    }
                }
            }

            self.step(Instant::now());

            if let Some(reason) = self.exit {
                self.player.stop();
                return reason;
            }
            std::thread::sleep(tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use modplay_playback::{
        Decoder, EngineHandle, InlineSource, NullSink, PlayerConfig, Pull, Result, VisualSink,
    };

    struct Silence {
        frames: usize,
    }

    impl EngineHandle for Silence {
        fn pull(&mut self, left: &mut [f32], right: &mut [f32], _rate: u32) -> Pull {
            let n = left.len().min(self.frames);
            left[..n].fill(0.0);
            right[..n].fill(0.0);
            self.frames -= n;
            Pull::Frames(n)
        }

        fn apply_input(&mut self, keys: &[String]) -> bool {
            keys.iter().any(|k| k == "q")
        }

        fn display(&mut self, _sink: &mut dyn VisualSink) {}
    }

    struct SilenceDecoder;

    impl Decoder for SilenceDecoder {
        fn create(&mut self, _rate: u32, _name: &str, data: Arc<[u8]>) -> Result<Box<dyn EngineHandle>> {
            Ok(Box::new(Silence { frames: data.len() }))
        }
    }

    fn app() -> (App<Vec<u8>>, modplay_playback::AudioRenderer) {
        let (player, renderer) = Player::new(
            PlayerConfig::with_sample_rate(48_000),
            Box::new(SilenceDecoder),
            Box::new(InlineSource::new()),
            Box::new(NullSink),
        )
        .unwrap();
        (App::new(player, Some(Vec::new())), renderer)
    }

    fn key(code: KeyCode) -> HostEvent {
        HostEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn loaded_playlist_shows_in_status() {
        let (mut app, _renderer) = app();
        app.player_mut().load_files(vec![
            Track::from_bytes("a.wav", vec![0u8; 16]),
            Track::from_bytes("b.wav", vec![0u8; 16]),
        ]);
        app.step(Instant::now());

        assert_eq!(app.status_line(), "Playing  1/2 >  a.wav");
        let written = String::from_utf8_lossy(app.status_writer().unwrap()).into_owned();
        assert!(written.contains("Playing  1/2 >  a.wav"));
        assert!(written.contains(HELP));
    }

    #[test]
    fn space_pauses_and_n_advances() {
        let (mut app, _renderer) = app();
        app.player_mut().load_files(vec![
            Track::from_bytes("a.wav", vec![0u8; 16]),
            Track::from_bytes("b.wav", vec![0u8; 16]),
        ]);
        app.step(Instant::now());

        app.handle(key(KeyCode::Char(' ')));
        assert_eq!(app.player().state(), PlaybackState::Paused);

        app.handle(key(KeyCode::Char('n')));
        app.step(Instant::now());
        assert_eq!(app.player().track_name(), Some("b.wav"));
        assert_eq!(app.status_line(), "Playing  < 2/2  b.wav");

        app.handle(key(KeyCode::Char('n')));
        assert_eq!(app.message(), "Already at the last track");
    }

    #[test]
    fn escape_quits() {
        let (mut app, _renderer) = app();
        app.handle(key(KeyCode::Esc));
        assert_eq!(app.exit_reason(), Some(ExitReason::UserQuit));
    }

    #[test]
    fn engine_terminate_ends_the_loop() {
        let (mut app, _renderer) = app();
        app.player_mut().load_files(vec![Track::from_bytes("a.wav", vec![0u8; 16])]);
        app.step(Instant::now());

        app.handle(key(KeyCode::Char('q')));
        let events = app.step(Instant::now());

        assert!(events.contains(&PlaybackEvent::TerminateRequested));
        assert_eq!(app.exit_reason(), Some(ExitReason::Terminated));
    }

    #[test]
    fn paste_without_files_keeps_playlist() {
        let (mut app, _renderer) = app();
        app.handle(HostEvent::Paste("just some text".into()));
        assert!(app.player().playlist().is_empty());
        assert_eq!(app.message(), "Nothing playable in paste");
    }

    #[test]
    fn closed_input_ends_run() {
        let (mut app, _renderer) = app();
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(key(KeyCode::Char(' '))).unwrap();
        drop(tx);

        let reason = app.run(&rx, Duration::from_millis(1));
        assert_eq!(reason, ExitReason::InputClosed);
    }
}
