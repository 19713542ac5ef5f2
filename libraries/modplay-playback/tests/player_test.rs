//! Integration tests for the player
//!
//! Every test drives the public surface the way a host does: transport
//! calls, `tick`, the audio renderer and the event drain.

use modplay_playback::{
    AudioRenderer, Decoder, DropItem, DropPayload, EngineHandle, InlineSource, LoadRequest,
    LoadedTrack, PlaybackError, PlaybackEvent, PlaybackState, Player, PlayerConfig, Pull, Result,
    Rgb, Track, TrackSource, VisualSink,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ===== Test Helpers =====

/// Shared record of everything the mocks saw
#[derive(Clone, Default)]
struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    pulls: Arc<AtomicUsize>,
}

impl Recorder {
    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }
}

/// Engine producing a constant signal for `length` frames
struct MockEngine {
    name: String,
    position: usize,
    length: usize,
    recorder: Recorder,
}

impl EngineHandle for MockEngine {
    fn pull(&mut self, left: &mut [f32], right: &mut [f32], _rate: u32) -> Pull {
        self.recorder.pulls.fetch_add(1, Ordering::SeqCst);
        let n = (self.length - self.position).min(left.len());
        left[..n].fill(0.25);
        right[..n].fill(-0.25);
        self.position += n;
        if n < left.len() {
            Pull::EndOfTrack(n)
        } else {
            Pull::Frames(n)
        }
    }

    fn apply_input(&mut self, keys: &[String]) -> bool {
        self.recorder.batches.lock().unwrap().push(keys.to_vec());
        keys.iter().any(|k| k == "q")
    }

    fn display(&mut self, sink: &mut dyn VisualSink) {
        sink.draw_line(&self.name);
        sink.draw_line_with_background("meter", Rgb::new(0, 128, 0));
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.recorder
            .log
            .lock()
            .unwrap()
            .push(format!("release {}", self.name));
    }
}

struct MockDecoder {
    lengths: HashMap<String, usize>,
    recorder: Recorder,
}

impl Decoder for MockDecoder {
    fn create(&mut self, _rate: u32, name: &str, data: Arc<[u8]>) -> Result<Box<dyn EngineHandle>> {
        if data.is_empty() {
            return Err(PlaybackError::engine(name, "not a module"));
        }
        self.recorder
            .log
            .lock()
            .unwrap()
            .push(format!("create {name}"));
        Ok(Box::new(MockEngine {
            name: name.to_string(),
            position: 0,
            length: self.lengths.get(name).copied().unwrap_or(usize::MAX),
            recorder: self.recorder.clone(),
        }))
    }
}

/// Sink counting refreshes and resets
#[derive(Clone, Default)]
struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
    frames: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
}

impl VisualSink for RecordingSink {
    fn draw_line(&mut self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }

    fn draw_line_with_background(&mut self, text: &str, _color: Rgb) {
        self.lines.lock().unwrap().push(format!("[bg] {text}"));
    }

    fn begin_frame(&mut self) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.lines.lock().unwrap().clear();
    }
}

/// Source that only answers when the test says so
#[derive(Clone, Default)]
struct ManualSource {
    requests: Arc<Mutex<VecDeque<LoadRequest>>>,
    ready: Arc<Mutex<VecDeque<LoadedTrack>>>,
}

impl ManualSource {
    fn complete_oldest(&self) {
        let request = self.requests.lock().unwrap().pop_front().unwrap();
        let data: Arc<[u8]> = Arc::from(vec![1u8]);
        self.ready.lock().unwrap().push_back(LoadedTrack {
            id: request.id,
            name: request.track.name,
            outcome: Ok(data),
        });
    }

    fn pending(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl TrackSource for ManualSource {
    fn request(&mut self, request: LoadRequest) {
        self.requests.lock().unwrap().push_back(request);
    }

    fn poll_ready(&mut self) -> Option<LoadedTrack> {
        self.ready.lock().unwrap().pop_front()
    }
}

struct Harness {
    player: Player,
    renderer: AudioRenderer,
    recorder: Recorder,
    sink: RecordingSink,
}

fn harness_with(lengths: &[(&str, usize)], source: Box<dyn TrackSource>) -> Harness {
    let recorder = Recorder::default();
    let sink = RecordingSink::default();
    let decoder = MockDecoder {
        lengths: lengths
            .iter()
            .map(|(name, len)| (name.to_string(), *len))
            .collect(),
        recorder: recorder.clone(),
    };
    let (player, renderer) = Player::new(
        PlayerConfig::with_sample_rate(44_100),
        Box::new(decoder),
        source,
        Box::new(sink.clone()),
    )
    .unwrap();
    Harness {
        player,
        renderer,
        recorder,
        sink,
    }
}

fn harness(lengths: &[(&str, usize)]) -> Harness {
    harness_with(lengths, Box::new(InlineSource::new()))
}

fn tracks(names: &[&str]) -> Vec<Track> {
    names
        .iter()
        .map(|name| Track::from_bytes(*name, vec![1u8]))
        .collect()
}

fn render_block(renderer: &mut AudioRenderer) -> Vec<f32> {
    let mut out = vec![0.5f32; 4096 * 2];
    renderer.render_interleaved(&mut out, 2);
    out
}

// ===== Navigation Scenarios =====

#[test]
fn next_twice_releases_each_track_before_its_successor() {
    let mut h = harness(&[]);
    let now = Instant::now();

    h.player.load_files(tracks(&["A", "B", "C"]));
    h.player.tick(now);
    assert_eq!(h.player.track_name(), Some("A"));

    assert!(h.player.next());
    h.player.tick(now);
    assert!(h.player.next());
    h.player.tick(now);

    assert_eq!(h.player.playlist().cursor(), Some(2));
    assert_eq!(h.player.state(), PlaybackState::Playing);
    assert_eq!(
        h.recorder.log(),
        vec!["create A", "release A", "create B", "release B", "create C"]
    );

    assert!(!h.player.next());
    assert_eq!(h.player.playlist().cursor(), Some(2));
    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert_eq!(h.recorder.log().last().map(String::as_str), Some("release C"));
}

#[test]
fn prev_at_first_track_still_stops() {
    let mut h = harness(&[]);
    h.player.load_files(tracks(&["A", "B"]));
    h.player.tick(Instant::now());
    h.player.drain_events();

    assert!(!h.player.prev());

    assert_eq!(h.player.playlist().cursor(), Some(0));
    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert_eq!(
        h.player.drain_events(),
        vec![PlaybackEvent::StateChanged { playing: false }]
    );
    assert_eq!(h.recorder.log(), vec!["create A", "release A"]);
}

#[test]
fn prev_moves_back_and_reloads() {
    let mut h = harness(&[]);
    let now = Instant::now();
    h.player.load_files(tracks(&["A", "B"]));
    h.player.tick(now);
    h.player.next();
    h.player.tick(now);

    assert!(h.player.prev());
    h.player.tick(now);

    assert_eq!(h.player.playlist().cursor(), Some(0));
    assert_eq!(h.player.track_name(), Some("A"));
    assert!(h.player.is_playing());
}

#[test]
fn start_twice_never_holds_two_handles() {
    let mut h = harness(&[]);

    assert!(h.player.start("A", &[1]));
    assert!(h.player.start("B", &[1]));

    assert_eq!(h.recorder.log(), vec!["create A", "release A", "create B"]);
    assert_eq!(h.sink.resets.load(Ordering::SeqCst), 2);
}

#[test]
fn new_selection_replaces_playlist_and_stops_current_track() {
    let mut h = harness(&[]);
    let now = Instant::now();
    h.player.load_files(tracks(&["A", "B"]));
    h.player.tick(now);
    h.player.next();
    h.player.tick(now);

    assert!(h.player.load_files(tracks(&["X"])));
    assert_eq!(h.player.state(), PlaybackState::Idle);
    h.player.tick(now);

    assert_eq!(h.player.playlist().len(), 1);
    assert_eq!(h.player.playlist().cursor(), Some(0));
    assert_eq!(h.player.track_name(), Some("X"));
}

#[test]
fn drop_payload_loads_only_files() {
    let mut h = harness(&[]);
    let payload = DropPayload {
        items: vec![
            DropItem::Text("not a file".to_string()),
            DropItem::File(Track::from_bytes("A", vec![1u8])),
        ],
    };

    assert!(h.player.on_drop(payload));
    h.player.tick(Instant::now());

    assert_eq!(h.player.playlist().len(), 1);
    assert_eq!(h.player.track_name(), Some("A"));

    let text_only = DropPayload {
        items: vec![DropItem::Text("https://example.org/a.mod".to_string())],
    };
    assert!(!h.player.on_drop(text_only));
    assert_eq!(h.player.track_name(), Some("A"));
}

// ===== Track Lifecycle =====

#[test]
fn load_emits_started_then_playing() {
    let mut h = harness(&[]);
    h.player.load_files(tracks(&["A"]));
    h.player.tick(Instant::now());

    assert_eq!(
        h.player.drain_events(),
        vec![
            PlaybackEvent::StateChanged { playing: false },
            PlaybackEvent::TrackStarted {
                name: "A".to_string(),
                index: 0
            },
            PlaybackEvent::StateChanged { playing: true },
        ]
    );
    assert!(!h.player.has_pending_events());
}

#[test]
fn end_of_track_advances_to_next_track() {
    let mut h = harness(&[("A", 2000)]);
    let now = Instant::now();
    h.player.load_files(tracks(&["A", "B"]));
    h.player.tick(now);
    h.player.drain_events();

    let out = render_block(&mut h.renderer);
    assert!(out[..2000 * 2].chunks_exact(2).all(|f| f == [0.25, -0.25]));
    assert!(out[2000 * 2..].iter().all(|s| *s == 0.0));
    assert!(!h.player.is_playing());

    h.player.tick(now);
    assert_eq!(
        h.player.drain_events(),
        vec![
            PlaybackEvent::TrackFinished {
                name: "A".to_string()
            },
            PlaybackEvent::StateChanged { playing: false },
        ]
    );
    assert!(h.player.is_loading());

    h.player.tick(now);
    assert_eq!(h.player.track_name(), Some("B"));
    assert_eq!(h.player.playlist().cursor(), Some(1));
    assert!(h.player.is_playing());
}

#[test]
fn end_of_last_track_ends_playlist_without_looping() {
    let mut h = harness(&[("A", 10)]);
    let now = Instant::now();
    h.player.load_files(tracks(&["A"]));
    h.player.tick(now);
    h.player.drain_events();

    render_block(&mut h.renderer);
    h.player.tick(now);

    assert_eq!(
        h.player.drain_events(),
        vec![
            PlaybackEvent::TrackFinished {
                name: "A".to_string()
            },
            PlaybackEvent::StateChanged { playing: false },
            PlaybackEvent::PlaylistEnded,
        ]
    );
    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert_eq!(h.player.playlist().cursor(), Some(0));
    assert!(!h.player.is_loading());
}

#[test]
fn finish_from_superseded_track_is_ignored() {
    let mut h = harness(&[("A", 10)]);
    let now = Instant::now();
    h.player.load_files(tracks(&["A", "B", "C"]));
    h.player.tick(now);

    // A ends, but the user navigates before the frame loop sees it
    render_block(&mut h.renderer);
    h.player.next();
    h.player.tick(now);

    assert_eq!(h.player.track_name(), Some("B"));
    assert_eq!(h.player.playlist().cursor(), Some(1));
    assert!(h.player.is_playing());
    assert!(!h
        .player
        .drain_events()
        .iter()
        .any(|e| matches!(e, PlaybackEvent::TrackFinished { .. })));
}

#[test]
fn failed_fetch_leaves_player_idle() {
    let mut h = harness(&[]);
    h.player
        .load_files(vec![Track::from_path("/no/such/dir/missing.xm")]);
    h.player.tick(Instant::now());

    assert_eq!(h.player.state(), PlaybackState::Idle);
    let events = h.player.drain_events();
    assert!(events.iter().any(
        |e| matches!(e, PlaybackEvent::TrackLoadFailed { name, .. } if name == "missing.xm")
    ));
    assert!(h.recorder.log().is_empty());
}

#[test]
fn engine_rejection_leaves_player_idle() {
    let mut h = harness(&[]);
    h.player
        .load_files(vec![Track::from_bytes("empty.mod", Vec::<u8>::new())]);
    h.player.tick(Instant::now());

    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert!(h
        .player
        .drain_events()
        .iter()
        .any(|e| matches!(e, PlaybackEvent::TrackLoadFailed { name, .. } if name == "empty.mod")));
}

#[test]
fn only_latest_request_is_honoured() {
    let source = ManualSource::default();
    let mut h = harness_with(&[], Box::new(source.clone()));
    let now = Instant::now();

    h.player.load_files(tracks(&["A", "B", "C"]));
    h.player.next();
    h.player.next();
    assert_eq!(source.pending(), 3);

    // answers arrive out of the user's sight, oldest first
    source.complete_oldest();
    source.complete_oldest();
    source.complete_oldest();
    h.player.tick(now);

    assert_eq!(h.recorder.log(), vec!["create C"]);
    assert_eq!(h.player.track_name(), Some("C"));
}

#[test]
fn stop_abandons_inflight_load() {
    let source = ManualSource::default();
    let mut h = harness_with(&[], Box::new(source.clone()));

    h.player.load_files(tracks(&["A"]));
    h.player.stop();
    source.complete_oldest();
    h.player.tick(Instant::now());

    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert!(h.recorder.log().is_empty());
}

// ===== Transport =====

#[test]
fn paused_renderer_is_silent_and_skips_engine() {
    let mut h = harness(&[]);
    h.player.start("A", &[1]);
    h.player.pause();

    let out = render_block(&mut h.renderer);

    assert!(out.iter().all(|s| *s == 0.0));
    assert_eq!(h.recorder.pulls(), 0);

    h.player.play();
    let out = render_block(&mut h.renderer);
    assert!(out.chunks_exact(2).all(|f| f == [0.25, -0.25]));
    assert_eq!(h.recorder.pulls(), 1);
}

#[test]
fn every_play_and_pause_call_notifies_once() {
    let mut h = harness(&[]);
    h.player.start("A", &[1]);
    h.player.drain_events();

    h.player.play();
    h.player.play();
    h.player.pause();
    h.player.toggle_play_pause();

    assert_eq!(
        h.player.drain_events(),
        vec![
            PlaybackEvent::StateChanged { playing: true },
            PlaybackEvent::StateChanged { playing: true },
            PlaybackEvent::StateChanged { playing: false },
            PlaybackEvent::StateChanged { playing: true },
        ]
    );
    assert!(h.player.is_playing());
}

#[test]
fn play_without_track_does_nothing() {
    let mut h = harness(&[]);
    h.player.play();
    h.player.toggle_play_pause();

    assert!(!h.player.is_playing());
    assert!(h.player.drain_events().is_empty());
}

// ===== Input =====

#[test]
fn keys_reach_engine_as_one_ordered_batch_per_tick() {
    let mut h = harness(&[]);
    let now = Instant::now();
    h.player.start("A", &[1]);

    let input = h.player.input();
    input.push("a");
    input.push("ArrowUp");
    h.player.push_key("a");
    h.player.tick(now);
    h.player.tick(now);

    assert_eq!(h.recorder.batches(), vec![vec!["a", "ArrowUp", "a"]]);
    assert!(input.is_empty());
}

#[test]
fn keys_without_a_track_are_discarded() {
    let mut h = harness(&[]);
    let now = Instant::now();

    h.player.push_key("x");
    h.player.tick(now);
    h.player.start("A", &[1]);
    h.player.tick(now);

    assert!(h.recorder.batches().is_empty());
}

#[test]
fn terminate_request_stops_playback() {
    let mut h = harness(&[]);
    h.player.load_files(tracks(&["A", "B"]));
    h.player.tick(Instant::now());
    h.player.drain_events();

    h.player.push_key("q");
    h.player.tick(Instant::now());

    assert_eq!(h.player.state(), PlaybackState::Idle);
    assert_eq!(h.player.playlist().cursor(), Some(0));
    assert_eq!(
        h.player.drain_events(),
        vec![
            PlaybackEvent::StateChanged { playing: false },
            PlaybackEvent::TerminateRequested,
        ]
    );
    assert_eq!(h.recorder.log(), vec!["create A", "release A"]);
}

// ===== Visualization =====

#[test]
fn display_refresh_is_throttled_to_target_fps() {
    let mut h = harness(&[]);
    let start = Instant::now();
    h.player.start("A", &[1]);

    h.player.tick(start);
    h.player.tick(start + Duration::from_millis(10));
    h.player.tick(start + Duration::from_millis(20));
    assert_eq!(h.sink.frames.load(Ordering::SeqCst), 1);

    h.player.tick(start + Duration::from_millis(40));
    assert_eq!(h.sink.frames.load(Ordering::SeqCst), 2);
    assert_eq!(
        h.sink.lines.lock().unwrap().clone(),
        vec!["A", "[bg] meter", "A", "[bg] meter"]
    );
}

#[test]
fn input_is_not_throttled_with_display() {
    let mut h = harness(&[]);
    let start = Instant::now();
    h.player.start("A", &[1]);

    h.player.tick(start);
    h.player.push_key("1");
    h.player.tick(start + Duration::from_millis(1));
    h.player.push_key("2");
    h.player.tick(start + Duration::from_millis(2));

    assert_eq!(h.sink.frames.load(Ordering::SeqCst), 1);
    assert_eq!(h.recorder.batches(), vec![vec!["1"], vec!["2"]]);
}

#[test]
fn no_refresh_while_paused() {
    let mut h = harness(&[]);
    let start = Instant::now();
    h.player.start("A", &[1]);
    h.player.pause();

    h.player.tick(start);
    h.player.tick(start + Duration::from_secs(1));

    assert_eq!(h.sink.frames.load(Ordering::SeqCst), 0);
}

#[test]
fn starting_a_track_resets_the_display() {
    let mut h = harness(&[]);
    h.player.start("A", &[1]);
    h.player.tick(Instant::now());
    assert!(!h.sink.lines.lock().unwrap().is_empty());

    h.player.start("B", &[1]);
    assert!(h.sink.lines.lock().unwrap().is_empty());
}
