//! modplay - Playback Orchestration
//!
//! Platform-agnostic playback orchestration for modplay.
//!
//! This crate provides:
//! - Play/pause/stop state machine around one decoding-engine handle
//! - Real-time safe audio renderer (silence on idle, underrun or contention)
//! - Playlist with bounds-checked next/previous and auto-advance
//! - Key batching between frame ticks, forwarded to the engine
//! - Visualization refresh throttled to a target frame rate
//!
//! # Architecture
//!
//! `modplay-playback` knows nothing about audio devices, terminals or file
//! formats. Those arrive as injected capabilities:
//! - [`Decoder`] / [`EngineHandle`] turn track bytes into PCM and react to keys
//! - [`VisualSink`] receives the engine's text display
//! - [`TrackSource`] fetches track bytes asynchronously
//!
//! [`Player::new`] returns the player (control thread) and an
//! [`AudioRenderer`] (audio thread). The two halves share the engine slot
//! and the playing flag; the renderer never blocks on the control side.
//!
//! # Example
//!
//! ```rust
//! use modplay_playback::{
//!     Decoder, EngineHandle, InlineSource, NullSink, Player, PlayerConfig, Pull, Result,
//!     Track, VisualSink,
//! };
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! struct Tone;
//!
//! impl EngineHandle for Tone {
//!     fn pull(&mut self, left: &mut [f32], right: &mut [f32], _rate: u32) -> Pull {
//!         left.fill(0.1);
//!         right.fill(0.1);
//!         Pull::Frames(left.len())
//!     }
//!
//!     fn apply_input(&mut self, keys: &[String]) -> bool {
//!         keys.iter().any(|k| k == "q")
//!     }
//!
//!     fn display(&mut self, sink: &mut dyn VisualSink) {
//!         sink.draw_line("tone");
//!     }
//! }
//!
//! struct ToneDecoder;
//!
//! impl Decoder for ToneDecoder {
//!     fn create(&mut self, _rate: u32, _name: &str, _data: Arc<[u8]>) -> Result<Box<dyn EngineHandle>> {
//!         Ok(Box::new(Tone))
//!     }
//! }
//!
//! let (mut player, mut renderer) = Player::new(
//!     PlayerConfig::with_sample_rate(44_100),
//!     Box::new(ToneDecoder),
//!     Box::new(InlineSource::new()),
//!     Box::new(NullSink),
//! )?;
//!
//! player.load_files(vec![Track::from_bytes("tone.mod", vec![0u8])]);
//! player.tick(Instant::now());
//! assert!(player.is_playing());
//!
//! // On the audio thread:
//! let mut out = vec![0.0f32; 512 * 2];
//! renderer.render_interleaved(&mut out, 2);
//! assert!(out.iter().all(|s| *s == 0.1));
//! # Ok::<(), modplay_playback::PlaybackError>(())
//! ```

mod engine;
mod error;
mod events;
mod input;
mod player;
mod playlist;
mod renderer;
mod session;
mod source;
pub mod types;
mod visual;

// Public exports
pub use engine::{Decoder, EngineHandle, Pull};
pub use error::{PlaybackError, Result};
pub use events::{AudioSignal, EventQueue, PlaybackEvent};
pub use input::InputQueue;
pub use player::Player;
pub use playlist::Playlist;
pub use renderer::AudioRenderer;
pub use session::PlaybackSession;
pub use source::{read_track, InlineSource, LoadRequest, LoadedTrack, TrackSource};
pub use types::{
    DropItem, DropPayload, PlaybackState, PlayerConfig, Track, TrackLocation,
    DEFAULT_BLOCK_FRAMES,
};
pub use visual::{DisplayFrame, FrameThrottle, NullSink, Rgb, VisualSink};
