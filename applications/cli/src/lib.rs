//! modplay terminal player
//!
//! The pieces of the `modplay` binary, kept in a library so they can be
//! tested without a terminal or an audio device:
//! - [`config`]: layered settings (defaults, TOML file, environment, flags)
//! - [`engine`]: symphonia-backed reference engine
//! - [`keys`]: key classification and pasted file paths
//! - [`terminal`]: crossterm visualization sink and terminal guard
//! - [`app`]: the host loop tying input, player and status rows together

pub mod app;
pub mod config;
pub mod engine;
pub mod keys;
pub mod terminal;

pub use app::{App, ExitReason, HostEvent, InputThread};
pub use config::{CliOverrides, Settings};
pub use engine::{decode_pcm, Pcm, PcmDecoder, PcmEngine};
