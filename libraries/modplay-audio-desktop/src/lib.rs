//! Desktop audio output for modplay using CPAL
//!
//! This crate drives a [`modplay_playback::AudioRenderer`] from a CPAL output
//! stream and provides a background file loader for the player.
//!
//! # Features
//!
//! - Output device enumeration and selection by name
//! - f32, i16 and u16 device formats
//! - Fixed device buffer sized to the player's block when supported
//! - Track files read on a background thread
//!
//! # Example
//!
//! ```no_run
//! use modplay_audio_desktop::{FileTrackLoader, OutputDevice};
//! use modplay_playback::{Decoder, NullSink, Player, PlayerConfig};
//!
//! # fn run(decoder: Box<dyn Decoder>) -> Result<(), Box<dyn std::error::Error>> {
//! let device = OutputDevice::open(None)?;
//!
//! let (mut player, renderer) = Player::new(
//!     PlayerConfig::with_sample_rate(device.sample_rate()),
//!     decoder,
//!     Box::new(FileTrackLoader::new()?),
//!     Box::new(NullSink),
//! )?;
//! let _output = device.start(renderer)?;
//!
//! player.load_files(vec![modplay_playback::Track::from_path("song.wav")]);
//! # Ok(())
//! # }
//! ```

mod device;
mod error;
mod output;
mod track_loader;

pub use device::{find_output_device, list_output_devices, DeviceInfo};
pub use error::{AudioError, Result};
pub use output::{CpalOutput, OutputDevice};
pub use track_loader::FileTrackLoader;
