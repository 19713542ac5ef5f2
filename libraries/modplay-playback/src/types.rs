//! Core types for playback orchestration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{PlaybackError, Result};

/// Where the bytes of a track come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackLocation {
    /// File on the local filesystem
    Path(PathBuf),

    /// Bytes that were already acquired (e.g. a drop payload)
    Memory(Arc<[u8]>),
}

/// One playlist entry
///
/// Immutable once created. The bytes are only fetched when the track
/// becomes current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Display name
    pub name: String,

    /// Byte source
    pub location: TrackLocation,
}

impl Track {
    /// Track backed by a file; the display name is the file name
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            location: TrackLocation::Path(path),
        }
    }

    /// Track backed by bytes already in memory
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            location: TrackLocation::Memory(data.into()),
        }
    }
}

/// Playback state as seen by the control side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No engine handle
    Idle,

    /// Engine handle present and audio flowing
    Playing,

    /// Engine handle present, output silent
    Paused,
}

/// One entry of a drag-and-drop payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropItem {
    /// A file the user dropped
    File(Track),

    /// Anything that is not a file (text, URLs, ...)
    Text(String),
}

/// Drag-and-drop payload handed over by the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropPayload {
    /// Dropped items in drop order
    pub items: Vec<DropItem>,
}

impl DropPayload {
    /// Payload made only of files
    pub fn from_files(tracks: impl IntoIterator<Item = Track>) -> Self {
        Self {
            items: tracks.into_iter().map(DropItem::File).collect(),
        }
    }

    /// Keep the file items, in order
    pub fn into_tracks(self) -> Vec<Track> {
        self.items
            .into_iter()
            .filter_map(|item| match item {
                DropItem::File(track) => Some(track),
                DropItem::Text(_) => None,
            })
            .collect()
    }
}

/// Default frames per audio callback block
pub const DEFAULT_BLOCK_FRAMES: usize = 4096;

/// Configuration for the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Sample rate the engine renders at (the output device rate)
    pub sample_rate: u32,

    /// Frames per render block (default: 4096)
    #[serde(default = "default_block_frames")]
    pub block_frames: usize,

    /// Visualization refresh rate (default: 30)
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,

    /// Capacity of the audio-to-control signal channel (default: 8)
    #[serde(default = "default_signal_capacity")]
    pub signal_capacity: usize,
}

fn default_block_frames() -> usize {
    DEFAULT_BLOCK_FRAMES
}

fn default_target_fps() -> u32 {
    30
}

fn default_signal_capacity() -> usize {
    8
}

impl PlayerConfig {
    /// Config for the given output sample rate with default timing
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Reject values the player cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(PlaybackError::InvalidConfig(
                "sample rate must be positive".to_string(),
            ));
        }
        if self.block_frames == 0 {
            return Err(PlaybackError::InvalidConfig(
                "block size must be positive".to_string(),
            ));
        }
        if self.target_fps == 0 {
            return Err(PlaybackError::InvalidConfig(
                "target fps must be positive".to_string(),
            ));
        }
        if self.signal_capacity == 0 {
            return Err(PlaybackError::InvalidConfig(
                "signal capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_frames: default_block_frames(),
            target_fps: default_target_fps(),
            signal_capacity: default_signal_capacity(),
        }
    }
}
