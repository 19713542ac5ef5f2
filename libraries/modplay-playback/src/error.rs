//! Error types for playback orchestration

use thiserror::Error;

/// Playback errors
///
/// Only environment-level failures are errors. Exhausted playlists, end of
/// track and engine-requested termination are ordinary state transitions.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The decoding engine rejected the track data
    #[error("Engine failed to open {name}: {reason}")]
    EngineCreate {
        /// Display name of the track
        name: String,
        /// Engine-provided reason
        reason: String,
    },

    /// Track bytes could not be acquired
    #[error("Failed to load track {name}: {reason}")]
    TrackLoad {
        /// Display name of the track
        name: String,
        /// Source-provided reason
        reason: String,
    },

    /// Invalid player configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlaybackError {
    /// Build an [`PlaybackError::EngineCreate`] from any displayable reason
    pub fn engine(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::EngineCreate {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`PlaybackError::TrackLoad`] from any displayable reason
    pub fn load(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::TrackLoad {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
