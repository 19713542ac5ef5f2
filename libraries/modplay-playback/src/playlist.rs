//! Playlist navigator
//!
//! An ordered list of tracks plus a cursor. The list is replaced wholesale
//! on every new selection; only the cursor ever moves in place.

use crate::types::Track;

/// Ordered tracks with a bounds-checked cursor
///
/// ```text
///   [ A ][ B ][ C ]
///          ^ cursor = 1
/// ```
///
/// The cursor is `None` exactly when the playlist is empty.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    cursor: Option<usize>,
}

impl Playlist {
    /// Create an empty playlist
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all tracks and rewind the cursor to the first one
    ///
    /// An empty selection leaves the current playlist untouched and
    /// returns false.
    pub fn replace(&mut self, tracks: Vec<Track>) -> bool {
        if tracks.is_empty() {
            return false;
        }
        self.tracks = tracks;
        self.cursor = Some(0);
        true
    }

    /// Track under the cursor
    pub fn current(&self) -> Option<&Track> {
        self.cursor.and_then(|index| self.tracks.get(index))
    }

    /// Cursor position
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Move the cursor forward; false at the last track
    pub fn advance(&mut self) -> bool {
        match self.cursor {
            Some(index) if index + 1 < self.tracks.len() => {
                self.cursor = Some(index + 1);
                true
            }
            _ => false,
        }
    }

    /// Move the cursor back; false at the first track
    pub fn retreat(&mut self) -> bool {
        match self.cursor {
            Some(index) if index >= 1 => {
                self.cursor = Some(index - 1);
                true
            }
            _ => false,
        }
    }

    /// Whether a track follows the current one
    pub fn has_next(&self) -> bool {
        self.cursor
            .is_some_and(|index| index + 1 < self.tracks.len())
    }

    /// Whether a track precedes the current one
    pub fn has_previous(&self) -> bool {
        self.cursor.is_some_and(|index| index >= 1)
    }

    /// All tracks in order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether there are no tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
