//! Decoding engine capability
//!
//! The player never decodes anything itself. A [`Decoder`] turns the bytes of
//! a track into an [`EngineHandle`]; the handle renders PCM on the audio
//! thread and answers key batches and visualization requests on the control
//! thread. Releasing a handle is dropping it.

use std::sync::Arc;

use crate::error::Result;
use crate::visual::VisualSink;

/// Outcome of one [`EngineHandle::pull`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// Frames written; fewer than requested also means end of track
    Frames(usize),

    /// The track ended after writing this many frames
    EndOfTrack(usize),
}

impl Pull {
    /// Frames actually written into the output slices
    pub fn frames(self) -> usize {
        match self {
            Pull::Frames(n) | Pull::EndOfTrack(n) => n,
        }
    }

    /// Whether the track is over, given how many frames were requested
    pub fn is_end(self, requested: usize) -> bool {
        match self {
            Pull::Frames(n) => n < requested,
            Pull::EndOfTrack(_) => true,
        }
    }
}

/// Factory for engine handles
pub trait Decoder: Send {
    /// Open a track for rendering at `sample_rate`
    ///
    /// `data` is shared with the track source; keep it instead of copying.
    ///
    /// # Errors
    /// Returns [`crate::PlaybackError::EngineCreate`] when the data is not
    /// something this engine can play.
    fn create(&mut self, sample_rate: u32, name: &str, data: Arc<[u8]>)
        -> Result<Box<dyn EngineHandle>>;
}

/// A live decoding session
///
/// `pull` runs on the real-time audio thread and must not allocate, block
/// or perform I/O. The other methods run on the control thread.
pub trait EngineHandle: Send {
    /// Render up to `left.len()` frames (`left.len() == right.len()`)
    ///
    /// `sample_rate` is the session rate; any rate conversion is the
    /// engine's business.
    fn pull(&mut self, left: &mut [f32], right: &mut [f32], sample_rate: u32) -> Pull;

    /// Apply a batch of key identifiers in arrival order
    ///
    /// Returns `true` when the engine wants the session terminated.
    fn apply_input(&mut self, keys: &[String]) -> bool;

    /// Draw the current engine state, one call per output line
    ///
    /// Runs while the audio thread is locked out; draw, do not wait.
    fn display(&mut self, sink: &mut dyn VisualSink);
}
