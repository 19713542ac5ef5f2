//! Audio render callback
//!
//! The [`AudioRenderer`] is the only piece that runs on the real-time audio
//! thread. It owns preallocated scratch buffers, never allocates, never
//! waits on a lock and always leaves the output fully written: silence is
//! the answer to every idle, contended or underrun condition.

use crossbeam_channel::Sender;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::events::AudioSignal;
use crate::session::SharedSession;

/// Audio-thread half of the player
///
/// Created by [`crate::Player::new`]; move it into the audio backend's
/// callback.
pub struct AudioRenderer {
    shared: Arc<SharedSession>,
    signals: Sender<AudioSignal>,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl AudioRenderer {
    pub(crate) fn new(
        shared: Arc<SharedSession>,
        signals: Sender<AudioSignal>,
        block_frames: usize,
    ) -> Self {
        Self {
            shared,
            signals,
            left: vec![0.0; block_frames],
            right: vec![0.0; block_frames],
        }
    }

    /// Largest block rendered in one engine pull
    pub fn block_frames(&self) -> usize {
        self.left.len()
    }

    /// Sample rate the session renders at
    pub fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }

    /// Fill two planar channel buffers
    ///
    /// Both slices are always written completely. When the engine reports
    /// end of track the unwritten tail is zeroed, the playing flag is
    /// cleared and a finished signal is queued before returning.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        left[frames..].fill(0.0);
        right[frames..].fill(0.0);
        render_block(
            &self.shared,
            &self.signals,
            &mut left[..frames],
            &mut right[..frames],
        );
    }

    /// Fill an interleaved buffer with `channels` channels
    ///
    /// Channel 0 is left and channel 1 is right; mono gets their average and
    /// channels past the second stay silent. Blocks larger than
    /// [`block_frames`](Self::block_frames) are rendered in several pulls.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let chunk = self.left.len();
        if chunk == 0 {
            out.fill(0.0);
            return;
        }

        let total_frames = out.len() / channels;
        out[total_frames * channels..].fill(0.0);

        let mut offset = 0;
        while offset < total_frames {
            let frames = (total_frames - offset).min(chunk);
            let left = &mut self.left[..frames];
            let right = &mut self.right[..frames];
            render_block(&self.shared, &self.signals, left, right);

            let span = &mut out[offset * channels..(offset + frames) * channels];
            for (frame, (l, r)) in span
                .chunks_exact_mut(channels)
                .zip(left.iter().zip(right.iter()))
            {
                if channels == 1 {
                    frame[0] = 0.5 * (l + r);
                } else {
                    frame[0] = *l;
                    frame[1] = *r;
                    frame[2..].fill(0.0);
                }
            }
            offset += frames;
        }
    }
}

fn render_block(
    shared: &SharedSession,
    signals: &Sender<AudioSignal>,
    left: &mut [f32],
    right: &mut [f32],
) {
    if !shared.playing.load(Ordering::Acquire) {
        silence(left, right);
        return;
    }

    // Never wait: the control thread may be swapping or releasing the handle.
    let Ok(mut slot) = shared.engine.try_lock() else {
        silence(left, right);
        return;
    };
    let Some(engine) = slot.as_mut() else {
        silence(left, right);
        return;
    };

    let requested = left.len();
    let pull = engine.pull(left, right, shared.sample_rate);
    let written = pull.frames().min(requested);
    left[written..].fill(0.0);
    right[written..].fill(0.0);

    if pull.is_end(requested) {
        shared.playing.store(false, Ordering::Release);
        let generation = shared.generation.load(Ordering::Acquire);
        // full channel: the control thread already has a finish to act on
        let _ = signals.try_send(AudioSignal::Finished { generation });
    }
}

#[inline]
fn silence(left: &mut [f32], right: &mut [f32]) {
    left.fill(0.0);
    right.fill(0.0);
}
