//! Reference decoding engine
//!
//! Decodes any container symphonia can probe into stereo PCM up front, then
//! renders it at the output rate with linear interpolation. Understands a
//! few keys and draws a status line, a progress bar and level meters.

use modplay_playback::{Decoder, EngineHandle, PlaybackError, Pull, Result, Rgb, VisualSink};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

const GAIN_STEP: f32 = 0.1;
const MAX_GAIN: f32 = 2.0;
const BAR_WIDTH: usize = 40;

const METER_LOW: Rgb = Rgb::new(0, 110, 0);
const METER_MID: Rgb = Rgb::new(150, 120, 0);
const METER_HIGH: Rgb = Rgb::new(160, 0, 0);

/// Decoded audio, split into left and right
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pcm {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    /// Rate the audio was decoded at
    pub sample_rate: u32,
    /// Channel count of the source (mono is duplicated, extra channels dropped)
    pub channels: usize,
}

impl Pcm {
    /// Number of frames
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    fn push_interleaved(&mut self, samples: &[f32], channels: usize) {
        let channels = channels.max(1);
        for frame in samples.chunks_exact(channels) {
            let left = frame[0];
            let right = if channels > 1 { frame[1] } else { left };
            self.left.push(left);
            self.right.push(right);
        }
    }
}

/// Decode a whole file held in memory
///
/// The file extension of `name` is used as a format hint.
pub fn decode_pcm(name: &str, data: Arc<[u8]>) -> Result<Pcm> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlaybackError::engine(name, e))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| PlaybackError::engine(name, "no audio track"))?;
    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PlaybackError::engine(name, e))?;

    let mut pcm = Pcm {
        sample_rate: track.codec_params.sample_rate.unwrap_or(0),
        channels: track.codec_params.channels.map(|c| c.count()).unwrap_or(0),
        ..Pcm::default()
    };

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PlaybackError::engine(name, e)),
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(track = name, error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(PlaybackError::engine(name, e)),
        };

        let spec = *decoded.spec();
        pcm.sample_rate = spec.rate;
        pcm.channels = spec.channels.count();

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        pcm.push_interleaved(buffer.samples(), pcm.channels);
    }

    if pcm.frames() == 0 || pcm.sample_rate == 0 {
        return Err(PlaybackError::engine(name, "no audio frames"));
    }

    tracing::debug!(
        track = name,
        frames = pcm.frames(),
        rate = pcm.sample_rate,
        channels = pcm.channels,
        "Decoded"
    );
    Ok(pcm)
}

/// [`Decoder`] producing [`PcmEngine`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct PcmDecoder;

impl Decoder for PcmDecoder {
    fn create(&mut self, sample_rate: u32, name: &str, data: Arc<[u8]>) -> Result<Box<dyn EngineHandle>> {
        let pcm = decode_pcm(name, data)?;
        Ok(Box::new(PcmEngine::new(name, pcm, sample_rate)))
    }
}

/// Plays decoded PCM at any output rate
pub struct PcmEngine {
    name: String,
    pcm: Pcm,
    /// Read position in source frames
    position: f64,
    gain: f32,
    detail: bool,
    /// Peak levels of the last pull
    peak: [f32; 2],
    output_rate: u32,
}

impl PcmEngine {
    pub fn new(name: &str, pcm: Pcm, output_rate: u32) -> Self {
        Self {
            name: name.to_string(),
            pcm,
            position: 0.0,
            gain: 1.0,
            detail: false,
            peak: [0.0; 2],
            output_rate,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Read position in source frames
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn detail(&self) -> bool {
        self.detail
    }

    fn seconds(&self, frames: f64) -> u64 {
        (frames / f64::from(self.pcm.sample_rate.max(1))) as u64
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl EngineHandle for PcmEngine {
    fn pull(&mut self, left: &mut [f32], right: &mut [f32], sample_rate: u32) -> Pull {
        let frames = self.pcm.frames();
        let step = f64::from(self.pcm.sample_rate) / f64::from(sample_rate.max(1));
        let mut written = 0;
        let mut peak = [0.0f32; 2];

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let index = self.position as usize;
            if index >= frames {
                break;
            }
            let next = (index + 1).min(frames - 1);
            let t = (self.position - index as f64) as f32;

            *l = lerp(self.pcm.left[index], self.pcm.left[next], t) * self.gain;
            *r = lerp(self.pcm.right[index], self.pcm.right[next], t) * self.gain;
            peak[0] = peak[0].max(l.abs());
            peak[1] = peak[1].max(r.abs());

            written += 1;
            self.position += step;
        }

        self.peak = peak;
        self.output_rate = sample_rate;

        if written < left.len() {
            Pull::EndOfTrack(written)
        } else {
            Pull::Frames(written)
        }
    }

    fn apply_input(&mut self, keys: &[String]) -> bool {
        let mut terminate = false;
        for key in keys {
            match key.as_str() {
                "q" => terminate = true,
                "+" | "=" => self.gain = (self.gain + GAIN_STEP).min(MAX_GAIN),
                "-" => self.gain = (self.gain - GAIN_STEP).max(0.0),
                "r" => self.position = 0.0,
                "d" => self.detail = !self.detail,
                _ => {}
            }
        }
        terminate
    }

    fn display(&mut self, sink: &mut dyn VisualSink) {
        let total = self.pcm.frames() as f64;
        let position = self.position.min(total);

        sink.draw_line(&format!(
            "{}  {} Hz  {} ch  gain {:.1}",
            self.name, self.pcm.sample_rate, self.pcm.channels, self.gain
        ));
        sink.draw_line(&progress_line(
            position / total.max(1.0),
            self.seconds(position),
            self.seconds(total),
        ));
        for (label, level) in [("L", self.peak[0]), ("R", self.peak[1])] {
            sink.draw_line_with_background(&meter_bar(label, level), meter_color(level));
        }

        if self.detail {
            sink.draw_line(&format!(
                "frame {:.0}/{:.0}  source {} Hz -> output {} Hz",
                position, total, self.pcm.sample_rate, self.output_rate
            ));
            sink.draw_line("keys: q quit  +/- gain  r restart  d detail");
        }
    }
}

fn progress_line(fraction: f64, elapsed: u64, total: u64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:02}:{:02} / {:02}:{:02}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        elapsed / 60,
        elapsed % 60,
        total / 60,
        total % 60
    )
}

fn meter_bar(label: &str, level: f32) -> String {
    let filled = (level.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize;
    format!("{label} {:<width$}", "|".repeat(filled), width = BAR_WIDTH)
}

fn meter_color(level: f32) -> Rgb {
    if level < 0.5 {
        METER_LOW
    } else if level < 0.9 {
        METER_MID
    } else {
        METER_HIGH
    }
}
