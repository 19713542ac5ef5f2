//! CPAL output stream
//!
//! Opening is split in two because the player needs the device sample rate
//! before it can hand out its [`AudioRenderer`]:
//!
//! ```text
//!   OutputDevice::open(name) ──► sample_rate() ──► Player::new(..)
//!            │                                        │
//!            └──────────── start(renderer) ◄──────────┘
//!                               │
//!                          CpalOutput (stream running)
//! ```

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize, FromSample, Sample, SampleFormat, SizedSample, StreamConfig,
    SupportedBufferSize, SupportedStreamConfig,
};
use modplay_playback::AudioRenderer;

use crate::device::find_output_device;
use crate::error::{AudioError, Result};

/// An output device with its chosen stream config, not yet streaming
pub struct OutputDevice {
    device: cpal::Device,
    name: String,
    config: SupportedStreamConfig,
}

impl OutputDevice {
    /// Open the named output device, or the default one
    ///
    /// # Errors
    /// [`AudioError::DeviceNotFound`] when no device matches; fatal for
    /// playback.
    pub fn open(name: Option<&str>) -> Result<Self> {
        let device = find_output_device(name)?;
        let name = device.name()?;
        let config = device.default_output_config()?;

        tracing::info!(
            device = %name,
            sample_rate = config.sample_rate().0,
            channels = config.channels(),
            format = ?config.sample_format(),
            "Output device opened"
        );

        Ok(Self {
            device,
            name,
            config,
        })
    }

    /// Device name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rate the stream will run at
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    /// Number of interleaved output channels
    pub fn channels(&self) -> u16 {
        self.config.channels()
    }

    /// Build and start the stream, moving `renderer` into its callback
    ///
    /// The device is asked for `block_frames`-sized callbacks when it
    /// supports fixed buffers; any callback size works either way.
    pub fn start(self, renderer: AudioRenderer) -> Result<CpalOutput> {
        let block_frames = renderer.block_frames();
        if block_frames == 0 {
            return Err(AudioError::Config("block size must be positive".to_string()));
        }

        let stream_config = StreamConfig {
            channels: self.config.channels(),
            sample_rate: self.config.sample_rate(),
            buffer_size: buffer_size_for(self.config.buffer_size(), block_frames),
        };

        let stream = match self.config.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&self.device, &stream_config, renderer)?,
            SampleFormat::I16 => build_stream::<i16>(&self.device, &stream_config, renderer)?,
            SampleFormat::U16 => build_stream::<u16>(&self.device, &stream_config, renderer)?,
            other => {
                return Err(AudioError::UnsupportedFormat(format!("{other:?}")));
            }
        };
        stream.play()?;

        tracing::debug!(
            device = %self.name,
            buffer = ?stream_config.buffer_size,
            "Output stream started"
        );

        Ok(CpalOutput {
            stream,
            name: self.name,
            sample_rate: stream_config.sample_rate.0,
            channels: stream_config.channels,
        })
    }
}

/// A running output stream
///
/// Dropping it stops the stream and drops the renderer.
pub struct CpalOutput {
    stream: cpal::Stream,
    name: String,
    sample_rate: u32,
    channels: u16,
}

impl CpalOutput {
    /// Device name
    pub fn device_name(&self) -> &str {
        &self.name
    }

    /// Stream sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stream channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Suspend the device callback
    pub fn pause(&self) -> Result<()> {
        self.stream.pause()?;
        Ok(())
    }

    /// Resume the device callback
    pub fn resume(&self) -> Result<()> {
        self.stream.play()?;
        Ok(())
    }
}

fn buffer_size_for(supported: &SupportedBufferSize, block_frames: usize) -> BufferSize {
    let frames = u32::try_from(block_frames).unwrap_or(u32::MAX);
    match supported {
        SupportedBufferSize::Range { min, max } => BufferSize::Fixed(frames.clamp(*min, *max)),
        // host picks; the renderer splits whatever arrives
        SupportedBufferSize::Unknown => BufferSize::Default,
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut renderer: AudioRenderer,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = usize::from(config.channels).max(1);
    let mut scratch = vec![0.0f32; renderer.block_frames() * channels];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
            render_converted(&mut renderer, &mut scratch, data, channels);
        },
        |err| {
            tracing::error!(error = %err, "Audio stream error");
        },
        None,
    )?;
    Ok(stream)
}

/// Render into an f32 scratch buffer and convert into the device format
///
/// `scratch` holds a whole number of frames and is reused across calls.
fn render_converted<T>(
    renderer: &mut AudioRenderer,
    scratch: &mut [f32],
    data: &mut [T],
    channels: usize,
) where
    T: Sample + FromSample<f32>,
{
    let step = (scratch.len() / channels).max(1) * channels;
    for out in data.chunks_mut(step) {
        let rendered = &mut scratch[..out.len()];
        renderer.render_interleaved(rendered, channels);
        for (dst, src) in out.iter_mut().zip(rendered.iter()) {
            *dst = T::from_sample(*src);
        }
    }
}
