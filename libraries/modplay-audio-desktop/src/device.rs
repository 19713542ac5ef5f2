// modplay-audio-desktop/src/device.rs
//
// Output device enumeration and lookup

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use crate::error::{AudioError, Result};

/// Information about an audio output device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (human-readable)
    pub name: String,

    /// Is this the system default output device?
    pub is_default: bool,

    /// Native sample rate (Hz)
    pub sample_rate: u32,

    /// Number of output channels
    pub channels: u16,

    /// Native sample format (e.g. "f32", "i16")
    pub sample_format: String,
}

/// Enumerate output devices of the default host
///
/// Devices whose name or default config cannot be read are skipped.
/// The default device comes first, the rest alphabetically.
pub fn list_output_devices() -> Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host.output_devices()? {
        let Ok(name) = device.name() else {
            continue;
        };
        let config = match device.default_output_config() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(device = %name, error = %e, "Skipping device without output config");
                continue;
            }
        };

        devices.push(DeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            sample_format: format!("{:?}", config.sample_format()).to_lowercase(),
        });
    }

    sort_devices(&mut devices);
    Ok(devices)
}

fn sort_devices(devices: &mut [DeviceInfo]) {
    devices.sort_by(|a, b| b.is_default.cmp(&a.is_default).then_with(|| a.name.cmp(&b.name)));
}

/// Find an output device by exact name, or the default one when `name` is None
pub fn find_output_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    let Some(wanted) = name else {
        return host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceNotFound("default output".to_string()));
    };

    for device in host.output_devices()? {
        if device.name().is_ok_and(|n| n == wanted) {
            return Ok(device);
        }
    }
    Err(AudioError::DeviceNotFound(wanted.to_string()))
}
