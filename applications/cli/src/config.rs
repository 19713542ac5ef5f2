/// Player configuration
///
/// Layered lowest to highest: built-in defaults, the TOML file
/// (`modplay.toml` in the working directory or `--config`), `MODPLAY_*`
/// environment variables, then command-line flags.
use anyhow::{bail, Context, Result};
use modplay_playback::{PlayerConfig, DEFAULT_BLOCK_FRAMES};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "modplay.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_audio")]
    pub audio: AudioSettings,

    #[serde(default = "default_display")]
    pub display: DisplaySettings,

    #[serde(default = "default_input")]
    pub input: InputSettings,

    #[serde(default = "default_logging")]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AudioSettings {
    /// Output device name; the system default when unset
    #[serde(default)]
    pub device: Option<String>,

    #[serde(default = "default_block_frames")]
    pub block_frames: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DisplaySettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_fps")]
    pub fps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InputSettings {
    /// Frame loop period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log file; without one, logs only go to stderr when the display is off
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// `EnvFilter` directives, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub device: Option<String>,
    pub fps: Option<u32>,
    pub block_frames: Option<usize>,
    pub no_display: bool,
}

impl Settings {
    /// Load configuration from file and environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading `MODPLAY_*` variables from `env`
    /// instead of the process environment when given
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables, e.g. MODPLAY_AUDIO__BLOCK_FRAMES
        settings = settings.add_source(
            config::Environment::with_prefix("MODPLAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config = settings
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Apply command-line flags on top of the loaded layers
    pub fn apply(&mut self, overrides: &CliOverrides) {
        if let Some(device) = &overrides.device {
            self.audio.device = Some(device.clone());
        }
        if let Some(fps) = overrides.fps {
            self.display.fps = fps;
        }
        if let Some(block_frames) = overrides.block_frames {
            self.audio.block_frames = block_frames;
        }
        if overrides.no_display {
            self.display.enabled = false;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.audio.block_frames == 0 {
            bail!("audio.block_frames must be positive");
        }
        if self.display.fps == 0 {
            bail!("display.fps must be positive");
        }
        if self.input.tick_ms == 0 {
            bail!("input.tick_ms must be positive");
        }
        Ok(())
    }

    /// Player settings for a device running at `sample_rate`
    pub fn player_config(&self, sample_rate: u32) -> PlayerConfig {
        PlayerConfig {
            sample_rate,
            block_frames: self.audio.block_frames,
            target_fps: self.display.fps,
            ..PlayerConfig::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio: default_audio(),
            display: default_display(),
            input: default_input(),
            logging: default_logging(),
        }
    }
}

// Default values
fn default_audio() -> AudioSettings {
    AudioSettings {
        device: None,
        block_frames: default_block_frames(),
    }
}

fn default_block_frames() -> usize {
    DEFAULT_BLOCK_FRAMES
}

fn default_display() -> DisplaySettings {
    DisplaySettings {
        enabled: default_enabled(),
        fps: default_fps(),
    }
}

fn default_enabled() -> bool {
    true
}

fn default_fps() -> u32 {
    30
}

fn default_input() -> InputSettings {
    InputSettings {
        tick_ms: default_tick_ms(),
    }
}

fn default_tick_ms() -> u64 {
    10
}

fn default_logging() -> LoggingSettings {
    LoggingSettings {
        file: None,
        filter: default_filter(),
    }
}

fn default_filter() -> String {
    "modplay=info,modplay_cli=info,modplay_playback=info,modplay_audio_desktop=info".to_string()
}
