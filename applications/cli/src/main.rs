/// modplay - play tracker modules and audio files in the terminal
use anyhow::{Context, Result};
use clap::Parser;
use modplay_audio_desktop::{list_output_devices, FileTrackLoader, OutputDevice};
use modplay_cli::{
    terminal::{TerminalGuard, TerminalSink},
    App, CliOverrides, ExitReason, HostEvent, InputThread, PcmDecoder, Settings,
};
use modplay_playback::{NullSink, Player, Track, VisualSink};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "modplay")]
#[command(version, about = "Play tracker modules and audio files in the terminal", long_about = None)]
struct Cli {
    /// Files to play, in order
    files: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output device name
    #[arg(short, long, env = "MODPLAY_DEVICE")]
    device: Option<String>,

    /// Visualization refreshes per second
    #[arg(long)]
    fps: Option<u32>,

    /// Frames per audio block
    #[arg(long)]
    block_frames: Option<usize>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Play without drawing or reading the terminal
    #[arg(long)]
    no_display: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            device: self.device.clone(),
            fps: self.fps,
            block_frames: self.block_frames,
            no_display: self.no_display,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply(&cli.overrides());
    settings.validate()?;

    init_logging(&settings)?;

    if cli.list_devices {
        return print_devices();
    }

    let reason = run(cli.files, &settings)?;
    tracing::info!(?reason, "Exiting");
    Ok(())
}

fn init_logging(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.filter))
        .context("Invalid log filter")?;

    let file_layer = match &settings.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    // Logging to the terminal would tear up the display
    let stderr_layer = (file_layer.is_none() && !settings.display.enabled)
        .then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

fn print_devices() -> Result<()> {
    let devices = list_output_devices().context("Failed to enumerate output devices")?;
    let mut out = io::stdout().lock();
    for device in devices {
        writeln!(
            out,
            "{}{}  {} Hz  {} ch  {}",
            device.name,
            if device.is_default { " (default)" } else { "" },
            device.sample_rate,
            device.channels,
            device.sample_format
        )?;
    }
    Ok(())
}

fn run(files: Vec<PathBuf>, settings: &Settings) -> Result<ExitReason> {
    let device = OutputDevice::open(settings.audio.device.as_deref())
        .context("Failed to open audio output")?;
    tracing::info!(
        device = device.name(),
        sample_rate = device.sample_rate(),
        channels = device.channels(),
        "Audio output opened"
    );

    let config = settings.player_config(device.sample_rate());
    let tick = Duration::from_millis(settings.input.tick_ms);
    let loader = FileTrackLoader::new().context("Failed to start track loader")?;
    let tracks: Vec<Track> = files.into_iter().map(Track::from_path).collect();
    let (tx, rx) = crossbeam_channel::unbounded::<HostEvent>();

    if settings.display.enabled {
        let _terminal = TerminalGuard::enter().context("Failed to set up terminal")?;
        let visual: Box<dyn VisualSink> = Box::new(TerminalSink::stdout());
        let (player, renderer) = Player::new(config, Box::new(PcmDecoder), Box::new(loader), visual)?;
        let _output = device.start(renderer).context("Failed to start audio output")?;
        let _input = InputThread::spawn(tx).context("Failed to start input thread")?;

        let mut app = App::new(player, Some(io::stdout()));
        app.player_mut().load_files(tracks);
        Ok(app.run(&rx, tick))
    } else {
        let (player, renderer) =
            Player::new(config, Box::new(PcmDecoder), Box::new(loader), Box::new(NullSink))?;
        let _output = device.start(renderer).context("Failed to start audio output")?;
        // Nothing reads the terminal; the sender only keeps the channel open
        let _tx = tx;

        let mut app = App::new(player, None::<io::Stdout>);
        if !app.player_mut().load_files(tracks) {
            anyhow::bail!("No files to play");
        }
        Ok(app.run(&rx, tick))
    }
}
