//! End-to-end tests for the reference engine
//!
//! WAV data is generated in memory with hound and decoded by symphonia;
//! the renderer is driven by hand instead of an audio device.

use modplay_cli::terminal::TerminalSink;
use modplay_cli::{decode_pcm, PcmDecoder, PcmEngine};
use modplay_playback::{
    EngineHandle, InlineSource, PlaybackEvent, PlaybackState, Player, PlayerConfig, Pull, Track,
};
use proptest::prelude::*;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

// ===== Test Helpers =====

fn wav_bytes(channels: u16, sample_rate: u32, frames: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames {
            let s = ((i % 64) as i16 - 32) * 512;
            writer.write_sample(s).unwrap();
            if channels > 1 {
                writer.write_sample(-s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn player(sample_rate: u32, block_frames: usize) -> (Player, modplay_playback::AudioRenderer) {
    let config = PlayerConfig {
        block_frames,
        ..PlayerConfig::with_sample_rate(sample_rate)
    };
    Player::new(
        config,
        Box::new(PcmDecoder),
        Box::new(InlineSource::new()),
        Box::new(modplay_playback::NullSink),
    )
    .unwrap()
}

// ===== Decoding =====

#[test]
fn mono_is_duplicated_to_both_sides() {
    let pcm = decode_pcm("mono.wav", wav_bytes(1, 22_050, 500).into()).unwrap();

    assert_eq!(pcm.frames(), 500);
    assert_eq!(pcm.sample_rate, 22_050);
    assert_eq!(pcm.channels, 1);
    assert_eq!(pcm.left, pcm.right);
}

#[test]
fn stereo_samples_are_scaled_to_unit_range() {
    let pcm = decode_pcm("stereo.wav", wav_bytes(2, 44_100, 100).into()).unwrap();

    assert_eq!(pcm.frames(), 100);
    assert_eq!(pcm.channels, 2);
    // Frame 0 is -32 * 512 on the left and its negation on the right
    assert!((pcm.left[0] + 0.5).abs() < 1e-4);
    assert!((pcm.right[0] - 0.5).abs() < 1e-4);
}

#[test]
fn truncated_file_is_rejected_by_the_decoder() {
    let bytes = wav_bytes(2, 44_100, 100);
    let result = decode_pcm("cut.wav", Arc::from(&bytes[..20]));
    assert!(result.is_err());
}

// ===== Full chain =====

#[test]
fn track_plays_to_the_end_at_double_rate() {
    let (mut player, mut renderer) = player(44_100, 256);
    player.load_files(vec![Track::from_bytes("tone.wav", wav_bytes(1, 22_050, 1000))]);
    player.tick(Instant::now());
    assert_eq!(player.state(), PlaybackState::Playing);

    let mut left = vec![0.0; 256];
    let mut right = vec![0.0; 256];
    let mut audible = 0;
    let mut ended = false;

    for _ in 0..20 {
        renderer.render(&mut left, &mut right);
        audible += left.iter().filter(|s| **s != 0.0).count();
        player.tick(Instant::now());
        if player.drain_events().contains(&PlaybackEvent::PlaylistEnded) {
            ended = true;
            break;
        }
    }

    assert!(ended, "playlist never ended");
    assert_eq!(player.state(), PlaybackState::Idle);
    // 1000 source frames at half the output rate, minus interpolated zero crossings
    assert!(audible > 1800 && audible <= 2000, "audible = {audible}");
}

#[test]
fn undecodable_file_reports_failure_and_next_plays() {
    let (mut player, _renderer) = player(48_000, 512);
    player.load_files(vec![
        Track::from_bytes("broken.xm", b"not a module".to_vec()),
        Track::from_bytes("ok.wav", wav_bytes(2, 48_000, 100)),
    ]);
    player.tick(Instant::now());

    let events = player.drain_events();
    assert!(events.iter().any(
        |e| matches!(e, PlaybackEvent::TrackLoadFailed { name, .. } if name == "broken.xm")
    ));
    assert_eq!(player.state(), PlaybackState::Idle);

    assert!(player.next());
    player.tick(Instant::now());
    assert_eq!(player.state(), PlaybackState::Playing);
    assert_eq!(player.track_name(), Some("ok.wav"));
}

#[test]
fn engine_quit_key_stops_playback() {
    let (mut player, _renderer) = player(48_000, 512);
    player.load_files(vec![Track::from_bytes("a.wav", wav_bytes(2, 48_000, 100))]);
    player.tick(Instant::now());

    player.push_key("q");
    player.tick(Instant::now());

    assert!(player.drain_events().contains(&PlaybackEvent::TerminateRequested));
    assert_eq!(player.state(), PlaybackState::Idle);
}

#[test]
fn meters_are_drawn_with_background_color() {
    let pcm = decode_pcm("a.wav", wav_bytes(2, 48_000, 4800).into()).unwrap();
    let mut engine = PcmEngine::new("a.wav", pcm, 48_000);
    let mut left = vec![0.0; 1024];
    let mut right = vec![0.0; 1024];
    engine.pull(&mut left, &mut right, 48_000);

    let mut sink = TerminalSink::new(Vec::new(), 2);
    engine.display(&mut sink);

    let out = String::from_utf8_lossy(sink.writer()).into_owned();
    assert!(out.contains("a.wav  48000 Hz  2 ch"));
    assert!(out.contains("\x1b[48;2;"));
}

// ===== Properties =====

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn output_length_follows_rate_ratio(
        source_rate in 8_000u32..96_000,
        output_rate in 8_000u32..96_000,
        frames in 1usize..2_000,
    ) {
        let pcm = modplay_cli::Pcm {
            left: vec![0.1; frames],
            right: vec![0.1; frames],
            sample_rate: source_rate,
            channels: 2,
        };
        let mut engine = PcmEngine::new("p.wav", pcm, output_rate);
        let mut left = vec![0.0; 512];
        let mut right = vec![0.0; 512];

        let mut total = 0usize;
        loop {
            match engine.pull(&mut left, &mut right, output_rate) {
                Pull::Frames(n) => total += n,
                Pull::EndOfTrack(n) => {
                    total += n;
                    break;
                }
            }
            prop_assert!(total < 100_000);
        }

        let expected = (frames as f64 * f64::from(output_rate) / f64::from(source_rate)).ceil();
        prop_assert!((total as f64 - expected).abs() <= 1.0, "total {} expected {}", total, expected);
    }
}
