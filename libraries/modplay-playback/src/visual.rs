//! Visualization capability and its refresh throttle

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Background color for a highlighted line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Rgb {
    /// Build a color from its components
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Line-oriented text output
///
/// Each refresh starts at the top; `reset` wipes the surface (called on
/// every track start).
pub trait VisualSink: Send {
    /// Write one line of text
    fn draw_line(&mut self, text: &str);

    /// Write one line of text over a background color
    fn draw_line_with_background(&mut self, text: &str, color: Rgb);

    /// Called before a refresh; rewinds the line cursor
    fn begin_frame(&mut self) {}

    /// Called after a refresh
    fn end_frame(&mut self) {}

    /// Clear the surface and rewind the line cursor
    fn reset(&mut self);
}

/// Sink that drops everything (headless runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl VisualSink for NullSink {
    fn draw_line(&mut self, _text: &str) {}

    fn draw_line_with_background(&mut self, _text: &str, _color: Rgb) {}

    fn reset(&mut self) {}
}

/// Lines captured from an engine and drawn into a real sink later
///
/// The engine draws into the frame while the session slot is locked; the
/// host sink only sees the lines after the lock is released. Line buffers
/// are reused between refreshes.
#[derive(Debug, Default, Clone)]
pub struct DisplayFrame {
    lines: Vec<(String, Option<Rgb>)>,
    used: usize,
}

impl DisplayFrame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the captured lines, keeping their buffers
    pub fn clear(&mut self) {
        self.used = 0;
    }

    /// Captured lines in draw order
    pub fn lines(&self) -> impl Iterator<Item = (&str, Option<Rgb>)> {
        self.lines[..self.used]
            .iter()
            .map(|(text, color)| (text.as_str(), *color))
    }

    /// Draw the captured lines into `sink`
    pub fn replay(&self, sink: &mut dyn VisualSink) {
        for (text, color) in self.lines() {
            match color {
                Some(color) => sink.draw_line_with_background(text, color),
                None => sink.draw_line(text),
            }
        }
    }

    fn push(&mut self, text: &str, color: Option<Rgb>) {
        match self.lines.get_mut(self.used) {
            Some(line) => {
                line.0.clear();
                line.0.push_str(text);
                line.1 = color;
            }
            None => self.lines.push((text.to_string(), color)),
        }
        self.used += 1;
    }
}

impl VisualSink for DisplayFrame {
    fn draw_line(&mut self, text: &str) {
        self.push(text, None);
    }

    fn draw_line_with_background(&mut self, text: &str, color: Rgb) {
        self.push(text, Some(color));
    }

    fn reset(&mut self) {
        self.clear();
    }
}

/// Gates visualization refreshes to a target frame rate
///
/// The first check always passes. Afterwards a check passes once at least
/// `1 / fps` has elapsed since the last passing check.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl FrameThrottle {
    /// Throttle for `fps` refreshes per second (`fps` of 0 is treated as 1)
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / fps.max(1),
            last: None,
        }
    }

    /// Minimum time between refreshes
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check the clock; returns true and records `now` if a refresh is due
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}
