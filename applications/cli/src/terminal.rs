//! Terminal visualization sink and terminal mode guard

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use modplay_playback::{Rgb, VisualSink};
use std::io::{self, Write};

/// Rows above the engine display, owned by the host status lines
pub const HEADER_ROWS: u16 = 2;

/// Line-oriented sink drawing below the header rows
///
/// Lines are written in place each refresh; rows left over from a taller
/// previous refresh are cleared in `end_frame`.
pub struct TerminalSink<W: Write + Send> {
    out: W,
    origin: u16,
    row: u16,
    failed: bool,
}

impl TerminalSink<io::Stdout> {
    /// Sink on stdout starting right below the header
    pub fn stdout() -> Self {
        Self::new(io::stdout(), HEADER_ROWS)
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W, origin: u16) -> Self {
        Self {
            out,
            origin,
            row: origin,
            failed: false,
        }
    }

    /// The underlying writer
    pub fn writer(&self) -> &W {
        &self.out
    }

    fn check(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            if !self.failed {
                tracing::warn!(error = %e, "Terminal write failed");
            }
            self.failed = true;
        }
    }

    fn write_line(&mut self, text: &str, background: Option<Rgb>) -> io::Result<()> {
        queue!(self.out, MoveTo(0, self.row), Clear(ClearType::CurrentLine))?;
        match background {
            Some(color) => queue!(
                self.out,
                SetBackgroundColor(Color::Rgb {
                    r: color.r,
                    g: color.g,
                    b: color.b
                }),
                Print(text),
                ResetColor
            )?,
            None => queue!(self.out, Print(text))?,
        }
        self.row = self.row.saturating_add(1);
        Ok(())
    }
}

impl<W: Write + Send> VisualSink for TerminalSink<W> {
    fn draw_line(&mut self, text: &str) {
        let result = self.write_line(text, None);
        self.check(result);
    }

    fn draw_line_with_background(&mut self, text: &str, color: Rgb) {
        let result = self.write_line(text, Some(color));
        self.check(result);
    }

    fn begin_frame(&mut self) {
        self.row = self.origin;
    }

    fn end_frame(&mut self) {
        let result = queue!(self.out, MoveTo(0, self.row), Clear(ClearType::FromCursorDown))
            .and_then(|()| self.out.flush());
        self.check(result);
    }

    fn reset(&mut self) {
        self.row = self.origin;
        let result = queue!(self.out, MoveTo(0, self.origin), Clear(ClearType::FromCursorDown))
            .and_then(|()| self.out.flush());
        self.check(result);
    }
}

/// Draw one host status line at `row`
pub fn draw_status<W: Write>(out: &mut W, row: u16, text: &str) -> io::Result<()> {
    queue!(out, MoveTo(0, row), Clear(ClearType::CurrentLine), Print(text))?;
    out.flush()
}

/// Raw mode, alternate screen and bracketed paste for as long as it lives
///
/// Restores the terminal on drop, including on early returns and panics
/// that unwind through `main`.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = Self { _private: () };
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            EnableBracketedPaste,
            Hide,
            Clear(ClearType::All)
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), DisableBracketedPaste, Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(sink: &TerminalSink<Vec<u8>>) -> String {
        String::from_utf8_lossy(sink.writer()).into_owned()
    }

    #[test]
    fn lines_are_drawn_from_the_origin_each_frame() {
        let mut sink = TerminalSink::new(Vec::new(), 2);

        sink.begin_frame();
        sink.draw_line("first");
        sink.draw_line("second");
        sink.end_frame();
        sink.begin_frame();
        sink.draw_line("again");
        sink.end_frame();

        let out = text(&sink);
        // MoveTo is 1-based on the wire: row 2 is "\x1b[3;1H"
        assert_eq!(out.matches("\x1b[3;1H").count(), 2);
        assert!(out.contains("\x1b[4;1H"));
        assert!(out.contains("first"));
        assert!(out.contains("again"));
    }

    #[test]
    fn background_lines_reset_color() {
        let mut sink = TerminalSink::new(Vec::new(), 0);
        sink.draw_line_with_background("meter", Rgb::new(10, 20, 30));

        let out = text(&sink);
        assert!(out.contains("\x1b[48;2;10;20;30m"));
        assert!(out.contains("meter"));
        assert!(out.ends_with("\x1b[0m"));
    }

    #[test]
    fn reset_clears_display_area() {
        let mut sink = TerminalSink::new(Vec::new(), 2);
        sink.draw_line("x");
        sink.reset();
        sink.draw_line("y");

        let out = text(&sink);
        assert!(out.contains("\x1b[J"));
        assert_eq!(out.matches("\x1b[3;1H").count(), 3);
    }
}
