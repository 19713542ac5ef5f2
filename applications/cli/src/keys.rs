//! Keyboard and paste handling
//!
//! Transport keys are handled by the host; everything else becomes a
//! DOM-style key identifier for the engine.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::PathBuf;
use url::Url;

/// What a key press means to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// Space
    TogglePlayPause,
    /// `n` or arrow right
    Next,
    /// `p` or arrow left
    Prev,
    /// Esc or Ctrl-C
    Quit,
    /// Forwarded to the engine
    Forward(String),
    /// Key releases and keys without a name
    Ignore,
}

/// Classify a terminal key event
pub fn classify(key: &KeyEvent) -> HostAction {
    if key.kind == KeyEventKind::Release {
        return HostAction::Ignore;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return HostAction::Quit;
    }

    match key.code {
        KeyCode::Char(' ') => HostAction::TogglePlayPause,
        KeyCode::Char('n') | KeyCode::Right => HostAction::Next,
        KeyCode::Char('p') | KeyCode::Left => HostAction::Prev,
        KeyCode::Esc => HostAction::Quit,
        _ => key_identifier(key).map_or(HostAction::Ignore, HostAction::Forward),
    }
}

/// DOM `KeyboardEvent.key`-style name for a key
pub fn key_identifier(key: &KeyEvent) -> Option<String> {
    let name = match key.code {
        KeyCode::Char(c) => return Some(c.to_string()),
        KeyCode::F(n) => return Some(format!("F{n}")),
        KeyCode::Enter => "Enter",
        KeyCode::Esc => "Escape",
        KeyCode::Backspace => "Backspace",
        KeyCode::Tab | KeyCode::BackTab => "Tab",
        KeyCode::Delete => "Delete",
        KeyCode::Insert => "Insert",
        KeyCode::Home => "Home",
        KeyCode::End => "End",
        KeyCode::PageUp => "PageUp",
        KeyCode::PageDown => "PageDown",
        KeyCode::Up => "ArrowUp",
        KeyCode::Down => "ArrowDown",
        KeyCode::Left => "ArrowLeft",
        KeyCode::Right => "ArrowRight",
        _ => return None,
    };
    Some(name.to_string())
}

/// Turn pasted text into file paths
///
/// Terminals paste dropped files either one per line or several on one line
/// separated by spaces, quoted or backslash-escaped the way a shell would
/// read them. `file://` URLs are percent-decoded. Anything that is not an
/// existing file is skipped.
pub fn pasted_paths(text: &str) -> Vec<PathBuf> {
    text.lines()
        .flat_map(split_words)
        .filter_map(|word| to_path(&word))
        .filter(|path| path.is_file())
        .collect()
}

fn to_path(word: &str) -> Option<PathBuf> {
    if word.starts_with("file://") {
        return Url::parse(word).ok()?.to_file_path().ok();
    }
    Some(PathBuf::from(word))
}

/// Split one line into words with POSIX shell quoting rules
///
/// Single quotes are literal, double quotes honor backslash escapes, and a
/// bare backslash takes the next character as is. An unterminated quote
/// runs to the end of the line.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut started = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                started = true;
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    word.push(c);
                }
            }
            '"' => {
                started = true;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => match chars.next() {
                            Some(next @ ('"' | '\\' | '$' | '`')) => word.push(next),
                            Some(next) => {
                                word.push('\\');
                                word.push(next);
                            }
                            None => word.push('\\'),
                        },
                        _ => word.push(c),
                    }
                }
            }
            '\\' => {
                started = true;
                if let Some(next) = chars.next() {
                    word.push(next);
                }
            }
            c if c.is_whitespace() => {
                if started {
                    words.push(std::mem::take(&mut word));
                    started = false;
                }
            }
            _ => {
                started = true;
                word.push(c);
            }
        }
    }
    if started {
        words.push(word);
    }
    words
}
