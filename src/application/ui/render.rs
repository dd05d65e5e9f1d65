//! pure layout and key handling for the terminal prompter.

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;

use crate::api::collaborators::engine::ProofProgress;
use crate::api::collaborators::prompt::MenuView;
use crate::api::collaborators::prompt::Notice;

pub(super) const PROGRESS_WIDTH: usize = 30;

/// What a key press does to an open menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MenuInput {
    MoveTo(usize),
    Choose(usize),
    Cancel,
    Ignore,
}

pub(super) fn is_cancel(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Maps a key to a menu action. Arrows wrap around, digits jump straight to
/// the numbered entry.
pub(super) fn menu_input(key: &KeyEvent, cursor: usize, len: usize) -> MenuInput {
    if is_cancel(key) {
        return MenuInput::Cancel;
    }
    if len == 0 {
        return MenuInput::Ignore;
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => MenuInput::MoveTo((cursor + len - 1) % len),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => MenuInput::MoveTo((cursor + 1) % len),
        KeyCode::Home => MenuInput::MoveTo(0),
        KeyCode::End => MenuInput::MoveTo(len - 1),
        KeyCode::Enter => MenuInput::Choose(cursor.min(len - 1)),
        KeyCode::Char(c) => match c.to_digit(10) {
            Some(d) if d >= 1 && (d as usize) <= len => MenuInput::MoveTo(d as usize - 1),
            _ => MenuInput::Ignore,
        },
        _ => MenuInput::Ignore,
    }
}

/// first enabled entry
pub(super) fn initial_cursor(menu: &MenuView) -> usize {
    menu.choices.iter().position(|c| c.enabled).unwrap_or(0)
}

pub(super) fn menu_lines(menu: &MenuView, cursor: usize) -> Vec<String> {
    let mut lines = vec![];
    if let Some(header) = &menu.header {
        lines.extend(header.lines().map(str::to_string));
    }
    lines.push(format!("? {}", menu.message));
    for (i, choice) in menu.choices.iter().enumerate() {
        let marker = if i == cursor { '>' } else { ' ' };
        let mut line = format!("{} {}", marker, choice.label);
        if !choice.enabled {
            line.push_str(" (unavailable)");
        }
        if let Some(hint) = &choice.hint {
            line.push_str(" - ");
            line.push_str(hint);
        }
        lines.push(line);
    }
    lines
}

pub(super) fn notice_prefix(level: Notice) -> &'static str {
    match level {
        Notice::Info => "i",
        Notice::Success => "✔",
        Notice::Warning => "!",
        Notice::Error => "✖",
    }
}

pub(super) fn progress_line(progress: &ProofProgress, width: usize) -> String {
    let fraction = if progress.fraction.is_nan() {
        0.0
    } else {
        progress.fraction.clamp(0.0, 1.0)
    };
    let filled = ((fraction * width as f64).floor() as usize).min(width);
    let percent = (fraction * 100.0).floor() as u32;
    let phase = progress.phase.as_deref().unwrap_or("Proving");
    format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        ".".repeat(width - filled),
        percent,
        phase
    )
}
