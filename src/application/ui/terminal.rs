use std::io::Stdout;
use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use crossterm::cursor;
use crossterm::event;
use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::style::Stylize;
use crossterm::terminal;
use crossterm::terminal::ClearType;
use tracing::warn;
use zeroize::Zeroizing;

use super::render;
use super::render::MenuInput;
use crate::api::collaborators::engine::ProofProgress;
use crate::api::collaborators::prompt::MenuView;
use crate::api::collaborators::prompt::Notice;
use crate::api::collaborators::Prompter;

/// Puts the terminal in raw mode for as long as it lives.
#[derive(Debug)]
struct RawMode;

impl RawMode {
    fn enable() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("could not leave raw mode: {}", e);
        }
    }
}

/// leaves raw mode if a panic unwinds through an open prompt
pub fn set_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = terminal::disable_raw_mode();
        previous_hook(info);
    }));
}

/// next key press, read off the async runtime
async fn read_key() -> std::io::Result<KeyEvent> {
    tokio::task::spawn_blocking(|| -> std::io::Result<KeyEvent> {
        loop {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(key);
                }
            }
        }
    })
    .await
    .map_err(std::io::Error::other)?
}

/// Redraws a block of lines in place.
#[derive(Debug, Default)]
struct Frame {
    drawn: u16,
}

impl Frame {
    fn draw(&mut self, out: &mut Stdout, lines: &[String]) -> std::io::Result<()> {
        if self.drawn > 0 {
            queue!(out, cursor::MoveUp(self.drawn))?;
        }
        queue!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::FromCursorDown)
        )?;
        for line in lines {
            queue!(out, Print(line), Print("\r\n"))?;
        }
        out.flush()?;
        self.drawn = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        Ok(())
    }
}

/// The interactive terminal: arrow-key menus, line input, hidden password
/// entry and a proof progress bar.
#[derive(Debug, Default)]
pub struct TerminalPrompter {
    /// whether a progress bar is mid-line
    progress_open: Mutex<bool>,
}

impl TerminalPrompter {
    fn end_progress_line(&self) {
        let mut open = match self.progress_open.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *open {
            println!();
            *open = false;
        }
    }

    async fn select_raw(&self, menu: &MenuView) -> std::io::Result<Option<usize>> {
        let _raw = RawMode::enable()?;
        let mut out = std::io::stdout();
        let mut frame = Frame::default();
        let mut cursor = render::initial_cursor(menu);
        loop {
            frame.draw(&mut out, &render::menu_lines(menu, cursor))?;
            match render::menu_input(&read_key().await?, cursor, menu.choices.len()) {
                MenuInput::MoveTo(index) => cursor = index,
                MenuInput::Choose(index) => return Ok(Some(index)),
                MenuInput::Cancel => return Ok(None),
                MenuInput::Ignore => {}
            }
        }
    }

    async fn input_raw(
        &self,
        message: &str,
        initial: Option<&str>,
    ) -> std::io::Result<Option<String>> {
        let _raw = RawMode::enable()?;
        let mut out = std::io::stdout();
        let mut frame = Frame::default();
        let mut text = initial.unwrap_or_default().to_string();
        loop {
            frame.draw(&mut out, &[format!("? {}: {}", message, text)])?;
            let key = read_key().await?;
            if render::is_cancel(&key) {
                return Ok(None);
            }
            match key.code {
                KeyCode::Enter => return Ok(Some(text.trim().to_string())),
                KeyCode::Backspace => {
                    text.pop();
                }
                KeyCode::Char(c) => text.push(c),
                _ => {}
            }
        }
    }

    async fn confirm_raw(&self, message: &str) -> std::io::Result<bool> {
        let _raw = RawMode::enable()?;
        let mut out = std::io::stdout();
        Frame::default().draw(&mut out, &[format!("? {} (y/N)", message)])?;
        let key = read_key().await?;
        Ok(matches!(key.code, KeyCode::Char('y' | 'Y')))
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn select(&self, menu: &MenuView) -> Option<usize> {
        self.end_progress_line();
        match self.select_raw(menu).await {
            Ok(choice) => choice,
            Err(e) => {
                warn!("menu `{}` failed: {}", menu.message, e);
                None
            }
        }
    }

    async fn input(&self, message: &str, initial: Option<&str>) -> Option<String> {
        self.end_progress_line();
        match self.input_raw(message, initial).await {
            Ok(text) => text,
            Err(e) => {
                warn!("input `{}` failed: {}", message, e);
                None
            }
        }
    }

    async fn password(&self, message: &str) -> Option<Zeroizing<String>> {
        self.end_progress_line();
        let prompt = format!("? {}: ", message);
        let read = tokio::task::spawn_blocking(move || rpassword::prompt_password(prompt)).await;
        match read {
            Ok(Ok(secret)) if secret.is_empty() => None,
            Ok(Ok(secret)) => Some(Zeroizing::new(secret)),
            Ok(Err(e)) => {
                warn!("password entry failed: {}", e);
                None
            }
            Err(e) => {
                warn!("password entry task failed: {}", e);
                None
            }
        }
    }

    async fn confirm(&self, message: &str) -> bool {
        self.end_progress_line();
        self.confirm_raw(message).await.unwrap_or_else(|e| {
            warn!("confirmation `{}` failed: {}", message, e);
            false
        })
    }

    fn notify(&self, level: Notice, message: &str) {
        self.end_progress_line();
        let prefix = render::notice_prefix(level);
        let line = format!("{} {}", prefix, message);
        let styled = match level {
            Notice::Info => line.cyan(),
            Notice::Success => line.green(),
            Notice::Warning => line.yellow(),
            Notice::Error => line.red(),
        };
        println!("{}", styled);
    }

    fn progress(&self, progress: &ProofProgress) {
        let line = render::progress_line(progress, render::PROGRESS_WIDTH);
        let mut out = std::io::stdout();
        let drawn = queue!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print(line)
        )
        .and_then(|()| out.flush());
        if let Err(e) = drawn {
            warn!("could not draw proof progress: {}", e);
            return;
        }
        match self.progress_open.lock() {
            Ok(mut open) => *open = true,
            Err(poisoned) => *poisoned.into_inner() = true,
        }
    }
}
