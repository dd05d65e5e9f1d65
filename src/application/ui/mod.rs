//! the terminal front end.
mod render;
mod terminal;

pub use terminal::set_panic_hook;
pub use terminal::TerminalPrompter;
