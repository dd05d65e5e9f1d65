//! user-pinned broadcasters.
pub mod custom_broadcasters;
pub mod settings_menu;

pub use custom_broadcasters::BroadcasterConfigError;
pub use custom_broadcasters::CustomBroadcasters;
