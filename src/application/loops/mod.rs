//! long-running tasks: the main menu loop and its background helpers.
pub mod background_task;
pub mod balance_poller;
pub mod confirmation_watcher;
pub mod main_loop;
pub mod shutdown;
