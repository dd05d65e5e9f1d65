pub mod config;
pub mod loops;
pub mod retry;
pub mod session;
pub mod simulation;
pub mod status;
pub mod ui;
