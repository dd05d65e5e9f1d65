pub mod files;
pub mod fixtures;
pub mod prompter;
