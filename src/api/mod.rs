pub mod broadcaster;
pub mod collaborators;
pub mod tx_builder;
