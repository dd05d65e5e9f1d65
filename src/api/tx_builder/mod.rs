//! builds, proves and submits one transaction per session.
//!
//! the flow is a pure state machine ([`state`]) driven by an interactive
//! loop ([`machine`]). each transaction type plugs its own selection and
//! confirmation behavior in through [`strategy::TransactionKind`].
pub mod approval;
pub mod error;
pub mod fee_resolver;
pub mod gas_estimator;
pub mod machine;
pub mod proof_generator;
mod request;
pub mod review;
pub mod selector;
pub mod state;
pub mod strategy;
pub mod submitter;

pub use error::TxBuilderError;
pub use machine::run_builder;
pub use machine::TxBuilder;
pub use state::BuilderState;
