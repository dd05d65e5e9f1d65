//! interfaces to the systems the wallet depends on but does not implement.
//!
//! the shielded engine proves and scans, the chain provider talks to public
//! RPC nodes, the broadcaster network relays private transactions, the swap
//! quoter prices swaps, and the prompter is the interactive terminal.
mod error;
pub mod engine;
pub mod prompt;
pub mod provider;
pub mod quoter;
pub mod relay;

pub use engine::EngineRequest;
pub use engine::ShieldedEngine;
pub use error::with_timeout;
pub use error::ExternalError;
pub use prompt::Prompter;
pub use provider::ApprovalRequest;
pub use provider::ApprovalSpender;
pub use provider::ChainProvider;
pub use quoter::SwapQuoter;
pub use relay::BroadcasterNetwork;
pub use relay::RelayedTransaction;
