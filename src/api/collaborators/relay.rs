use async_trait::async_trait;

use super::ExternalError;
use crate::models::chain::Chain;
use crate::models::fee_strategy::BroadcasterQuote;
use crate::models::proved_transaction::RawTransaction;

/// A proved transaction bound to the broadcaster that will relay it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedTransaction {
    pub chain: Chain,
    pub raw_transaction: RawTransaction,
    pub nullifiers: Vec<String>,
    pub fees_id: String,
    pub broadcaster_address: String,
    pub overall_batch_min_gas_price: Option<u128>,
    pub use_relay_adapt: bool,
}

/// The peer-to-peer broadcaster network.
#[async_trait]
pub trait BroadcasterNetwork: Send + Sync + std::fmt::Debug {
    /// broadcasters currently accepting `fee_token` on `chain`
    async fn list_broadcasters(
        &self,
        chain: Chain,
        fee_token: &str,
        use_relay_adapt: bool,
    ) -> Result<Vec<BroadcasterQuote>, ExternalError>;

    /// hands the transaction to its broadcaster; returns the tx hash once
    /// the broadcaster has submitted it
    async fn submit(&self, transaction: &RelayedTransaction) -> Result<String, ExternalError>;

    /// broadcasters to prefer when several are available
    async fn set_preferred_broadcasters(&self, addresses: &[String]);

    async fn shutdown(&self);
}
