use async_trait::async_trait;

use super::ExternalError;
use crate::models::amount::SelectedAmount;
use crate::models::amount::TokenBalance;
use crate::models::amount::TokenInfo;
use crate::models::chain::Chain;
use crate::models::fee_strategy::SignerWalletInfo;
use crate::models::gas::FeeData;
use crate::models::proved_transaction::RawTransaction;
use crate::models::proved_transaction::TransactionReceipt;

/// The contract an ERC-20 allowance is granted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalSpender {
    /// the shielded pool's shield entry point
    ShieldedPool,

    /// an arbitrary contract, eg a swap router
    Contract(String),
}

/// A public approval transaction required before a token can be spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub token: TokenInfo,
    pub amount: u128,
    pub transaction: RawTransaction,
}

/// Public chain RPC access.
#[async_trait]
pub trait ChainProvider: Send + Sync + std::fmt::Debug {
    async fn fee_data(&self, chain: Chain) -> Result<FeeData, ExternalError>;

    /// gas units for executing `transaction` from `from`
    async fn estimate_gas(
        &self,
        chain: Chain,
        from: &str,
        transaction: &RawTransaction,
    ) -> Result<u64, ExternalError>;

    /// native token balance in wei
    async fn balance(&self, chain: Chain, address: &str) -> Result<u128, ExternalError>;

    /// number of transactions sent from `address`, including pending
    async fn pending_transaction_count(
        &self,
        chain: Chain,
        address: &str,
    ) -> Result<u64, ExternalError>;

    /// signs `transaction` with the signer's key and broadcasts it; returns
    /// the transaction hash
    async fn send_transaction(
        &self,
        chain: Chain,
        signer: &SignerWalletInfo,
        transaction: &RawTransaction,
    ) -> Result<String, ExternalError>;

    async fn wait_for_confirmation(
        &self,
        chain: Chain,
        tx_hash: &str,
    ) -> Result<TransactionReceipt, ExternalError>;

    async fn public_balances(
        &self,
        chain: Chain,
        address: &str,
    ) -> Result<Vec<TokenBalance>, ExternalError>;

    /// approvals `owner` still needs for `spender` to move `amounts`
    async fn approvals_needed(
        &self,
        chain: Chain,
        owner: &str,
        spender: &ApprovalSpender,
        amounts: &[SelectedAmount],
    ) -> Result<Vec<ApprovalRequest>, ExternalError>;

    /// builds a public ERC-20 (or native, when `base_token`) transfer
    async fn populate_transfer(
        &self,
        chain: Chain,
        from: &str,
        selection: &SelectedAmount,
        base_token: bool,
    ) -> Result<RawTransaction, ExternalError>;
}
