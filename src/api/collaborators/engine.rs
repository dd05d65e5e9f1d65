use async_trait::async_trait;
use tokio::sync::watch;

use super::ExternalError;
use crate::models::amount::SelectedAmount;
use crate::models::amount::TokenBalance;
use crate::models::chain::Chain;
use crate::models::encryption_key::EncryptionKey;
use crate::models::gas::EstimatedGasDetails;
use crate::models::proved_transaction::ProvedTransaction;
use crate::models::swap::SwapQuote;
use crate::models::transaction_type::ProofType;

/// Everything the engine needs to estimate or prove one transaction.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub proof_type: ProofType,
    pub chain: Chain,
    pub wallet_id: String,
    pub encryption_key: EncryptionKey,

    /// consolidated (token, amount, recipient) entries
    pub recipients: Vec<SelectedAmount>,
    pub gas_details: EstimatedGasDetails,

    /// fee output paid to the broadcaster, absent when self signing
    pub broadcaster_fee: Option<SelectedAmount>,
    pub send_with_public_wallet: bool,
    pub overall_batch_min_gas_price: Option<u128>,
    pub memo: Option<String>,

    /// reveal the sender's shielded address to private transfer recipients
    pub show_sender_address: bool,
    pub swap: Option<SwapQuote>,
}

/// Proof generation progress, `fraction` in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProofProgress {
    pub fraction: f64,
    pub phase: Option<String>,
}

/// Hands progress reports from the engine to whoever renders them.
///
/// Reports never move backwards: a fraction lower than the last one sent is
/// raised to it, and values are clamped into `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ProgressSender(watch::Sender<ProofProgress>);

impl ProgressSender {
    pub fn channel() -> (Self, watch::Receiver<ProofProgress>) {
        let (tx, rx) = watch::channel(ProofProgress::default());
        (Self(tx), rx)
    }

    pub fn report(&self, fraction: f64, phase: Option<&str>) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.0.send_modify(|progress| {
            progress.fraction = progress.fraction.max(fraction);
            progress.phase = phase.map(str::to_string);
        });
    }
}

/// The wallet-and-proof engine: balance scanning, gas estimation for
/// private transactions, and proof generation.
///
/// One in-flight call per wallet at a time.
#[async_trait]
pub trait ShieldedEngine: Send + Sync + std::fmt::Debug {
    async fn shielded_balances(
        &self,
        chain: Chain,
        wallet_id: &str,
    ) -> Result<Vec<TokenBalance>, ExternalError>;

    /// rescans the wallet's merkle tree for new commitments
    async fn refresh_balances(&self, chain: Chain, wallet_id: &str) -> Result<(), ExternalError>;

    /// gas units the proved transaction will consume
    async fn estimate_gas(&self, request: &EngineRequest) -> Result<u64, ExternalError>;

    async fn generate_proof(
        &self,
        request: &EngineRequest,
        progress: ProgressSender,
    ) -> Result<ProvedTransaction, ExternalError>;

    async fn shutdown(&self);
}
