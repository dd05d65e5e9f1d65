use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use tracing::info;

use super::lock;
use super::random_hash;
use super::stablecoin;
use super::RELAY_ADAPT_ADDRESS;
use super::SHIELDED_POOL_ADDRESS;
use crate::api::collaborators::engine::ProgressSender;
use crate::api::collaborators::EngineRequest;
use crate::api::collaborators::ExternalError;
use crate::api::collaborators::ShieldedEngine;
use crate::models::address;
use crate::models::amount::TokenBalance;
use crate::models::chain::Chain;
use crate::models::proved_transaction::ProofMetadata;
use crate::models::proved_transaction::ProvedTransaction;
use crate::models::proved_transaction::RawTransaction;
use crate::models::transaction_type::ProofType;

/// signer the engine's own relayer model stamps on every proved transaction
const ENGINE_SIGNER_PLACEHOLDER: &str = "0x000000000000000000000000000000000000dEaD";

/// calldata selector of the shielded pool's `transact`
const TRANSACT_SELECTOR: &str = "d8ae136a";

const PROOF_PHASES: [&str; 4] = [
    "Loading circuits",
    "Computing witness",
    "Proving",
    "Verifying",
];

#[derive(Debug, Default)]
struct EngineState {
    /// `None` means the default balances for the requested chain
    balances: Option<Vec<TokenBalance>>,
    refresh_delay: Duration,
    refresh_failures: VecDeque<ExternalError>,
    refresh_count: usize,
    proof_failures: VecDeque<ExternalError>,
    proof_count: usize,
    last_proof_request: Option<EngineRequest>,
}

/// An in-memory shielded wallet and prover.
#[derive(Debug, Default)]
pub struct SimulatedEngine {
    state: Mutex<EngineState>,

    /// wall time spent on each proof
    proof_duration: Duration,
    shut_down: AtomicBool,
}

fn default_balances(chain: Chain) -> Vec<TokenBalance> {
    vec![
        TokenBalance {
            token: stablecoin(),
            amount: 10_000_000_000,
        },
        TokenBalance {
            token: chain.wrapped_base_token(),
            amount: 5_000_000_000_000_000_000,
        },
    ]
}

impl SimulatedEngine {
    /// an engine whose proofs take `proof_duration`, with progress reported
    /// along the way
    pub fn with_proof_duration(proof_duration: Duration) -> Self {
        Self {
            proof_duration,
            ..Self::default()
        }
    }

    pub fn set_shielded_balances(&self, balances: Vec<TokenBalance>) {
        lock(&self.state).balances = Some(balances);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        lock(&self.state).refresh_delay = delay;
    }

    pub fn fail_next_refresh(&self, error: ExternalError) {
        lock(&self.state).refresh_failures.push_back(error);
    }

    /// queues failures for the next proof attempts, one per attempt
    pub fn fail_next_proofs(&self, errors: Vec<ExternalError>) {
        lock(&self.state).proof_failures.extend(errors);
    }

    pub fn refresh_count(&self) -> usize {
        lock(&self.state).refresh_count
    }

    /// proof attempts made, failed ones included
    pub fn proof_count(&self) -> usize {
        lock(&self.state).proof_count
    }

    pub fn last_proof_request(&self) -> Option<EngineRequest> {
        lock(&self.state).last_proof_request.clone()
    }

    fn ensure_running(&self) -> Result<(), ExternalError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ExternalError::new("engine is shut down"));
        }
        Ok(())
    }

    fn balances(&self, chain: Chain) -> Vec<TokenBalance> {
        lock(&self.state)
            .balances
            .clone()
            .unwrap_or_else(|| default_balances(chain))
    }

    /// Fails like the real engine when the spent amounts, the broadcaster
    /// fee included, exceed the shielded balance of a token.
    fn check_spendable(&self, request: &EngineRequest) -> Result<(), ExternalError> {
        if request.encryption_key.expose().is_empty() {
            return Err(ExternalError::new("Could not decrypt wallet: bad password"));
        }
        if matches!(request.proof_type, ProofType::Shield | ProofType::ShieldBase) {
            return Ok(());
        }

        let balances = self.balances(request.chain);
        let spent = request
            .recipients
            .iter()
            .chain(request.broadcaster_fee.as_ref())
            .collect::<Vec<_>>();
        for entry in &spent {
            let token = address::normalize(&entry.token_address);
            let total = spent
                .iter()
                .filter(|s| address::normalize(&s.token_address) == token)
                .fold(0u128, |sum, s| sum.saturating_add(s.amount));
            let available = balances
                .iter()
                .find(|b| address::normalize(&b.token.address) == token)
                .map_or(0, |b| b.amount);
            if total > available {
                return Err(ExternalError::new(format!(
                    "Private balance too low for {}",
                    entry.symbol
                )));
            }
        }
        Ok(())
    }

    fn gas_units(request: &EngineRequest) -> u64 {
        let outputs = u64::try_from(request.recipients.len()).unwrap_or(u64::MAX);
        let base = match request.proof_type {
            ProofType::Shield | ProofType::ShieldBase => 160_000,
            ProofType::Transfer | ProofType::Unshield => 320_000,
            ProofType::UnshieldBase => 420_000,
            ProofType::CrossContractCalls => 650_000,
        };
        let fee_output = if request.broadcaster_fee.is_some() {
            70_000
        } else {
            0
        };
        let memo = if request.memo.is_some() { 12_000 } else { 0 };
        outputs
            .saturating_mul(60_000)
            .saturating_add(base + fee_output + memo)
    }

    fn proved(request: &EngineRequest) -> ProvedTransaction {
        let to = match request.proof_type {
            ProofType::UnshieldBase | ProofType::CrossContractCalls => RELAY_ADAPT_ADDRESS,
            _ => SHIELDED_POOL_ADDRESS,
        };
        let value = match request.proof_type {
            ProofType::ShieldBase => request
                .recipients
                .iter()
                .fold(0u128, |sum, r| sum.saturating_add(r.amount)),
            _ => 0,
        };
        let payload: [u8; 64] = std::array::from_fn(|_| rand::random());
        let mut raw_transaction = RawTransaction::call(
            request.chain,
            to,
            format!("0x{}{}", TRANSACT_SELECTOR, hex::encode(payload)),
            value,
        );
        raw_transaction.from = Some(ENGINE_SIGNER_PLACEHOLDER.to_string());
        raw_transaction.pricing = Some(request.gas_details.pricing);

        ProvedTransaction {
            raw_transaction,
            nullifiers: request.recipients.iter().map(|_| random_hash()).collect(),
            metadata: ProofMetadata {
                proof_type: Some(request.proof_type),
                broadcaster_fee: request.broadcaster_fee.clone(),
                memo: request.memo.clone(),
                created_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl ShieldedEngine for SimulatedEngine {
    async fn shielded_balances(
        &self,
        chain: Chain,
        wallet_id: &str,
    ) -> Result<Vec<TokenBalance>, ExternalError> {
        self.ensure_running()?;
        debug!("simulated shielded balances for {} on {}", wallet_id, chain);
        Ok(self.balances(chain))
    }

    async fn refresh_balances(&self, chain: Chain, wallet_id: &str) -> Result<(), ExternalError> {
        self.ensure_running()?;
        let (delay, failure) = {
            let mut state = lock(&self.state);
            state.refresh_count += 1;
            (state.refresh_delay, state.refresh_failures.pop_front())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = failure {
            return Err(error);
        }
        debug!("simulated rescan of {} on {}", wallet_id, chain);
        Ok(())
    }

    async fn estimate_gas(&self, request: &EngineRequest) -> Result<u64, ExternalError> {
        self.ensure_running()?;
        self.check_spendable(request)?;
        Ok(Self::gas_units(request))
    }

    async fn generate_proof(
        &self,
        request: &EngineRequest,
        progress: ProgressSender,
    ) -> Result<ProvedTransaction, ExternalError> {
        self.ensure_running()?;
        let failure = {
            let mut state = lock(&self.state);
            state.proof_count += 1;
            state.last_proof_request = Some(request.clone());
            state.proof_failures.pop_front()
        };
        if let Some(error) = failure {
            return Err(error);
        }
        self.check_spendable(request)?;

        let steps = u32::try_from(PROOF_PHASES.len()).unwrap_or(1);
        let pause = self.proof_duration / steps;
        for (i, phase) in (1u32..).zip(PROOF_PHASES) {
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            progress.report(f64::from(i) / f64::from(steps), Some(phase));
        }

        let proved = Self::proved(request);
        info!(
            "simulated {} proof on {} with {} nullifier(s)",
            request.proof_type,
            request.chain,
            proved.nullifiers.len()
        );
        Ok(proved)
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        info!("simulated engine stopped");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use macro_rules_attr::apply;

    use super::*;
    use crate::models::amount::SelectedAmount;
    use crate::models::encryption_key::EncryptionKey;
    use crate::models::gas::EstimatedGasDetails;
    use crate::models::gas::GasPricing;
    use crate::models::gas::GWEI;
    use crate::tests::shared_tokio_runtime;

    fn request(amount: u128, fee: Option<u128>) -> EngineRequest {
        let usdc = stablecoin();
        EngineRequest {
            proof_type: ProofType::Transfer,
            chain: Chain::Ethereum,
            wallet_id: "wallet".to_string(),
            encryption_key: EncryptionKey::from("hunter2"),
            recipients: vec![SelectedAmount::new(&usdc, amount, "0zkbob")],
            gas_details: EstimatedGasDetails {
                gas_estimate: 0,
                pricing: GasPricing::Legacy {
                    gas_price: 5 * GWEI,
                },
            },
            broadcaster_fee: fee.map(|f| SelectedAmount::new(&usdc, f, "0zkbroadcaster")),
            send_with_public_wallet: fee.is_none(),
            overall_batch_min_gas_price: None,
            memo: None,
            show_sender_address: false,
            swap: None,
        }
    }

    #[apply(shared_tokio_runtime)]
    async fn fee_counts_towards_the_spent_balance() {
        let engine = SimulatedEngine::default();
        assert!(engine.estimate_gas(&request(10_000_000_000, None)).await.is_ok());

        let err = engine
            .estimate_gas(&request(10_000_000_000, Some(1)))
            .await
            .unwrap_err();
        assert!(err.mentions("private balance too low"));
    }

    #[apply(shared_tokio_runtime)]
    async fn proofs_carry_a_placeholder_signer_and_call_data() {
        let engine = SimulatedEngine::default();
        let (progress, rx) = ProgressSender::channel();

        let proved = engine
            .generate_proof(&request(1_000_000, None), progress)
            .await
            .unwrap();

        assert!(proved.raw_transaction.from.is_some());
        assert!(proved.raw_transaction.has_call_data());
        assert!(address::is_public_address(&proved.raw_transaction.to));
        assert_eq!(1, proved.nullifiers.len());
        assert_eq!(1.0, rx.borrow().fraction);
    }

    #[apply(shared_tokio_runtime)]
    async fn stopped_engine_refuses_work() {
        let engine = SimulatedEngine::default();
        engine.shutdown().await;
        assert!(engine
            .shielded_balances(Chain::Ethereum, "wallet")
            .await
            .is_err());
    }
}
