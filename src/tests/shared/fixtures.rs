use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;

use super::files::unit_test_dir;
use super::prompter::ScriptedPrompter;
use super::prompter::Step;
use crate::api::broadcaster::CustomBroadcasters;
use crate::api::tx_builder::state::TxInputs;
use crate::application::config::builder_settings::BuilderSettings;
use crate::application::loops::confirmation_watcher::ConfirmationWatcher;
use crate::application::retry::RetryPolicy;
use crate::application::session::ActiveWallet;
use crate::application::session::Collaborators;
use crate::application::session::PasswordCache;
use crate::application::session::SessionContext;
use crate::application::simulation::simulated_wallet;
use crate::application::simulation::stablecoin;
use crate::application::simulation::SimulatedChain;
use crate::application::simulation::SimulatedEngine;
use crate::application::simulation::SimulatedQuoter;
use crate::application::simulation::SimulatedRelay;
use crate::application::simulation::SHIELDED_POOL_ADDRESS;
use crate::application::simulation::SIMULATED_BROADCASTERS;
use crate::application::status::StatusLine;
use crate::models::amount::SelectedAmount;
use crate::models::amount::TokenInfo;
use crate::models::chain::Chain;
use crate::models::encryption_key::EncryptionKey;
use crate::models::fee_strategy::BroadcasterSelection;
use crate::models::fee_strategy::FeeStrategy;
use crate::models::fee_strategy::FeeTokenDetails;
use crate::models::gas::EstimatedGasDetails;
use crate::models::gas::GasEstimate;
use crate::models::gas::GasPricing;
use crate::models::gas::GWEI;
use crate::models::proved_transaction::ProofMetadata;
use crate::models::proved_transaction::ProvedTransaction;
use crate::models::proved_transaction::RawTransaction;
use crate::models::proved_transaction::SubmittedTransaction;
use crate::models::transaction_type::ProofType;

pub const WALLET_NAME: &str = "alice";
pub const PUBLIC_ADDRESS: &str = "0x7a16fF8270133F063aAb6C9977183D9e72835428";
pub const SHIELDED_ADDRESS: &str =
    "0zk1qyk9nn28x0u3rwn5pknglda68wrn7gw6anjw8gg94mcj6eq5u48tlrv7j6fe3z53lama02nutwtcqc979wnce0qwly4y7w4rls5cq040g7z8eagshxrw5ajy990";
pub const RECIPIENT_SHIELDED: &str =
    "0zk1qyn0qa5rgk7z2l8wyhkp6q5e7g6x3dh2jxdwgvvvjqg4s2ehd5qwrrv7j6fe3z53la5t3fp0alqk5rjn3yv4dyk4rrhfw2kg7tq2xkdyqqdwk0qcmyq7gn";
pub const RECIPIENT_PUBLIC: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
pub const BROADCASTER_ADDRESS: &str = SIMULATED_BROADCASTERS[0].0;

/// the session's active wallet
pub fn wallet() -> ActiveWallet {
    ActiveWallet {
        name: WALLET_NAME.to_string(),
        wallet_id: "4f1c2a7be09d3385".to_string(),
        shielded_address: SHIELDED_ADDRESS.to_string(),
        public_address: PUBLIC_ADDRESS.to_string(),
    }
}

pub fn token() -> TokenInfo {
    stablecoin()
}

pub fn key() -> EncryptionKey {
    EncryptionKey::from("hunter2")
}

pub fn self_signed() -> FeeStrategy {
    FeeStrategy::SelfSigned {
        signer: wallet().signer(),
    }
}

pub fn broadcasted() -> FeeStrategy {
    FeeStrategy::Broadcasted {
        broadcaster: BroadcasterSelection {
            railgun_address: BROADCASTER_ADDRESS.to_string(),
            fee_token: token().address,
            fees_id: "fees-0-USDC".to_string(),
        },
        fee_token: FeeTokenDetails {
            token: token(),
            fee_per_unit_gas: 2_500_000_000,
        },
    }
}

/// a self-signed estimate: 250k gas at 5 gwei
pub fn estimate() -> GasEstimate {
    GasEstimate {
        symbol: "ETH".to_string(),
        estimated_cost: 1_250_000_000_000_000,
        cost_decimals: 18,
        gas_details: EstimatedGasDetails {
            gas_estimate: 250_000,
            pricing: GasPricing::Eip1559 {
                max_fee_per_gas: 5 * GWEI,
                max_priority_fee_per_gas: GWEI,
            },
        },
        broadcaster_fee_recipient: None,
        overall_batch_min_gas_price: None,
    }
}

/// a proved private transfer as handed back by the engine, before any
/// signer specific fields are filled in
pub fn proved_transaction() -> ProvedTransaction {
    ProvedTransaction {
        raw_transaction: RawTransaction::call(
            Chain::Ethereum,
            SHIELDED_POOL_ADDRESS,
            "0xd8ae136a00000000000000000000000000000000000000000000000000000000000000a0",
            0,
        ),
        nullifiers: vec![
            "0x1d3a6d5e1c8e3b9ac7a5c0c1f3e9a4b2d6f8e0a1c3b5d7f9e1a3c5b7d9f1e3a5".to_string(),
        ],
        metadata: ProofMetadata {
            proof_type: Some(ProofType::Transfer),
            broadcaster_fee: None,
            memo: None,
            created_at: Utc::now(),
        },
    }
}

/// `amount` USDC units to [`RECIPIENT_SHIELDED`]
pub fn transfer_inputs(amount: u128) -> TxInputs {
    TxInputs::Amounts(vec![SelectedAmount::new(
        &token(),
        amount,
        RECIPIENT_SHIELDED,
    )])
}

/// Records the transactions it is asked to watch instead of waiting.
#[derive(Debug, Default)]
pub struct RecordingWatcher {
    watched: Mutex<Vec<SubmittedTransaction>>,
}

impl RecordingWatcher {
    pub fn watched(&self) -> Vec<SubmittedTransaction> {
        self.watched.lock().unwrap().clone()
    }
}

impl ConfirmationWatcher for RecordingWatcher {
    fn watch(&self, transaction: &SubmittedTransaction) {
        self.watched.lock().unwrap().push(transaction.clone());
    }
}

/// A session on simulated collaborators, plus typed handles on each of
/// them for steering and inspection.
#[derive(Debug)]
pub struct TestSession {
    pub ctx: SessionContext,
    pub engine: Arc<SimulatedEngine>,
    pub chain: Arc<SimulatedChain>,
    pub relay: Arc<SimulatedRelay>,
    pub quoter: Arc<SimulatedQuoter>,
    pub prompter: Arc<ScriptedPrompter>,
    pub watcher: Arc<RecordingWatcher>,
}

pub fn session(steps: Vec<Step>) -> TestSession {
    session_on(Chain::Ethereum, steps)
}

pub fn session_on(chain: Chain, steps: Vec<Step>) -> TestSession {
    let engine = Arc::new(SimulatedEngine::default());
    let provider = Arc::new(SimulatedChain::default());
    let relay = Arc::new(SimulatedRelay::new(provider.clone()));
    let quoter = Arc::new(SimulatedQuoter);
    let prompter = Arc::new(ScriptedPrompter::new(steps));
    let watcher = Arc::new(RecordingWatcher::default());

    let wallet = wallet();
    let settings = BuilderSettings {
        proof_retry: RetryPolicy::new(3, Duration::from_millis(1)),
        ..BuilderSettings::default()
    };
    let ctx = SessionContext {
        chain,
        signer_wallets: vec![wallet.signer(), simulated_wallet("bob").signer()],
        wallet,
        settings,
        collaborators: Collaborators {
            engine: engine.clone(),
            provider: provider.clone(),
            relay: relay.clone(),
            quoter: quoter.clone(),
            prompter: prompter.clone(),
        },
        status: StatusLine::default(),
        watcher: watcher.clone(),
        custom_broadcasters: Arc::new(AsyncMutex::new(CustomBroadcasters::empty(
            unit_test_dir().join(".broadcasters.json"),
        ))),
        password: PasswordCache::default(),
    };

    TestSession {
        ctx,
        engine,
        chain: provider,
        relay,
        quoter,
        prompter,
        watcher,
    }
}
