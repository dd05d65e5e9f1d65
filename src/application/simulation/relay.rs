use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;

use super::known_tokens;
use super::lock;
use super::prices;
use super::random_hash;
use super::SimulatedChain;
use super::SIMULATED_BROADCASTERS;
use crate::api::collaborators::BroadcasterNetwork;
use crate::api::collaborators::ExternalError;
use crate::api::collaborators::RelayedTransaction;
use crate::models::address;
use crate::models::chain::Chain;
use crate::models::fee_strategy::BroadcasterQuote;

#[derive(Debug, Default)]
struct RelayState {
    list_failures: VecDeque<ExternalError>,
    submit_failures: VecDeque<ExternalError>,
    submitted: Vec<RelayedTransaction>,
    preferred: Vec<String>,
}

/// A broadcaster network of [`SIMULATED_BROADCASTERS`] that relays onto a
/// [`SimulatedChain`].
#[derive(Debug)]
pub struct SimulatedRelay {
    chain: Arc<SimulatedChain>,
    state: Mutex<RelayState>,
    shut_down: AtomicBool,
}

impl SimulatedRelay {
    pub fn new(chain: Arc<SimulatedChain>) -> Self {
        Self {
            chain,
            state: Mutex::default(),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn fail_next_list(&self, error: ExternalError) {
        lock(&self.state).list_failures.push_back(error);
    }

    pub fn fail_next_submit(&self, error: ExternalError) {
        lock(&self.state).submit_failures.push_back(error);
    }

    /// transactions accepted for relaying, in order
    pub fn submitted(&self) -> Vec<RelayedTransaction> {
        lock(&self.state).submitted.clone()
    }

    pub fn preferred(&self) -> Vec<String> {
        lock(&self.state).preferred.clone()
    }

    fn ensure_running(&self) -> Result<(), ExternalError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ExternalError::new("broadcaster network is shut down"));
        }
        Ok(())
    }
}

#[async_trait]
impl BroadcasterNetwork for SimulatedRelay {
    async fn list_broadcasters(
        &self,
        chain: Chain,
        fee_token: &str,
        use_relay_adapt: bool,
    ) -> Result<Vec<BroadcasterQuote>, ExternalError> {
        self.ensure_running()?;
        if let Some(error) = lock(&self.state).list_failures.pop_front() {
            return Err(error);
        }

        let wanted = address::normalize(fee_token);
        let Some(token) = known_tokens(chain)
            .into_iter()
            .find(|t| address::normalize(&t.address) == wanted)
        else {
            debug!("no broadcaster accepts {} on {}", fee_token, chain);
            return Ok(vec![]);
        };
        let Some(rate) = prices::base_token_rate(chain, &token) else {
            return Ok(vec![]);
        };

        let quotes = (0u32..)
            .zip(SIMULATED_BROADCASTERS)
            .map(|(i, (railgun_address, markup_bps))| BroadcasterQuote {
                railgun_address: railgun_address.to_string(),
                fee_token: token.address.clone(),
                fees_id: format!("fees-{}-{}", i, token.symbol),
                fee_per_unit_gas: rate.saturating_mul(markup_bps) / 10_000,
                available_wallets: 2 + i,
            })
            .collect::<Vec<_>>();
        debug!(
            "{} broadcasters for {} on {} (relay adapt: {})",
            quotes.len(),
            token.symbol,
            chain,
            use_relay_adapt
        );
        Ok(quotes)
    }

    async fn submit(&self, transaction: &RelayedTransaction) -> Result<String, ExternalError> {
        self.ensure_running()?;
        if let Some(error) = lock(&self.state).submit_failures.pop_front() {
            return Err(error);
        }
        let broadcaster = address::normalize(&transaction.broadcaster_address);
        let known = SIMULATED_BROADCASTERS
            .iter()
            .any(|(railgun_address, _)| address::normalize(railgun_address) == broadcaster);
        if !known {
            return Err(ExternalError::new(format!(
                "broadcaster {} is not reachable",
                address::shorten(&transaction.broadcaster_address)
            )));
        }

        let tx_hash = random_hash();
        lock(&self.state).submitted.push(transaction.clone());
        self.chain.include_relayed(&tx_hash, transaction);
        info!(
            "broadcaster {} submitted {} on {}",
            address::shorten(&transaction.broadcaster_address),
            tx_hash,
            transaction.chain
        );
        Ok(tx_hash)
    }

    async fn set_preferred_broadcasters(&self, addresses: &[String]) {
        lock(&self.state).preferred = addresses.to_vec();
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        info!("simulated broadcaster network stopped");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use macro_rules_attr::apply;

    use super::*;
    use crate::api::collaborators::ChainProvider;
    use crate::application::simulation::stablecoin;
    use crate::tests::shared::fixtures;
    use crate::tests::shared_tokio_runtime;

    #[apply(shared_tokio_runtime)]
    async fn quotes_follow_broadcaster_markup() {
        let relay = SimulatedRelay::new(Arc::new(SimulatedChain::default()));
        let quotes = relay
            .list_broadcasters(Chain::Ethereum, &stablecoin().address, false)
            .await
            .unwrap();

        assert_eq!(SIMULATED_BROADCASTERS.len(), quotes.len());
        assert_eq!(2_640_000_000, quotes[0].fee_per_unit_gas);
        assert!(quotes[1].fee_per_unit_gas < quotes[0].fee_per_unit_gas);
        assert!(quotes[2].fee_per_unit_gas > quotes[0].fee_per_unit_gas);
    }

    #[apply(shared_tokio_runtime)]
    async fn unknown_fee_token_has_no_broadcasters() {
        let relay = SimulatedRelay::new(Arc::new(SimulatedChain::default()));
        let quotes = relay
            .list_broadcasters(Chain::Ethereum, fixtures::RECIPIENT_PUBLIC, false)
            .await
            .unwrap();
        assert!(quotes.is_empty());
    }

    #[apply(shared_tokio_runtime)]
    async fn relayed_transactions_are_mined_on_the_chain() {
        let chain = Arc::new(SimulatedChain::default());
        chain.set_auto_mine(true);
        let relay = SimulatedRelay::new(chain.clone());

        let transaction = RelayedTransaction {
            chain: Chain::Ethereum,
            raw_transaction: fixtures::proved_transaction().raw_transaction,
            nullifiers: vec![],
            fees_id: "fees-0-USDC".to_string(),
            broadcaster_address: fixtures::BROADCASTER_ADDRESS.to_string(),
            overall_batch_min_gas_price: None,
            use_relay_adapt: false,
        };
        let tx_hash = relay.submit(&transaction).await.unwrap();

        let receipt = chain
            .wait_for_confirmation(Chain::Ethereum, &tx_hash)
            .await
            .unwrap();
        assert!(receipt.success);
        assert!(chain.sent().is_empty());
        assert_eq!(vec![transaction], relay.submitted());
    }
}
