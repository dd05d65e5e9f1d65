use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;

use super::lock;
use super::random_hash;
use super::stablecoin;
use super::SHIELDED_POOL_ADDRESS;
use crate::api::collaborators::ApprovalRequest;
use crate::api::collaborators::ApprovalSpender;
use crate::api::collaborators::ChainProvider;
use crate::api::collaborators::ExternalError;
use crate::api::collaborators::RelayedTransaction;
use crate::models::address;
use crate::models::amount::SelectedAmount;
use crate::models::amount::TokenBalance;
use crate::models::chain::Chain;
use crate::models::chain::NATIVE_TOKEN_ADDRESS;
use crate::models::fee_strategy::SignerWalletInfo;
use crate::models::gas::FeeData;
use crate::models::gas::GWEI;
use crate::models::proved_transaction::RawTransaction;
use crate::models::proved_transaction::TransactionReceipt;

/// ERC-20 `approve(address,uint256)`
const APPROVE_SELECTOR: &str = "0x095ea7b3";

/// ERC-20 `transfer(address,uint256)`
const TRANSFER_SELECTOR: &str = "0xa9059cbb";

const PLAIN_TRANSFER_GAS: u64 = 21_000;
const CONTRACT_CALL_GAS: u64 = 65_000;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// an address left-padded to a 32 byte ABI word
fn abi_address(addr: &str) -> String {
    format!("{:0>64}", addr.trim_start_matches("0x").to_lowercase())
}

fn abi_amount(amount: u128) -> String {
    format!("{:064x}", amount)
}

/// the spender an `approve` call grants, if `data` is one
fn approved_spender(data: &str) -> Option<String> {
    let args = data.strip_prefix(APPROVE_SELECTOR)?;
    let spender = args.get(24..64)?;
    Some(address::normalize(&format!("0x{}", spender)))
}

fn spender_address(spender: &ApprovalSpender) -> &str {
    match spender {
        ApprovalSpender::ShieldedPool => SHIELDED_POOL_ADDRESS,
        ApprovalSpender::Contract(contract) => contract,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Allowance {
    owner: String,
    token: String,
    spender: String,
}

impl Allowance {
    fn new(owner: &str, token: &str, spender: &str) -> Self {
        Self {
            owner: address::normalize(owner),
            token: address::normalize(token),
            spender: address::normalize(spender),
        }
    }
}

#[derive(Debug)]
struct PendingReceipt {
    receipt: TransactionReceipt,
    visible_at: Instant,
}

#[derive(Debug)]
struct ChainState {
    fee_data: FeeData,
    fee_data_failures: VecDeque<ExternalError>,
    send_failures: VecDeque<ExternalError>,
    native_balance: u128,

    /// `None` means the default balances for the requested chain
    public_balances: Option<Vec<TokenBalance>>,
    allowances: Vec<Allowance>,
    nonces: HashMap<String, u64>,
    sent: Vec<RawTransaction>,
    receipts: HashMap<String, PendingReceipt>,
    auto_mine: bool,
    block_time: Duration,
    block_number: u64,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            fee_data: FeeData {
                gas_price: Some(5 * GWEI),
                max_fee_per_gas: Some(5 * GWEI),
                max_priority_fee_per_gas: Some(GWEI),
            },
            fee_data_failures: VecDeque::new(),
            send_failures: VecDeque::new(),
            native_balance: 10_000_000_000_000_000_000,
            public_balances: None,
            allowances: vec![],
            nonces: HashMap::new(),
            sent: vec![],
            receipts: HashMap::new(),
            auto_mine: false,
            block_time: Duration::ZERO,
            block_number: 19_000_000,
        }
    }
}

impl ChainState {
    fn mine(&mut self, tx_hash: &str, success: bool) {
        self.block_number += 1;
        self.receipts.insert(
            tx_hash.to_string(),
            PendingReceipt {
                receipt: TransactionReceipt {
                    tx_hash: tx_hash.to_string(),
                    block_number: self.block_number,
                    success,
                },
                visible_at: Instant::now() + self.block_time,
            },
        );
    }
}

/// An in-memory EVM node for one public wallet.
///
/// Transactions are only mined when [`SimulatedChain::set_auto_mine`] is on
/// or a test marks them mined; anything else pends forever.
#[derive(Debug, Default)]
pub struct SimulatedChain {
    state: Mutex<ChainState>,
}

impl SimulatedChain {
    pub fn set_fee_data(&self, fee_data: FeeData) {
        lock(&self.state).fee_data = fee_data;
    }

    pub fn fail_next_fee_data(&self, error: ExternalError) {
        lock(&self.state).fee_data_failures.push_back(error);
    }

    pub fn fail_next_send(&self, error: ExternalError) {
        lock(&self.state).send_failures.push_back(error);
    }

    pub fn set_native_balance(&self, wei: u128) {
        lock(&self.state).native_balance = wei;
    }

    pub fn set_public_balances(&self, balances: Vec<TokenBalance>) {
        lock(&self.state).public_balances = Some(balances);
    }

    /// mine every accepted transaction, receipts showing after `block_time`
    pub fn set_auto_mine(&self, auto_mine: bool) {
        lock(&self.state).auto_mine = auto_mine;
    }

    pub fn set_block_time(&self, block_time: Duration) {
        lock(&self.state).block_time = block_time;
    }

    pub fn mark_mined(&self, tx_hash: &str, success: bool) {
        lock(&self.state).mine(tx_hash, success);
    }

    /// transactions signed and sent by local wallets, in order
    pub fn sent(&self) -> Vec<RawTransaction> {
        lock(&self.state).sent.clone()
    }

    /// a transaction a broadcaster put on chain
    pub(super) fn include_relayed(&self, tx_hash: &str, transaction: &RelayedTransaction) {
        let mut state = lock(&self.state);
        debug!(
            "broadcaster {} relayed {}",
            address::shorten(&transaction.broadcaster_address),
            tx_hash
        );
        if state.auto_mine {
            state.mine(tx_hash, true);
        }
    }

    fn default_public_balances(chain: Chain) -> Vec<TokenBalance> {
        vec![
            TokenBalance {
                token: stablecoin(),
                amount: 25_000_000_000,
            },
            TokenBalance {
                token: chain.wrapped_base_token(),
                amount: 2_000_000_000_000_000_000,
            },
        ]
    }

    fn token_balance(&self, chain: Chain, token: &str) -> u128 {
        let token = address::normalize(token);
        lock(&self.state)
            .public_balances
            .clone()
            .unwrap_or_else(|| Self::default_public_balances(chain))
            .into_iter()
            .find(|b| address::normalize(&b.token.address) == token)
            .map_or(0, |b| b.amount)
    }
}

#[async_trait]
impl ChainProvider for SimulatedChain {
    async fn fee_data(&self, chain: Chain) -> Result<FeeData, ExternalError> {
        let mut state = lock(&self.state);
        if let Some(error) = state.fee_data_failures.pop_front() {
            return Err(error);
        }
        debug!("simulated fee data for {}", chain);
        Ok(state.fee_data)
    }

    async fn estimate_gas(
        &self,
        _chain: Chain,
        _from: &str,
        transaction: &RawTransaction,
    ) -> Result<u64, ExternalError> {
        if !address::is_public_address(&transaction.to) {
            return Err(ExternalError::new(
                "execution reverted: call to a non-contract address",
            ));
        }
        Ok(if transaction.has_call_data() {
            CONTRACT_CALL_GAS
        } else {
            PLAIN_TRANSFER_GAS
        })
    }

    async fn balance(&self, _chain: Chain, _address: &str) -> Result<u128, ExternalError> {
        Ok(lock(&self.state).native_balance)
    }

    async fn pending_transaction_count(
        &self,
        _chain: Chain,
        address: &str,
    ) -> Result<u64, ExternalError> {
        let state = lock(&self.state);
        Ok(state
            .nonces
            .get(&address::normalize(address))
            .copied()
            .unwrap_or_default())
    }

    async fn send_transaction(
        &self,
        chain: Chain,
        signer: &SignerWalletInfo,
        transaction: &RawTransaction,
    ) -> Result<String, ExternalError> {
        if transaction.from.is_some() {
            return Err(ExternalError::new(
                "transaction from address does not match the signing wallet",
            ));
        }
        let mut state = lock(&self.state);
        if let Some(error) = state.send_failures.pop_front() {
            return Err(error);
        }

        let owner = address::normalize(&signer.public_address);
        let expected_nonce = state.nonces.get(&owner).copied().unwrap_or_default();
        let nonce = transaction.nonce.unwrap_or(expected_nonce);
        if nonce < expected_nonce {
            return Err(ExternalError::with_code(
                -32603,
                format!("nonce too low: next nonce {}, tx nonce {}", expected_nonce, nonce),
            ));
        }

        let price = transaction
            .pricing
            .map(|p| p.price_per_gas())
            .unwrap_or_default();
        let gas = transaction.gas_limit.unwrap_or(CONTRACT_CALL_GAS);
        let cost = u128::from(gas)
            .checked_mul(price)
            .and_then(|c| c.checked_add(transaction.value))
            .ok_or_else(|| ExternalError::new("gas cost overflows"))?;
        if cost > state.native_balance {
            return Err(ExternalError::new(
                "insufficient funds for gas * price + value",
            ));
        }
        state.native_balance -= cost;

        if let Some(spender) = approved_spender(&transaction.data) {
            state
                .allowances
                .push(Allowance::new(&owner, &transaction.to, &spender));
        }
        state.nonces.insert(owner, nonce + 1);
        state.sent.push(transaction.clone());

        let tx_hash = random_hash();
        if state.auto_mine {
            state.mine(&tx_hash, true);
        }
        info!(
            "simulated {} transaction {} from {}",
            chain,
            tx_hash,
            address::shorten(&signer.public_address)
        );
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(
        &self,
        _chain: Chain,
        tx_hash: &str,
    ) -> Result<TransactionReceipt, ExternalError> {
        loop {
            let receipt = lock(&self.state)
                .receipts
                .get(tx_hash)
                .filter(|r| r.visible_at <= Instant::now())
                .map(|r| r.receipt.clone());
            if let Some(receipt) = receipt {
                return Ok(receipt);
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }

    async fn public_balances(
        &self,
        chain: Chain,
        _address: &str,
    ) -> Result<Vec<TokenBalance>, ExternalError> {
        Ok(lock(&self.state)
            .public_balances
            .clone()
            .unwrap_or_else(|| Self::default_public_balances(chain)))
    }

    async fn approvals_needed(
        &self,
        chain: Chain,
        owner: &str,
        spender: &ApprovalSpender,
        amounts: &[SelectedAmount],
    ) -> Result<Vec<ApprovalRequest>, ExternalError> {
        let spender = spender_address(spender);
        let native = address::normalize(NATIVE_TOKEN_ADDRESS);
        let state = lock(&self.state);

        let mut requests: Vec<ApprovalRequest> = vec![];
        for selection in amounts {
            let token = address::normalize(&selection.token_address);
            if token == native
                || state
                    .allowances
                    .contains(&Allowance::new(owner, &token, spender))
            {
                continue;
            }
            match requests
                .iter_mut()
                .find(|r| address::normalize(&r.token.address) == token)
            {
                Some(request) => {
                    request.amount = request.amount.saturating_add(selection.amount);
                }
                None => requests.push(ApprovalRequest {
                    token: selection.token(),
                    amount: selection.amount,
                    transaction: RawTransaction::call(chain, &selection.token_address, "", 0),
                }),
            }
        }
        for request in &mut requests {
            request.transaction.data = format!(
                "{}{}{}",
                APPROVE_SELECTOR,
                abi_address(spender),
                abi_amount(request.amount)
            );
        }
        Ok(requests)
    }

    async fn populate_transfer(
        &self,
        chain: Chain,
        _from: &str,
        selection: &SelectedAmount,
        base_token: bool,
    ) -> Result<RawTransaction, ExternalError> {
        let available = if base_token {
            lock(&self.state).native_balance
        } else {
            self.token_balance(chain, &selection.token_address)
        };
        if selection.amount > available {
            return Err(ExternalError::new(format!(
                "execution reverted: transfer amount exceeds {} balance",
                selection.symbol
            )));
        }

        Ok(if base_token {
            RawTransaction::call(chain, &selection.recipient_address, "0x", selection.amount)
        } else {
            RawTransaction::call(
                chain,
                &selection.token_address,
                format!(
                    "{}{}{}",
                    TRANSFER_SELECTOR,
                    abi_address(&selection.recipient_address),
                    abi_amount(selection.amount)
                ),
                0,
            )
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use macro_rules_attr::apply;

    use super::*;
    use crate::tests::shared::fixtures;
    use crate::tests::shared_tokio_runtime;

    fn signer() -> SignerWalletInfo {
        SignerWalletInfo {
            name: fixtures::WALLET_NAME.to_string(),
            wallet_id: "wallet".to_string(),
            public_address: fixtures::PUBLIC_ADDRESS.to_string(),
        }
    }

    #[test]
    fn approve_call_data_names_its_spender() {
        let data = format!(
            "{}{}{}",
            APPROVE_SELECTOR,
            abi_address(SHIELDED_POOL_ADDRESS),
            abi_amount(5)
        );
        assert_eq!(
            Some(address::normalize(SHIELDED_POOL_ADDRESS)),
            approved_spender(&data)
        );
        assert!(approved_spender("0xa9059cbb").is_none());
    }

    #[apply(shared_tokio_runtime)]
    async fn signed_transactions_must_not_carry_a_from_address() {
        let chain = SimulatedChain::default();
        let mut transaction =
            RawTransaction::call(Chain::Ethereum, fixtures::RECIPIENT_PUBLIC, "0x", 1);
        transaction.from = Some(fixtures::PUBLIC_ADDRESS.to_string());

        assert!(chain
            .send_transaction(Chain::Ethereum, &signer(), &transaction)
            .await
            .is_err());
        assert!(chain.sent().is_empty());
    }

    #[apply(shared_tokio_runtime)]
    async fn nonces_advance_per_sender() {
        let chain = SimulatedChain::default();
        let transaction =
            RawTransaction::call(Chain::Ethereum, fixtures::RECIPIENT_PUBLIC, "0x", 1);

        chain
            .send_transaction(Chain::Ethereum, &signer(), &transaction)
            .await
            .unwrap();
        assert_eq!(
            1,
            chain
                .pending_transaction_count(Chain::Ethereum, fixtures::PUBLIC_ADDRESS)
                .await
                .unwrap()
        );

        let mut stale = transaction;
        stale.nonce = Some(0);
        let err = chain
            .send_transaction(Chain::Ethereum, &signer(), &stale)
            .await
            .unwrap_err();
        assert_eq!(Some(-32603), err.code);
    }

    #[apply(shared_tokio_runtime)]
    async fn native_token_never_needs_approval() {
        let chain = SimulatedChain::default();
        let native = SelectedAmount::new(
            &Chain::Ethereum.native_token(),
            1,
            fixtures::SHIELDED_ADDRESS,
        );
        let requests = chain
            .approvals_needed(
                Chain::Ethereum,
                fixtures::PUBLIC_ADDRESS,
                &ApprovalSpender::ShieldedPool,
                &[native],
            )
            .await
            .unwrap();
        assert!(requests.is_empty());
    }

    #[apply(shared_tokio_runtime)]
    async fn auto_mined_receipts_are_returned() {
        let chain = SimulatedChain::default();
        chain.set_auto_mine(true);
        let transaction =
            RawTransaction::call(Chain::Ethereum, fixtures::RECIPIENT_PUBLIC, "0x", 1);

        let tx_hash = chain
            .send_transaction(Chain::Ethereum, &signer(), &transaction)
            .await
            .unwrap();
        let receipt = chain
            .wait_for_confirmation(Chain::Ethereum, &tx_hash)
            .await
            .unwrap();
        assert!(receipt.success);
    }
}
