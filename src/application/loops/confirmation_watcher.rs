//! fire-and-forget tracking of submitted transactions.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing::warn;

use crate::api::collaborators::prompt::Notice;
use crate::api::collaborators::with_timeout;
use crate::api::collaborators::ChainProvider;
use crate::application::status::StatusLine;
use crate::models::proved_transaction::SubmittedTransaction;

/// how long a "Transaction Mined" status stays on screen
pub const MINED_STATUS_TTL: Duration = Duration::from_secs(30);

/// Starts confirmation tracking for a submitted transaction without
/// blocking the caller.
pub trait ConfirmationWatcher: Send + Sync + std::fmt::Debug {
    fn watch(&self, transaction: &SubmittedTransaction);
}

/// Waits for the receipt on a spawned task and reports the outcome on the
/// status line. Never propagates errors.
#[derive(Debug, Clone)]
pub struct BackgroundConfirmationWatcher {
    provider: Arc<dyn ChainProvider>,
    status: StatusLine,
    timeout: Duration,
}

impl BackgroundConfirmationWatcher {
    pub fn new(provider: Arc<dyn ChainProvider>, status: StatusLine, timeout: Duration) -> Self {
        Self {
            provider,
            status,
            timeout,
        }
    }

    /// waits for `transaction` and updates the status; returns whether it
    /// was mined successfully
    pub async fn wait(&self, transaction: &SubmittedTransaction) -> bool {
        let chain = transaction.chain;
        let url = chain.transaction_url(&transaction.tx_hash);
        let receipt = with_timeout(
            "confirmation wait",
            self.timeout,
            self.provider
                .wait_for_confirmation(chain, &transaction.tx_hash),
        )
        .await;

        match receipt {
            Ok(receipt) if receipt.success => {
                info!(
                    "{} transaction {} mined in block {}",
                    transaction.path, transaction.tx_hash, receipt.block_number
                );
                self.status.set_pinned(
                    Notice::Success,
                    format!("Transaction Mined: {}", url),
                    MINED_STATUS_TTL,
                );
                true
            }
            Ok(receipt) => {
                warn!(
                    "transaction {} reverted in block {}",
                    transaction.tx_hash, receipt.block_number
                );
                self.status.set_pinned(
                    Notice::Error,
                    format!("Transaction Reverted: {}", url),
                    MINED_STATUS_TTL,
                );
                false
            }
            Err(e) => {
                warn!("could not confirm transaction {}: {}", transaction.tx_hash, e);
                self.status.set(
                    Notice::Warning,
                    format!("Could not confirm {}: {}", url, e.truncated(80)),
                    Some(MINED_STATUS_TTL),
                );
                false
            }
        }
    }
}

impl ConfirmationWatcher for BackgroundConfirmationWatcher {
    fn watch(&self, transaction: &SubmittedTransaction) {
        let watcher = self.clone();
        let transaction = transaction.clone();
        tokio::spawn(async move {
            watcher.wait(&transaction).await;
        });
    }
}
