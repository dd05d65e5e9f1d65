//! proof generation with progress reporting and transient-failure retries.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use tracing::warn;

use super::error::ProofError;
use super::error::SelectionError;
use super::request::RequestParts;
use super::state::FeeResolved;
use crate::api::collaborators::engine::ProgressSender;
use crate::api::collaborators::engine::ProofProgress;
use crate::api::collaborators::ExternalError;
use crate::api::collaborators::Prompter;
use crate::application::retry::retry_with_backoff;
use crate::application::session::SessionContext;
use crate::models::address;
use crate::models::amount::consolidate;
use crate::models::amount::format_units;
use crate::models::amount::SelectedAmount;
use crate::models::proved_transaction::ProvedTransaction;
use crate::models::transaction_type::TransactionType;

/// Rejects selections the engine must never see: nothing selected, or an
/// amount of zero. Returns the consolidated recipients.
pub fn validate_recipients(
    recipients: &[SelectedAmount],
) -> Result<Vec<SelectedAmount>, SelectionError> {
    if recipients.is_empty() {
        return Err(SelectionError::Empty);
    }
    if let Some(zero) = recipients.iter().find(|r| r.amount == 0) {
        return Err(SelectionError::ZeroAmount {
            symbol: zero.symbol.clone(),
        });
    }
    consolidate(recipients).ok_or(SelectionError::Overflow)
}

/// `amount + fee = total` for the token the broadcaster is paid in, or the
/// plain amounts when there is no fee.
fn shortfall_breakdown(recipients: &[SelectedAmount], fee: Option<&SelectedAmount>) -> String {
    let Some(fee) = fee else {
        let amounts = recipients
            .iter()
            .map(SelectedAmount::display_amount)
            .collect::<Vec<_>>()
            .join(", ");
        return format!("Insufficient shielded balance for {}", amounts);
    };

    let same_token = |r: &&SelectedAmount| {
        address::normalize(&r.token_address) == address::normalize(&fee.token_address)
    };
    let amount = recipients
        .iter()
        .filter(same_token)
        .fold(0u128, |sum, r| sum.saturating_add(r.amount));
    let total = amount.saturating_add(fee.amount);
    format!(
        "Insufficient shielded balance: {} + {} broadcaster fee = {} {}",
        format_units(amount, fee.decimals),
        format_units(fee.amount, fee.decimals),
        format_units(total, fee.decimals),
        fee.symbol
    )
}

/// forwards engine progress to the prompter until the sender side is gone
fn forward_progress(
    prompter: Arc<dyn Prompter>,
    mut progress: watch::Receiver<ProofProgress>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let current = progress.borrow_and_update().clone();
            prompter.progress(&current);
        }
    })
}

/// Generates the proof for a fee-resolved transaction.
///
/// Validation happens before the engine is called. The engine's transient
/// "cannot cache a transaction with a from address" failure is retried per
/// the session's retry policy.
pub async fn generate(
    ctx: &SessionContext,
    tx_type: TransactionType,
    stage: &FeeResolved,
) -> Result<ProvedTransaction, ProofError> {
    let recipients = validate_recipients(&stage.inputs.recipients())?;
    let estimate = stage
        .estimate
        .as_ref()
        .ok_or(ProofError::MissingGasEstimate)?;
    let proof_type = tx_type
        .proof_type()
        .ok_or_else(|| ProofError::NotProvable(tx_type.to_string()))?;

    let parts = RequestParts {
        proof_type,
        inputs: &stage.inputs,
        key: &stage.key,
        fee: &stage.fee,
        memo: stage.memo.as_deref(),
    };
    let mut request = parts.build(
        ctx,
        estimate.gas_details,
        estimate.broadcaster_fee_recipient.clone(),
        estimate.overall_batch_min_gas_price,
    );
    request.recipients = recipients;

    info!(
        "generating {} proof on {} for {} recipient(s)",
        proof_type,
        ctx.chain,
        request.recipients.len()
    );

    let (sender, receiver) = ProgressSender::channel();
    let forwarder = forward_progress(ctx.collaborators.prompter.clone(), receiver);

    let engine = ctx.collaborators.engine.as_ref();
    let request_ref = &request;
    let policy = ctx.settings.proof_retry;
    let result = retry_with_backoff(
        policy,
        "proof generation",
        ProofError::is_transient,
        |_attempt| {
            let progress = sender.clone();
            async move { engine.generate_proof(request_ref, progress).await }
        },
    )
    .await;

    drop(sender);
    if let Err(e) = forwarder.await {
        warn!("progress forwarding ended abnormally: {}", e);
    }

    result
        .map(|proved| {
            info!(
                "{} proof ready with {} nullifier(s)",
                proof_type,
                proved.nullifiers.len()
            );
            proved
        })
        .map_err(|e| {
            classify(
                e,
                policy.max_attempts,
                &request.recipients,
                request.broadcaster_fee.as_ref(),
            )
        })
}

fn classify(
    error: ExternalError,
    attempts: u32,
    recipients: &[SelectedAmount],
    fee: Option<&SelectedAmount>,
) -> ProofError {
    warn!("proof generation failed: {}", error);
    if ProofError::is_transient(&error) {
        ProofError::RetriesExhausted {
            attempts,
            source: error,
        }
    } else if ProofError::is_shielded_shortfall(&error) {
        ProofError::InsufficientShieldedBalance {
            breakdown: shortfall_breakdown(recipients, fee),
        }
    } else {
        ProofError::Engine(error)
    }
}
