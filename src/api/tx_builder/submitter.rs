//! delivers a proved transaction, either signed by a local wallet or handed
//! to a broadcaster.
//!
//! a successful send starts confirmation tracking and returns at once. the
//! receipt is awaited in the background.

use tracing::info;
use tracing::warn;

use super::error::SubmitError;
use super::gas_estimator::network_pricing;
use crate::api::collaborators::prompt::Notice;
use crate::api::collaborators::RelayedTransaction;
use crate::application::session::SessionContext;
use crate::models::address;
use crate::models::amount::format_units;
use crate::models::fee_strategy::BroadcasterSelection;
use crate::models::fee_strategy::FeeStrategy;
use crate::models::fee_strategy::SignerWalletInfo;
use crate::models::gas::GasEstimate;
use crate::models::gas::GasPricing;
use crate::models::proved_transaction::ProvedTransaction;
use crate::models::proved_transaction::RawTransaction;
use crate::models::proved_transaction::SubmitPath;
use crate::models::proved_transaction::SubmittedTransaction;
use crate::models::transaction_type::TransactionType;

/// Rejects transactions no node would accept: a non-public destination, or
/// neither call data nor value.
fn validate(transaction: &RawTransaction) -> Result<(), SubmitError> {
    if !address::is_public_address(&transaction.to) {
        return Err(SubmitError::Malformed(format!(
            "destination `{}` is not a public address",
            transaction.to
        )));
    }
    if !transaction.has_call_data() && transaction.value == 0 {
        return Err(SubmitError::Malformed(
            "transaction has neither call data nor value".to_string(),
        ));
    }
    Ok(())
}

/// Pricing for a self-signed send, raised to the chain's self sign floor.
///
/// Pricing below the floor is replaced by fresh network pricing, which is
/// itself floored.
async fn self_signed_pricing(ctx: &SessionContext, current: GasPricing) -> GasPricing {
    let Some(floor) = ctx.settings.gas_floors.floor_for(ctx.chain, true) else {
        return current;
    };
    if current.price_per_gas() >= floor {
        return current;
    }
    info!(
        "gas price {} is below the {} self sign floor {}, refetching",
        current.price_per_gas(),
        ctx.chain,
        floor
    );
    match network_pricing(ctx, true).await {
        Ok(fresh) => fresh.with_floor(floor),
        Err(e) => {
            warn!("could not refetch fee data, using the floor: {}", e);
            current.with_floor(floor)
        }
    }
}

async fn send_self_signed(
    ctx: &SessionContext,
    signer: &SignerWalletInfo,
    proved: &ProvedTransaction,
    estimate: &GasEstimate,
) -> Result<String, SubmitError> {
    let provider = &ctx.collaborators.provider;
    let classify = |e| SubmitError::from_external(e, false);

    let mut transaction = proved.raw_transaction.clone();
    transaction.from = None;
    validate(&transaction)?;

    let pricing = transaction
        .pricing
        .unwrap_or(estimate.gas_details.pricing);
    let pricing = self_signed_pricing(ctx, pricing).await;
    transaction.pricing = Some(pricing);

    if transaction.nonce.is_none() {
        let nonce = provider
            .pending_transaction_count(ctx.chain, &signer.public_address)
            .await
            .map_err(classify)?;
        transaction.nonce = Some(nonce);
    }

    // the pre-flight estimate only informs; the node has the final say
    let units = match provider
        .estimate_gas(ctx.chain, &signer.public_address, &transaction)
        .await
    {
        Ok(units) => units,
        Err(e) => {
            warn!("pre-flight gas estimate failed: {}", e);
            ctx.prompter().notify(
                Notice::Warning,
                &format!("Gas estimate failed ({}). Sending anyway.", e.truncated(80)),
            );
            estimate.gas_details.gas_estimate
        }
    };
    let gas_limit = transaction.gas_limit.unwrap_or(units);
    transaction.gas_limit = Some(gas_limit);

    let required = u128::from(gas_limit)
        .checked_mul(pricing.price_per_gas())
        .and_then(|gas| gas.checked_add(transaction.value))
        .ok_or_else(|| SubmitError::Malformed("gas cost overflows".to_string()))?;
    let available = provider
        .balance(ctx.chain, &signer.public_address)
        .await
        .map_err(classify)?;
    if available < required {
        return Err(SubmitError::InsufficientGasBalance {
            wallet: signer.name.clone(),
            symbol: ctx.chain.base_symbol().to_string(),
            available: format_units(available, 18),
            required: format_units(required, 18),
        });
    }

    info!(
        "sending self signed transaction from {} with nonce {:?}",
        signer.public_address, transaction.nonce
    );
    provider
        .send_transaction(ctx.chain, signer, &transaction)
        .await
        .map_err(classify)
}

async fn send_via_broadcaster(
    ctx: &SessionContext,
    tx_type: TransactionType,
    broadcaster: &BroadcasterSelection,
    proved: &ProvedTransaction,
    estimate: &GasEstimate,
) -> Result<String, SubmitError> {
    let relayed = RelayedTransaction {
        chain: ctx.chain,
        raw_transaction: proved.raw_transaction.clone(),
        nullifiers: proved.nullifiers.clone(),
        fees_id: broadcaster.fees_id.clone(),
        broadcaster_address: broadcaster.railgun_address.clone(),
        overall_batch_min_gas_price: estimate.overall_batch_min_gas_price,
        use_relay_adapt: tx_type.uses_relay_adapt(),
    };
    info!(
        "relaying through broadcaster {}",
        address::shorten(&broadcaster.railgun_address)
    );
    ctx.collaborators
        .relay
        .submit(&relayed)
        .await
        .map_err(|e| SubmitError::from_external(e, true))
}

/// Sends `proved` along the path `fee` names and starts confirmation
/// tracking. Errors are classified for the recovery menu.
pub async fn submit(
    ctx: &SessionContext,
    tx_type: TransactionType,
    proved: &ProvedTransaction,
    fee: &FeeStrategy,
    estimate: &GasEstimate,
) -> Result<SubmittedTransaction, SubmitError> {
    let (tx_hash, path) = match fee {
        FeeStrategy::SelfSigned { signer } => (
            send_self_signed(ctx, signer, proved, estimate).await?,
            SubmitPath::SelfSigned,
        ),
        FeeStrategy::Broadcasted { broadcaster, .. } => (
            send_via_broadcaster(ctx, tx_type, broadcaster, proved, estimate).await?,
            SubmitPath::Broadcaster,
        ),
    };

    let submitted = SubmittedTransaction {
        tx_hash,
        chain: ctx.chain,
        path,
    };
    info!(
        "{} {} submitted: {}",
        tx_type, submitted.path, submitted.tx_hash
    );
    ctx.watcher.watch(&submitted);
    Ok(submitted)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use macro_rules_attr::apply;

    use super::*;
    use crate::api::collaborators::ExternalError;
    use crate::models::chain::Chain;
    use crate::models::gas::FeeData;
    use crate::models::gas::GWEI;
    use crate::tests::shared::fixtures;
    use crate::tests::shared_tokio_runtime;

    fn proved_from_engine() -> ProvedTransaction {
        let mut proved = fixtures::proved_transaction();
        proved.raw_transaction.from = Some(fixtures::PUBLIC_ADDRESS.to_string());
        proved
    }

    #[apply(shared_tokio_runtime)]
    async fn self_signed_send_strips_from_and_starts_watching() {
        let session = fixtures::session(vec![]);

        let submitted = submit(
            &session.ctx,
            TransactionType::Transfer,
            &proved_from_engine(),
            &fixtures::self_signed(),
            &fixtures::estimate(),
        )
        .await
        .unwrap();

        let sent = session.chain.sent();
        assert_eq!(1, sent.len());
        assert!(sent[0].from.is_none());
        assert!(sent[0].nonce.is_some());
        assert_eq!(SubmitPath::SelfSigned, submitted.path);
        assert_eq!(vec![submitted], session.watcher.watched());
    }

    #[apply(shared_tokio_runtime)]
    async fn self_signed_send_checks_gas_balance_first() {
        let session = fixtures::session(vec![]);
        session.chain.set_native_balance(1);

        let result = submit(
            &session.ctx,
            TransactionType::Transfer,
            &proved_from_engine(),
            &fixtures::self_signed(),
            &fixtures::estimate(),
        )
        .await;

        assert!(matches!(
            result,
            Err(SubmitError::InsufficientGasBalance { .. })
        ));
        assert!(session.chain.sent().is_empty());
        assert!(session.watcher.watched().is_empty());
    }

    #[apply(shared_tokio_runtime)]
    async fn self_signed_bnb_send_is_priced_at_the_floor() {
        let session = fixtures::session_on(Chain::Bnb, vec![]);
        session.chain.set_fee_data(FeeData {
            gas_price: Some(GWEI),
            ..FeeData::default()
        });
        let mut proved = proved_from_engine();
        proved.raw_transaction.pricing = Some(GasPricing::Legacy { gas_price: GWEI });

        submit(
            &session.ctx,
            TransactionType::Transfer,
            &proved,
            &fixtures::self_signed(),
            &fixtures::estimate(),
        )
        .await
        .unwrap();

        let sent = session.chain.sent();
        assert_eq!(Some(3 * GWEI), sent[0].pricing.map(|p| p.price_per_gas()));
    }

    #[apply(shared_tokio_runtime)]
    async fn malformed_transactions_are_not_sent() {
        let session = fixtures::session(vec![]);
        let mut proved = proved_from_engine();
        proved.raw_transaction.to = "0zknot-a-contract".to_string();

        let result = submit(
            &session.ctx,
            TransactionType::Transfer,
            &proved,
            &fixtures::self_signed(),
            &fixtures::estimate(),
        )
        .await;

        assert!(matches!(result, Err(SubmitError::Malformed(_))));
        assert!(session.chain.sent().is_empty());
    }

    #[apply(shared_tokio_runtime)]
    async fn broadcaster_gas_shortage_is_classified() {
        let session = fixtures::session(vec![]);
        session.relay.fail_next_submit(ExternalError::new(
            "Broadcaster wallet does not have enough gas",
        ));

        let result = submit(
            &session.ctx,
            TransactionType::Transfer,
            &fixtures::proved_transaction(),
            &fixtures::broadcasted(),
            &fixtures::estimate(),
        )
        .await;

        assert!(matches!(result, Err(SubmitError::BroadcasterOutOfGas(_))));
        assert!(session.watcher.watched().is_empty());
    }

    #[apply(shared_tokio_runtime)]
    async fn broadcaster_receives_fee_id_and_batch_price() {
        let session = fixtures::session(vec![]);
        let mut estimate = fixtures::estimate();
        estimate.overall_batch_min_gas_price = Some(7 * GWEI);

        submit(
            &session.ctx,
            TransactionType::UnshieldBase,
            &fixtures::proved_transaction(),
            &fixtures::broadcasted(),
            &estimate,
        )
        .await
        .unwrap();

        let relayed = session.relay.submitted();
        assert_eq!(1, relayed.len());
        assert_eq!(Some(7 * GWEI), relayed[0].overall_batch_min_gas_price);
        assert!(relayed[0].use_relay_adapt);
        assert_eq!(fixtures::BROADCASTER_ADDRESS, relayed[0].broadcaster_address);
        assert_eq!(
            fixtures::broadcasted().broadcaster().unwrap().fees_id,
            relayed[0].fees_id
        );
    }
}
