//! per transaction type behavior plugged into the builder machine.
//!
//! the machine owns the stages and the menu; a [`TransactionKind`] decides
//! what the user may select and what confirming a selection produces.

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::approval::ensure_approvals;
use super::error::SelectionError;
use super::error::TxBuilderError;
use super::gas_estimator::estimate;
use super::gas_estimator::GasUnits;
use super::request::RequestParts;
use super::selector::native_balance;
use super::selector::public_balances;
use super::selector::select_amounts;
use super::selector::select_swap;
use super::selector::shielded_balances;
use super::selector::AmountRequest;
use super::selector::RecipientKind;
use super::state::MenuCapabilities;
use super::state::Transition;
use super::state::TxInputs;
use crate::api::collaborators::ApprovalSpender;
use crate::application::session::SessionContext;
use crate::models::address;
use crate::models::chain::NATIVE_TOKEN_ADDRESS;
use crate::models::encryption_key::EncryptionKey;
use crate::models::fee_strategy::FeeStrategy;
use crate::models::proved_transaction::ProofMetadata;
use crate::models::proved_transaction::ProvedTransaction;
use crate::models::proved_transaction::RawTransaction;
use crate::models::transaction_type::TransactionType;

/// The variable part of a builder session.
#[async_trait]
pub trait TransactionKind: Send + Sync + std::fmt::Debug {
    fn transaction_type(&self) -> TransactionType;

    fn capabilities(&self) -> MenuCapabilities {
        let tx_type = self.transaction_type();
        MenuCapabilities {
            fee_selectable: tx_type.spends_shielded_balance(),
            memo: tx_type.supports_memo(),
        }
    }

    /// Runs the selector. `Ok(None)` when the user backs out.
    async fn select_inputs(
        &self,
        ctx: &SessionContext,
        prior: Option<&TxInputs>,
    ) -> Result<Option<TxInputs>, SelectionError>;

    /// The transition confirming `inputs` with the unlocked `key`.
    async fn confirm(
        &self,
        ctx: &SessionContext,
        inputs: &TxInputs,
        key: EncryptionKey,
    ) -> Result<Transition, TxBuilderError>;
}

/// Behavior for `tx_type`.
pub fn kind_for(tx_type: TransactionType) -> Box<dyn TransactionKind> {
    match tx_type {
        TransactionType::Transfer | TransactionType::Unshield | TransactionType::UnshieldBase => {
            Box::new(PrivateSpendKind { tx_type })
        }
        TransactionType::Shield => Box::new(ShieldKind { base: false }),
        TransactionType::ShieldBase => Box::new(ShieldKind { base: true }),
        TransactionType::PublicTransfer => Box::new(PublicSendKind { base: false }),
        TransactionType::PublicBaseTransfer => Box::new(PublicSendKind { base: true }),
        TransactionType::PrivateSwap => Box::new(SwapKind { public: false }),
        TransactionType::PublicSwap => Box::new(SwapKind { public: true }),
    }
}

/// wraps a populated public transaction so it flows through the proved stage
fn populated(raw_transaction: RawTransaction) -> ProvedTransaction {
    ProvedTransaction {
        raw_transaction,
        nullifiers: vec![],
        metadata: ProofMetadata {
            proof_type: None,
            broadcaster_fee: None,
            memo: None,
            created_at: Utc::now(),
        },
    }
}

/// estimates a populated public call, pins its pricing, and moves straight
/// to the proved stage
async fn confirm_populated(
    ctx: &SessionContext,
    key: EncryptionKey,
    mut transaction: RawTransaction,
) -> Result<Transition, TxBuilderError> {
    let fee = FeeStrategy::SelfSigned {
        signer: ctx.wallet.signer(),
    };
    let units = GasUnits::Public {
        from: &ctx.wallet.public_address,
        transaction: &transaction,
    };
    let estimate = estimate(ctx, units, &fee).await?;
    transaction.pricing = Some(estimate.gas_details.pricing);
    debug!(
        "populated public call to {} costing {} {}",
        transaction.to,
        estimate.estimated_cost_decimal(),
        estimate.symbol
    );
    Ok(Transition::ConfirmedPopulated {
        key,
        fee,
        estimate,
        proved: populated(transaction),
    })
}

/// Private transfers and unshields: spends the shielded balance, proved
/// later under a fee strategy the user picks.
#[derive(Debug, Clone, Copy)]
pub struct PrivateSpendKind {
    tx_type: TransactionType,
}

#[async_trait]
impl TransactionKind for PrivateSpendKind {
    fn transaction_type(&self) -> TransactionType {
        self.tx_type
    }

    async fn select_inputs(
        &self,
        ctx: &SessionContext,
        prior: Option<&TxInputs>,
    ) -> Result<Option<TxInputs>, SelectionError> {
        let base = self.tx_type == TransactionType::UnshieldBase;
        let (recipient, default_recipient) = match self.tx_type {
            TransactionType::Transfer => (RecipientKind::Shielded, None),
            _ => (
                RecipientKind::Public,
                Some(ctx.wallet.public_address.clone()),
            ),
        };
        let request = AmountRequest {
            balances: shielded_balances(ctx, base).await?,
            recipient,
            default_recipient,
            single_entry: base,
        };
        select_amounts(ctx, &request, prior).await
    }

    async fn confirm(
        &self,
        _ctx: &SessionContext,
        _inputs: &TxInputs,
        key: EncryptionKey,
    ) -> Result<Transition, TxBuilderError> {
        Ok(Transition::AmountsConfirmed(key))
    }
}

/// Shields from the public wallet, which always signs and pays gas.
#[derive(Debug, Clone, Copy)]
pub struct ShieldKind {
    base: bool,
}

#[async_trait]
impl TransactionKind for ShieldKind {
    fn transaction_type(&self) -> TransactionType {
        if self.base {
            TransactionType::ShieldBase
        } else {
            TransactionType::Shield
        }
    }

    async fn select_inputs(
        &self,
        ctx: &SessionContext,
        prior: Option<&TxInputs>,
    ) -> Result<Option<TxInputs>, SelectionError> {
        let balances = if self.base {
            vec![native_balance(ctx).await?]
        } else {
            public_balances(ctx, false).await?
        };
        let request = AmountRequest {
            balances,
            recipient: RecipientKind::Shielded,
            default_recipient: Some(ctx.wallet.shielded_address.clone()),
            single_entry: self.base,
        };
        select_amounts(ctx, &request, prior).await
    }

    async fn confirm(
        &self,
        ctx: &SessionContext,
        inputs: &TxInputs,
        key: EncryptionKey,
    ) -> Result<Transition, TxBuilderError> {
        if !self.base {
            ensure_approvals(ctx, &ApprovalSpender::ShieldedPool, &inputs.recipients()).await?;
        }

        let fee = FeeStrategy::SelfSigned {
            signer: ctx.wallet.signer(),
        };
        let estimate = match self.transaction_type().proof_type() {
            Some(proof_type) => {
                let parts = RequestParts {
                    proof_type,
                    inputs,
                    key: &key,
                    fee: &fee,
                    memo: None,
                };
                // a failed estimate keeps the selection so confirming can be retried
                Some(estimate(ctx, GasUnits::Private(parts), &fee).await?)
            }
            None => None,
        };
        Ok(Transition::ConfirmedWithFee { key, fee, estimate })
    }
}

/// Public transfers, populated rather than proved.
#[derive(Debug, Clone, Copy)]
pub struct PublicSendKind {
    base: bool,
}

#[async_trait]
impl TransactionKind for PublicSendKind {
    fn transaction_type(&self) -> TransactionType {
        if self.base {
            TransactionType::PublicBaseTransfer
        } else {
            TransactionType::PublicTransfer
        }
    }

    async fn select_inputs(
        &self,
        ctx: &SessionContext,
        prior: Option<&TxInputs>,
    ) -> Result<Option<TxInputs>, SelectionError> {
        let balances = if self.base {
            vec![native_balance(ctx).await?]
        } else {
            public_balances(ctx, false).await?
        };
        let request = AmountRequest {
            balances,
            recipient: RecipientKind::Public,
            default_recipient: None,
            single_entry: true,
        };
        select_amounts(ctx, &request, prior).await
    }

    async fn confirm(
        &self,
        ctx: &SessionContext,
        inputs: &TxInputs,
        key: EncryptionKey,
    ) -> Result<Transition, TxBuilderError> {
        let recipients = inputs.recipients();
        let selection = recipients.first().ok_or(SelectionError::Empty)?;
        let transaction = ctx
            .collaborators
            .provider
            .populate_transfer(ctx.chain, &ctx.wallet.public_address, selection, self.base)
            .await
            .map_err(TxBuilderError::Populate)?;
        confirm_populated(ctx, key, transaction).await
    }
}

/// Swaps through a DEX aggregator, from the shielded balance or the public
/// wallet.
#[derive(Debug, Clone, Copy)]
pub struct SwapKind {
    public: bool,
}

#[async_trait]
impl TransactionKind for SwapKind {
    fn transaction_type(&self) -> TransactionType {
        if self.public {
            TransactionType::PublicSwap
        } else {
            TransactionType::PrivateSwap
        }
    }

    async fn select_inputs(
        &self,
        ctx: &SessionContext,
        _prior: Option<&TxInputs>,
    ) -> Result<Option<TxInputs>, SelectionError> {
        select_swap(ctx, !self.public).await
    }

    async fn confirm(
        &self,
        ctx: &SessionContext,
        inputs: &TxInputs,
        key: EncryptionKey,
    ) -> Result<Transition, TxBuilderError> {
        if !self.public {
            return Ok(Transition::AmountsConfirmed(key));
        }

        let quote = inputs.swap_quote().ok_or(SelectionError::Empty)?;
        let native = address::normalize(NATIVE_TOKEN_ADDRESS);
        if address::normalize(&quote.sell_token.address) != native {
            let spender = ApprovalSpender::Contract(quote.spender.clone());
            ensure_approvals(ctx, &spender, &inputs.recipients()).await?;
        }
        confirm_populated(ctx, key, quote.call.clone()).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use macro_rules_attr::apply;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::models::amount::SelectedAmount;
    use crate::tests::shared::fixtures;
    use crate::tests::shared::prompter::Step;
    use crate::tests::shared_tokio_runtime;

    #[test]
    fn every_type_maps_to_its_own_kind() {
        for tx_type in TransactionType::iter() {
            assert_eq!(tx_type, kind_for(tx_type).transaction_type());
        }
    }

    #[test]
    fn only_shielded_spends_choose_a_fee() {
        let selectable = TransactionType::iter()
            .filter(|t| kind_for(*t).capabilities().fee_selectable)
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                TransactionType::Transfer,
                TransactionType::Unshield,
                TransactionType::UnshieldBase,
                TransactionType::PrivateSwap
            ],
            selectable
        );
    }

    #[apply(shared_tokio_runtime)]
    async fn shield_confirmation_approves_and_self_signs() {
        let session = fixtures::session(vec![Step::confirm(true)]);
        session.chain.set_auto_mine(true);
        let inputs = TxInputs::Amounts(vec![SelectedAmount::new(
            &fixtures::token(),
            1_000_000,
            fixtures::SHIELDED_ADDRESS,
        )]);

        let transition = kind_for(TransactionType::Shield)
            .confirm(&session.ctx, &inputs, fixtures::key())
            .await
            .unwrap();

        let Transition::ConfirmedWithFee { fee, estimate, .. } = transition else {
            panic!("expected a fee-resolved confirmation, got {:?}", transition);
        };
        assert_eq!(
            fixtures::PUBLIC_ADDRESS,
            fee.signer().unwrap().public_address
        );
        assert!(estimate.is_some());
        assert_eq!(1, session.chain.sent().len());
    }

    #[apply(shared_tokio_runtime)]
    async fn public_transfer_is_populated_not_proved() {
        let session = fixtures::session(vec![]);
        let inputs = TxInputs::Amounts(vec![SelectedAmount::new(
            &fixtures::token(),
            1_000_000,
            fixtures::RECIPIENT_PUBLIC,
        )]);

        let transition = kind_for(TransactionType::PublicTransfer)
            .confirm(&session.ctx, &inputs, fixtures::key())
            .await
            .unwrap();

        let Transition::ConfirmedPopulated { proved, .. } = transition else {
            panic!("expected a populated confirmation, got {:?}", transition);
        };
        assert!(proved.metadata.proof_type.is_none());
        assert!(proved.nullifiers.is_empty());
        assert!(proved.raw_transaction.pricing.is_some());
        assert_eq!(0, session.engine.proof_count());
    }
}
