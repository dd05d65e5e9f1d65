//! the interactive builder loop.
//!
//! every menu action turns into one [`Transition`] applied to the current
//! [`BuilderState`]. a failed step reports its error and leaves the state
//! as it was, so the user can pick another action.

use tracing::info;
use tracing::warn;

use super::error::SubmitError;
use super::error::TxBuilderError;
use super::fee_resolver;
use super::gas_estimator::estimate_or_report;
use super::gas_estimator::GasUnits;
use super::proof_generator;
use super::request::RequestParts;
use super::review;
use super::selector::prompt_memo;
use super::state::BuilderAction;
use super::state::BuilderState;
use super::state::Transition;
use super::state::TxInputs;
use super::strategy::kind_for;
use super::strategy::TransactionKind;
use super::submitter;
use crate::api::collaborators::prompt::Menu;
use crate::api::collaborators::prompt::Notice;
use crate::application::session::SessionContext;
use crate::models::encryption_key::EncryptionKey;
use crate::models::fee_strategy::FeeStrategy;
use crate::models::gas::GasEstimate;
use crate::models::proved_transaction::SubmittedTransaction;
use crate::models::transaction_type::TransactionType;

/// What to do after a broadcaster reported it cannot pay gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
enum OutOfGasRecovery {
    #[strum(to_string = "Self Sign")]
    SelfSign,
    #[strum(to_string = "Different Broadcaster")]
    DifferentBroadcaster,
    #[strum(to_string = "Retry")]
    Retry,
    #[strum(to_string = "Cancel")]
    Cancel,
}

/// One transaction being built.
#[derive(Debug)]
pub struct TxBuilder<'a> {
    ctx: &'a SessionContext,
    kind: Box<dyn TransactionKind>,
    state: BuilderState,
}

impl<'a> TxBuilder<'a> {
    pub fn new(ctx: &'a SessionContext, tx_type: TransactionType) -> Self {
        Self {
            ctx,
            kind: kind_for(tx_type),
            state: BuilderState::Empty,
        }
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    fn tx_type(&self) -> TransactionType {
        self.kind.transaction_type()
    }

    fn report(&self, error: &TxBuilderError) {
        warn!("{} step failed: {}", self.tx_type(), error);
        self.ctx
            .prompter()
            .notify(Notice::Error, &format!("{}. {}", error, error.guidance()));
    }

    /// Applies `transition`. An invalid one is reported and the state kept.
    fn apply(&mut self, transition: Transition) {
        let previous = self.state.clone();
        match std::mem::take(&mut self.state).apply(transition) {
            Ok(next) => self.state = next,
            Err(e) => {
                self.state = previous;
                self.report(&e.into());
            }
        }
    }

    /// The wallet key, from the session cache or a password prompt.
    async fn unlock(&self) -> Option<EncryptionKey> {
        if let Some(key) = self.ctx.password.get() {
            return Some(key);
        }
        let secret = self.ctx.prompter().password("Wallet password").await?;
        let key = EncryptionKey::new(secret);
        self.ctx.password.store(key.clone());
        Some(key)
    }

    /// A private gas estimate for the current selection under `fee`, or
    /// `None` for types that are never proved.
    async fn estimate_private(
        &self,
        inputs: &TxInputs,
        key: &EncryptionKey,
        fee: &FeeStrategy,
        memo: Option<&str>,
    ) -> Option<GasEstimate> {
        let proof_type = self.tx_type().proof_type()?;
        let parts = RequestParts {
            proof_type,
            inputs,
            key,
            fee,
            memo,
        };
        estimate_or_report(self.ctx, GasUnits::Private(parts), fee).await
    }

    async fn edit_selection(&mut self) {
        match self.kind.select_inputs(self.ctx, self.state.inputs()).await {
            Ok(Some(inputs)) => {
                self.ctx.password.clear();
                self.apply(Transition::SelectionEdited(inputs));
            }
            Ok(None) => {}
            Err(e) => self.report(&e.into()),
        }
    }

    async fn confirm_amounts(&mut self) {
        let Some(inputs) = self.state.inputs().cloned() else {
            return;
        };
        let Some(key) = self.unlock().await else {
            return;
        };
        match self.kind.confirm(self.ctx, &inputs, key).await {
            Ok(transition) => self.apply(transition),
            Err(e @ TxBuilderError::Approval(_)) => {
                self.report(&e);
                self.apply(Transition::SelectionDiscarded);
            }
            Err(e) => self.report(&e),
        }
    }

    async fn select_fee(&mut self) {
        let (Some(inputs), Some(key)) = (self.state.inputs(), self.state.key()) else {
            return;
        };
        let Some(fee) =
            fee_resolver::resolve_fee(self.ctx, self.tx_type(), inputs, self.state.fee()).await
        else {
            return;
        };
        let estimate = self
            .estimate_private(inputs, key, &fee, self.state.memo())
            .await;
        self.apply(Transition::FeeSelected { fee, estimate });
    }

    async fn edit_memo(&mut self) {
        let Some(text) = prompt_memo(self.ctx.prompter(), self.state.memo()).await else {
            return;
        };
        let memo = (!text.is_empty()).then_some(text);
        let estimate = match (self.state.inputs(), self.state.key(), self.state.fee()) {
            (Some(inputs), Some(key), Some(fee)) => {
                self.estimate_private(inputs, key, fee, memo.as_deref())
                    .await
            }
            _ => None,
        };
        self.apply(Transition::MemoEdited { memo, estimate });
    }

    async fn generate_proof(&mut self) {
        let BuilderState::FeeResolved(stage) = &self.state else {
            return;
        };
        match proof_generator::generate(self.ctx, self.tx_type(), stage).await {
            Ok(proved) => {
                self.ctx
                    .prompter()
                    .notify(Notice::Success, "Proof generated");
                self.apply(Transition::ProofGenerated(proved));
            }
            Err(e) => self.report(&e.into()),
        }
    }

    /// Offers the recovery choices for a broadcaster that is out of gas.
    /// Returns whether to send again.
    async fn recover_out_of_gas(&mut self, current: &FeeStrategy) -> bool {
        let menu = [
            OutOfGasRecovery::SelfSign,
            OutOfGasRecovery::DifferentBroadcaster,
            OutOfGasRecovery::Retry,
            OutOfGasRecovery::Cancel,
        ]
        .into_iter()
        .fold(
            Menu::new("The broadcaster cannot pay gas. How should the proof be sent?"),
            |menu, choice| menu.choice(choice, choice.to_string()),
        );

        loop {
            match menu.run(self.ctx.prompter()).await {
                None | Some(OutOfGasRecovery::Cancel) => return false,
                Some(OutOfGasRecovery::Retry) => return true,
                Some(OutOfGasRecovery::SelfSign) => {
                    if let Some(fee) = fee_resolver::choose_self_signer(self.ctx).await {
                        self.apply(Transition::SubmitPathChanged(fee));
                        return true;
                    }
                }
                Some(OutOfGasRecovery::DifferentBroadcaster) => {
                    if let Some(fee) =
                        fee_resolver::choose_other_broadcaster(self.ctx, self.tx_type(), current)
                            .await
                    {
                        self.apply(Transition::SubmitPathChanged(fee));
                        return true;
                    }
                }
            }
        }
    }

    /// Sends the proved transaction, walking the user through recovery on
    /// failure. `None` leaves the builder at the proved stage.
    async fn send(&mut self) -> Option<SubmittedTransaction> {
        let mut retried_unknown = false;
        loop {
            let BuilderState::Proved(stage) = &self.state else {
                return None;
            };
            let stage = stage.clone();
            let error = match submitter::submit(
                self.ctx,
                self.tx_type(),
                &stage.proved,
                &stage.fee,
                &stage.estimate,
            )
            .await
            {
                Ok(submitted) => {
                    let url = submitted.chain.transaction_url(&submitted.tx_hash);
                    self.ctx
                        .prompter()
                        .notify(Notice::Success, &format!("Transaction submitted: {}", url));
                    self.ctx.status.set(
                        Notice::Info,
                        format!("Waiting for confirmation: {}", url),
                        None,
                    );
                    return Some(submitted);
                }
                Err(e) => e,
            };

            self.report(&error.clone().into());
            match error {
                SubmitError::BroadcasterOutOfGas(_) => {
                    if !self.recover_out_of_gas(&stage.fee).await {
                        return None;
                    }
                }
                SubmitError::Unknown(_) if !retried_unknown => {
                    if !self.ctx.prompter().confirm("Retry sending?").await {
                        return None;
                    }
                    retried_unknown = true;
                }
                _ => return None,
            }
        }
    }

    /// Runs the builder until the transaction is sent or the user leaves.
    pub async fn run(mut self) -> Option<SubmittedTransaction> {
        info!("building {} on {}", self.tx_type(), self.ctx.chain);
        self.edit_selection().await;

        loop {
            let header = review::render(self.ctx, self.tx_type(), &self.state);
            let menu = self
                .state
                .actions(self.kind.capabilities())
                .into_iter()
                .fold(
                    Menu::new("What next?").header(header),
                    |menu, (action, enabled)| {
                        menu.entry(action, action.to_string(), None, enabled)
                    },
                );

            let Some(action) = menu.run(self.ctx.prompter()).await else {
                info!("{} builder closed", self.tx_type());
                return None;
            };
            match action {
                BuilderAction::EditSelection => self.edit_selection().await,
                BuilderAction::ConfirmAmounts => self.confirm_amounts().await,
                BuilderAction::SelectFee => self.select_fee().await,
                BuilderAction::EditMemo => self.edit_memo().await,
                BuilderAction::GenerateProof => self.generate_proof().await,
                BuilderAction::SendTransaction => {
                    if let Some(submitted) = self.send().await {
                        return Some(submitted);
                    }
                }
                BuilderAction::Cancel => {
                    info!("{} builder cancelled", self.tx_type());
                    return None;
                }
            }
        }
    }
}

/// Builds and sends one transaction of `tx_type`.
pub async fn run_builder(
    ctx: &SessionContext,
    tx_type: TransactionType,
) -> Option<SubmittedTransaction> {
    TxBuilder::new(ctx, tx_type).run().await
}
