//! the builder's stages and the pure transition function between them.
//!
//! each stage carries exactly the artifacts that are valid at that point, so
//! a proof without selections, or a proof that outlived an edit, cannot be
//! represented. transitions consume the old state and build a new one.

use serde::Serialize;

use super::error::InvalidTransition;
use crate::models::amount::consolidate;
use crate::models::amount::SelectedAmount;
use crate::models::encryption_key::EncryptionKey;
use crate::models::fee_strategy::FeeStrategy;
use crate::models::gas::GasEstimate;
use crate::models::proved_transaction::ProvedTransaction;
use crate::models::swap::SwapQuote;

/// What the user selected to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TxInputs {
    /// consolidated (token, amount, recipient) entries
    Amounts(Vec<SelectedAmount>),

    /// a quoted swap, plus the (token, amount, recipient) that funds it
    Swap {
        quote: SwapQuote,
        funding: SelectedAmount,
    },
}

impl TxInputs {
    /// builds amount inputs, summing duplicate (token, recipient) pairs
    pub fn amounts(selections: &[SelectedAmount]) -> Option<Self> {
        consolidate(selections).map(Self::Amounts)
    }

    /// entries passed to the engine and shown in the review
    pub fn recipients(&self) -> Vec<SelectedAmount> {
        match self {
            Self::Amounts(amounts) => amounts.clone(),
            Self::Swap { funding, .. } => vec![funding.clone()],
        }
    }

    pub fn swap_quote(&self) -> Option<&SwapQuote> {
        match self {
            Self::Amounts(_) => None,
            Self::Swap { quote, .. } => Some(quote),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    pub inputs: TxInputs,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmed {
    pub inputs: TxInputs,
    pub memo: Option<String>,
    pub key: EncryptionKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeResolved {
    pub inputs: TxInputs,
    pub memo: Option<String>,
    pub key: EncryptionKey,
    pub fee: FeeStrategy,

    /// absent when estimation failed; proof generation stays disabled
    pub estimate: Option<GasEstimate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proved {
    pub inputs: TxInputs,
    pub memo: Option<String>,
    pub key: EncryptionKey,
    pub fee: FeeStrategy,
    pub estimate: GasEstimate,
    pub proved: ProvedTransaction,
}

/// The builder's current stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, strum::IntoStaticStr)]
pub enum BuilderState {
    #[default]
    Empty,
    Selected(Selected),
    Confirmed(Confirmed),
    FeeResolved(FeeResolved),
    Proved(Proved),
}

/// The result of a completed step, applied to a state.
#[derive(Debug, Clone, strum::IntoStaticStr)]
pub enum Transition {
    /// new amounts or recipients; everything downstream is dropped
    SelectionEdited(TxInputs),

    /// the selection could not proceed (eg an approval was declined)
    SelectionDiscarded,

    /// amounts confirmed; a fee strategy is still needed
    AmountsConfirmed(EncryptionKey),

    /// amounts confirmed with a fee strategy implied by the transaction
    /// type, eg the shielding wallet paying its own gas
    ConfirmedWithFee {
        key: EncryptionKey,
        fee: FeeStrategy,
        estimate: Option<GasEstimate>,
    },

    /// amounts confirmed and a ready-to-send public transaction populated
    ConfirmedPopulated {
        key: EncryptionKey,
        fee: FeeStrategy,
        estimate: GasEstimate,
        proved: ProvedTransaction,
    },

    /// a new fee strategy with its fresh estimate; any proof is dropped
    FeeSelected {
        fee: FeeStrategy,
        estimate: Option<GasEstimate>,
    },

    ProofGenerated(ProvedTransaction),

    /// a new memo; any proof is dropped, the fee strategy is kept with the
    /// re-estimate made for the new memo
    MemoEdited {
        memo: Option<String>,
        estimate: Option<GasEstimate>,
    },

    /// the existing proof is resubmitted through another fee path
    SubmitPathChanged(FeeStrategy),
}

impl BuilderState {
    pub fn stage(&self) -> &'static str {
        self.into()
    }

    pub fn inputs(&self) -> Option<&TxInputs> {
        match self {
            Self::Empty => None,
            Self::Selected(s) => Some(&s.inputs),
            Self::Confirmed(s) => Some(&s.inputs),
            Self::FeeResolved(s) => Some(&s.inputs),
            Self::Proved(s) => Some(&s.inputs),
        }
    }

    pub fn memo(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Selected(s) => s.memo.as_deref(),
            Self::Confirmed(s) => s.memo.as_deref(),
            Self::FeeResolved(s) => s.memo.as_deref(),
            Self::Proved(s) => s.memo.as_deref(),
        }
    }

    pub fn key(&self) -> Option<&EncryptionKey> {
        match self {
            Self::Empty | Self::Selected(_) => None,
            Self::Confirmed(s) => Some(&s.key),
            Self::FeeResolved(s) => Some(&s.key),
            Self::Proved(s) => Some(&s.key),
        }
    }

    pub fn fee(&self) -> Option<&FeeStrategy> {
        match self {
            Self::FeeResolved(s) => Some(&s.fee),
            Self::Proved(s) => Some(&s.fee),
            _ => None,
        }
    }

    pub fn estimate(&self) -> Option<&GasEstimate> {
        match self {
            Self::FeeResolved(s) => s.estimate.as_ref(),
            Self::Proved(s) => Some(&s.estimate),
            _ => None,
        }
    }

    pub fn proved(&self) -> Option<&ProvedTransaction> {
        match self {
            Self::Proved(s) => Some(&s.proved),
            _ => None,
        }
    }

    fn invalid(&self, transition: &Transition) -> InvalidTransition {
        InvalidTransition {
            transition: transition.into(),
            stage: self.stage(),
        }
    }

    /// Applies `transition`, producing the next state.
    pub fn apply(self, transition: Transition) -> Result<BuilderState, InvalidTransition> {
        let invalid = self.invalid(&transition);
        match (self, transition) {
            (state, Transition::SelectionEdited(inputs)) => Ok(Self::Selected(Selected {
                inputs,
                memo: state.memo().map(str::to_string),
            })),

            (_, Transition::SelectionDiscarded) => Ok(Self::Empty),

            (Self::Selected(s), Transition::AmountsConfirmed(key)) => {
                Ok(Self::Confirmed(Confirmed {
                    inputs: s.inputs,
                    memo: s.memo,
                    key,
                }))
            }

            (Self::Selected(s), Transition::ConfirmedWithFee { key, fee, estimate }) => {
                Ok(Self::FeeResolved(FeeResolved {
                    inputs: s.inputs,
                    memo: s.memo,
                    key,
                    fee,
                    estimate,
                }))
            }

            (
                Self::Selected(s),
                Transition::ConfirmedPopulated {
                    key,
                    fee,
                    estimate,
                    proved,
                },
            ) => Ok(Self::Proved(Proved {
                inputs: s.inputs,
                memo: s.memo,
                key,
                fee,
                estimate,
                proved,
            })),

            (Self::Confirmed(s), Transition::FeeSelected { fee, estimate }) => {
                Ok(Self::FeeResolved(FeeResolved {
                    inputs: s.inputs,
                    memo: s.memo,
                    key: s.key,
                    fee,
                    estimate,
                }))
            }
            (Self::FeeResolved(s), Transition::FeeSelected { fee, estimate }) => {
                Ok(Self::FeeResolved(FeeResolved {
                    fee,
                    estimate,
                    ..s
                }))
            }
            (Self::Proved(s), Transition::FeeSelected { fee, estimate }) => {
                Ok(Self::FeeResolved(FeeResolved {
                    inputs: s.inputs,
                    memo: s.memo,
                    key: s.key,
                    fee,
                    estimate,
                }))
            }

            (Self::FeeResolved(s), Transition::ProofGenerated(proved)) => match s.estimate {
                Some(estimate) => Ok(Self::Proved(Proved {
                    inputs: s.inputs,
                    memo: s.memo,
                    key: s.key,
                    fee: s.fee,
                    estimate,
                    proved,
                })),
                None => Err(invalid),
            },

            (Self::Confirmed(s), Transition::MemoEdited { memo, .. }) => {
                Ok(Self::Confirmed(Confirmed { memo, ..s }))
            }
            (Self::FeeResolved(s), Transition::MemoEdited { memo, estimate }) => {
                Ok(Self::FeeResolved(FeeResolved {
                    memo,
                    estimate,
                    ..s
                }))
            }
            (Self::Proved(s), Transition::MemoEdited { memo, estimate }) => {
                Ok(Self::FeeResolved(FeeResolved {
                    inputs: s.inputs,
                    memo,
                    key: s.key,
                    fee: s.fee,
                    estimate,
                }))
            }

            (Self::Proved(s), Transition::SubmitPathChanged(fee)) => {
                Ok(Self::Proved(Proved { fee, ..s }))
            }

            _ => Err(invalid),
        }
    }
}

/// A menu action offered in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BuilderAction {
    #[strum(to_string = "Edit Selection")]
    EditSelection,
    #[strum(to_string = "Confirm Amounts")]
    ConfirmAmounts,
    #[strum(to_string = "Select Fee Option")]
    SelectFee,
    #[strum(to_string = "Edit Memo")]
    EditMemo,
    #[strum(to_string = "Generate Proof")]
    GenerateProof,
    #[strum(to_string = "Send Transaction")]
    SendTransaction,
    #[strum(to_string = "Cancel")]
    Cancel,
}

/// How a transaction type shapes the builder menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuCapabilities {
    pub fee_selectable: bool,
    pub memo: bool,
}

impl BuilderState {
    /// Actions for the menu, each flagged enabled or not.
    pub fn actions(&self, caps: MenuCapabilities) -> Vec<(BuilderAction, bool)> {
        use BuilderAction as A;

        let mut actions = vec![(A::EditSelection, true)];
        match self {
            Self::Empty => {}
            Self::Selected(_) => actions.push((A::ConfirmAmounts, true)),
            Self::Confirmed(_) => {
                actions.push((A::SelectFee, caps.fee_selectable));
                actions.push((A::GenerateProof, false));
            }
            Self::FeeResolved(s) => {
                if caps.fee_selectable {
                    actions.push((A::SelectFee, true));
                }
                actions.push((A::GenerateProof, s.estimate.is_some()));
            }
            Self::Proved(_) => {
                if caps.fee_selectable {
                    actions.push((A::SelectFee, true));
                }
                actions.push((A::SendTransaction, true));
            }
        }
        if caps.memo && !matches!(self, Self::Empty | Self::Selected(_)) {
            actions.push((A::EditMemo, true));
        }
        actions.push((A::Cancel, true));
        actions
    }
}
