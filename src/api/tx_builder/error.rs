//! provides error types related to building and sending transactions.
//!
//! every error names the next thing the user should do via `guidance()`.

use crate::api::collaborators::ExternalError;
use crate::models::amount::AmountParseError;

/// phrase the engine uses for a shielded balance shortfall
const SHIELDED_BALANCE_TOO_LOW: &str = "private balance too low";

/// a shielded balance shortfall when relayed, a signer gas shortfall when
/// self signed
const INSUFFICIENT_FUNDS: &str = "insufficient funds";

/// phrases broadcasters use when their relaying wallet is out of gas
const BROADCASTER_OUT_OF_GAS: [&str; 2] = ["out of gas", "does not have enough"];

/// transient engine failure that resolves on retry
pub(crate) const CANNOT_CACHE_FROM_ADDRESS: &str = "cannot cache a transaction with a from address";

const RPC_REJECTED: [&str; 2] = ["failed to send tx", "could not coalesce"];
const RPC_INTERNAL_ERROR_CODE: i64 = -32603;
const REVERTED: [&str; 2] = ["execution reverted", "revert"];
const CONNECTIVITY: [&str; 5] = ["network", "econnrefused", "timeout", "timed out", "connection"];

fn mentions_any(error: &ExternalError, needles: &[&str]) -> bool {
    needles.iter().any(|n| error.mentions(n))
}

/// errors collecting amounts and recipients
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("no amounts selected")]
    Empty,

    #[error("amount for {symbol} must be greater than zero")]
    ZeroAmount { symbol: String },

    #[error("selected amounts overflow")]
    Overflow,

    #[error("no spendable {0} balance")]
    NoBalance(String),

    #[error(transparent)]
    InvalidAmount(#[from] AmountParseError),

    #[error("could not load balances: {0}")]
    Balances(ExternalError),

    #[error("could not get a swap quote: {0}")]
    Quote(ExternalError),
}

impl SelectionError {
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Empty | Self::ZeroAmount { .. } | Self::InvalidAmount(_) => {
                "Edit the selection and enter a positive amount."
            }
            Self::Overflow => "Reduce the amounts selected.",
            Self::NoBalance(_) => "Refresh balances or pick another token.",
            Self::Balances(_) => "Refresh balances from the main menu and try again.",
            Self::Quote(_) => "Try again, or change the amount or tokens.",
        }
    }
}

/// errors producing a gas estimate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum GasEstimateError {
    #[error("could not fetch fee data: {0}")]
    FeeData(ExternalError),

    #[error("{chain} fee data has no {gas_type} pricing")]
    MissingPricing { chain: String, gas_type: String },

    #[error("gas estimate failed: {0}")]
    Estimate(ExternalError),

    #[error("could not decrypt wallet: {0}")]
    Decryption(ExternalError),

    #[error("insufficient shielded balance: {0}")]
    InsufficientShieldedBalance(ExternalError),

    #[error("gas cost overflows")]
    Overflow,
}

impl GasEstimateError {
    /// classifies an engine or provider estimation failure
    pub fn from_external(error: ExternalError) -> Self {
        if error.mentions(SHIELDED_BALANCE_TOO_LOW) {
            Self::InsufficientShieldedBalance(error)
        } else if error.mentions("decrypt") || error.mentions("bad password") {
            Self::Decryption(error)
        } else {
            Self::Estimate(error)
        }
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            Self::FeeData(_) | Self::MissingPricing { .. } => {
                "Check the RPC connection and try again."
            }
            Self::Estimate(_) => "Try again, or change the fee option.",
            Self::Decryption(_) => {
                "Re-enter the wallet password; if a balance scan is running, wait for it to finish."
            }
            Self::InsufficientShieldedBalance(_) => {
                "Reduce the amount, or self sign to avoid the broadcaster fee."
            }
            Self::Overflow => "Reduce the amounts selected.",
        }
    }
}

/// errors generating a proof
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ProofError {
    #[error("invalid selection: {0}")]
    Validation(#[from] SelectionError),

    #[error("a proof needs a gas estimate; select a fee option first")]
    MissingGasEstimate,

    #[error("{breakdown}")]
    InsufficientShieldedBalance { breakdown: String },

    #[error("proof generation kept failing after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        source: ExternalError,
    },

    #[error("proof generation failed: {0}")]
    Engine(ExternalError),

    #[error("{0} transactions are populated for sending, not proved")]
    NotProvable(String),
}

impl ProofError {
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.guidance(),
            Self::MissingGasEstimate => "Select a fee option to estimate gas.",
            Self::InsufficientShieldedBalance { .. } => {
                "Reduce the amount, or self sign to avoid the broadcaster fee."
            }
            Self::RetriesExhausted { .. } => {
                "Switch the fee option (self sign or another broadcaster) and generate the proof again."
            }
            Self::Engine(_) => "Generate the proof again.",
            Self::NotProvable(_) => "Send the transaction directly.",
        }
    }

    pub(crate) fn is_transient(error: &ExternalError) -> bool {
        error.mentions(CANNOT_CACHE_FROM_ADDRESS)
    }

    pub(crate) fn is_shielded_shortfall(error: &ExternalError) -> bool {
        error.mentions(SHIELDED_BALANCE_TOO_LOW)
    }
}

/// errors approving token allowances
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ApprovalError {
    #[error("approval for {0} was declined")]
    Declined(String),

    #[error("approval for {symbol} failed: {source}")]
    Failed {
        symbol: String,
        source: ExternalError,
    },

    #[error("could not check allowances: {0}")]
    Lookup(ExternalError),
}

/// errors delivering a proved transaction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SubmitError {
    #[error("broadcaster is out of gas: {0}")]
    BroadcasterOutOfGas(ExternalError),

    #[error("insufficient shielded balance: {0}")]
    InsufficientShieldedBalance(ExternalError),

    #[error(
        "wallet {wallet} holds {available} {symbol} but the transaction needs up to {required} {symbol}"
    )]
    InsufficientGasBalance {
        wallet: String,
        symbol: String,
        available: String,
        required: String,
    },

    #[error("signing wallet cannot pay gas: {0}")]
    SignerOutOfGas(ExternalError),

    #[error("transaction rejected by RPC: {0}")]
    RpcRejected(ExternalError),

    #[error("transaction would revert: {0}")]
    WouldRevert(ExternalError),

    #[error("network error: {0}")]
    Network(ExternalError),

    #[error("transaction is malformed: {0}")]
    Malformed(String),

    #[error("send failed: {0}")]
    Unknown(ExternalError),
}

impl SubmitError {
    /// classifies a send failure
    ///
    /// `via_broadcaster` enables the broadcaster-specific gas classification.
    pub fn from_external(error: ExternalError, via_broadcaster: bool) -> Self {
        if via_broadcaster && mentions_any(&error, &BROADCASTER_OUT_OF_GAS) {
            Self::BroadcasterOutOfGas(error)
        } else if error.mentions(SHIELDED_BALANCE_TOO_LOW)
            || (via_broadcaster && error.mentions(INSUFFICIENT_FUNDS))
        {
            Self::InsufficientShieldedBalance(error)
        } else if error.mentions(INSUFFICIENT_FUNDS) {
            Self::SignerOutOfGas(error)
        } else if error.code == Some(RPC_INTERNAL_ERROR_CODE) || mentions_any(&error, &RPC_REJECTED)
        {
            Self::RpcRejected(error)
        } else if mentions_any(&error, &REVERTED) {
            Self::WouldRevert(error)
        } else if mentions_any(&error, &CONNECTIVITY) {
            Self::Network(error)
        } else {
            Self::Unknown(error)
        }
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            Self::BroadcasterOutOfGas(_) => {
                "Self sign with the existing proof, or pick a different broadcaster."
            }
            Self::InsufficientShieldedBalance(_) => {
                "Reduce the amount, or self sign to avoid the broadcaster fee."
            }
            Self::InsufficientGasBalance { .. } | Self::SignerOutOfGas(_) => {
                "Add gas funds to the signing wallet, or use a broadcaster."
            }
            Self::RpcRejected(_) => {
                "Check nonce and gas settings or wait for pending transactions, then send again."
            }
            Self::WouldRevert(_) => "Check the balances and amounts; the call reverts on chain.",
            Self::Network(_) => "Check the network connection and RPC provider, then send again.",
            Self::Malformed(_) => "Edit the selection and generate a new proof.",
            Self::Unknown(_) => "Retry once; if it fails again return to the menu.",
        }
    }
}

/// an action that is not valid in the builder's current stage
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply {transition} to a {stage} transaction")]
pub struct InvalidTransition {
    pub transition: &'static str,
    pub stage: &'static str,
}

/// top-level builder error
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum TxBuilderError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    GasEstimate(#[from] GasEstimateError),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error("could not populate the public transaction: {0}")]
    Populate(ExternalError),
}

impl TxBuilderError {
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Selection(e) => e.guidance(),
            Self::GasEstimate(e) => e.guidance(),
            Self::Proof(e) => e.guidance(),
            Self::Approval(_) => "Start again and approve each token when asked.",
            Self::Submit(e) => e.guidance(),
            Self::Transition(_) => "Choose another action.",
            Self::Populate(_) => "Check the RPC connection and confirm again.",
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn broadcaster_gas_errors_only_classified_on_broadcaster_path() {
        let err = ExternalError::new("Broadcaster wallet does not have enough gas");
        assert!(matches!(
            SubmitError::from_external(err.clone(), true),
            SubmitError::BroadcasterOutOfGas(_)
        ));
        assert!(!matches!(
            SubmitError::from_external(err, false),
            SubmitError::BroadcasterOutOfGas(_)
        ));
    }

    #[test]
    fn rpc_rejections_are_recognised_by_code_and_message() {
        assert!(matches!(
            SubmitError::from_external(ExternalError::with_code(-32603, "internal"), false),
            SubmitError::RpcRejected(_)
        ));
        assert!(matches!(
            SubmitError::from_external(ExternalError::new("could not coalesce error"), false),
            SubmitError::RpcRejected(_)
        ));
    }

    #[test]
    fn reverts_connectivity_and_unknowns() {
        assert!(matches!(
            SubmitError::from_external(ExternalError::new("execution reverted: STF"), false),
            SubmitError::WouldRevert(_)
        ));
        assert!(matches!(
            SubmitError::from_external(ExternalError::new("connect ECONNREFUSED"), true),
            SubmitError::Network(_)
        ));
        assert!(matches!(
            SubmitError::from_external(ExternalError::new("something odd"), true),
            SubmitError::Unknown(_)
        ));
    }

    #[test]
    fn shielded_shortfall_suggests_self_signing() {
        let err = SubmitError::from_external(
            ExternalError::new("Private balance too low for WETH"),
            true,
        );
        assert!(matches!(err, SubmitError::InsufficientShieldedBalance(_)));
        assert!(err.guidance().contains("self sign"));
    }

    #[test]
    fn self_signed_insufficient_funds_means_the_signer_lacks_gas() {
        let err = SubmitError::from_external(
            ExternalError::new("insufficient funds for gas * price + value"),
            false,
        );
        assert!(matches!(err, SubmitError::SignerOutOfGas(_)));
        assert!(err.guidance().contains("Add gas funds"));

        assert!(matches!(
            SubmitError::from_external(
                ExternalError::new("insufficient funds for gas * price + value"),
                true,
            ),
            SubmitError::InsufficientShieldedBalance(_)
        ));
    }

    #[test]
    fn transient_proof_error_is_recognised() {
        assert!(ProofError::is_transient(&ExternalError::new(
            "Cannot cache a transaction with a from address"
        )));
        assert!(!ProofError::is_transient(&ExternalError::new("bad proof")));
    }
}
