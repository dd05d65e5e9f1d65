use serde::Deserialize;
use serde::Serialize;
use strum::EnumIter;

/// The kind of transaction a builder session constructs.
///
/// Fixed for the lifetime of a session. Determines which selector, gas
/// estimate, proof and submission behavior apply.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, strum::Display,
)]
pub enum TransactionType {
    /// private to private transfer of shielded tokens
    #[strum(to_string = "Private Transfer")]
    Transfer,

    /// shielded ERC-20 tokens to a public address
    #[strum(to_string = "Unshield")]
    Unshield,

    /// shielded wrapped base token to a public address as native token
    #[strum(to_string = "Unshield Base Token")]
    UnshieldBase,

    /// public ERC-20 tokens into the shielded pool
    #[strum(to_string = "Shield")]
    Shield,

    /// native base token into the shielded pool
    #[strum(to_string = "Shield Base Token")]
    ShieldBase,

    /// public ERC-20 transfer from the active public wallet
    #[strum(to_string = "Public Transfer")]
    PublicTransfer,

    /// public native token transfer from the active public wallet
    #[strum(to_string = "Public Base Token Transfer")]
    PublicBaseTransfer,

    /// swap executed from the shielded balance through the relay adapt contract
    #[strum(to_string = "Private Swap")]
    PrivateSwap,

    /// swap executed from the active public wallet
    #[strum(to_string = "Public Swap")]
    PublicSwap,
}

/// The proof or population call the engine performs for a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum ProofType {
    Transfer,
    Unshield,
    UnshieldBase,
    Shield,
    ShieldBase,
    CrossContractCalls,
}

impl TransactionType {
    /// the engine proof kind, if this transaction is proved at all
    pub fn proof_type(&self) -> Option<ProofType> {
        match self {
            Self::Transfer => Some(ProofType::Transfer),
            Self::Unshield => Some(ProofType::Unshield),
            Self::UnshieldBase => Some(ProofType::UnshieldBase),
            Self::Shield => Some(ProofType::Shield),
            Self::ShieldBase => Some(ProofType::ShieldBase),
            Self::PrivateSwap => Some(ProofType::CrossContractCalls),
            Self::PublicTransfer | Self::PublicBaseTransfer | Self::PublicSwap => None,
        }
    }

    /// spends from the shielded balance
    pub fn spends_shielded_balance(&self) -> bool {
        matches!(
            self,
            Self::Transfer | Self::Unshield | Self::UnshieldBase | Self::PrivateSwap
        )
    }

    /// broadcaster submissions must go through the relay adapt contract
    pub fn uses_relay_adapt(&self) -> bool {
        matches!(self, Self::UnshieldBase | Self::PrivateSwap)
    }

    /// the user may attach a memo
    pub fn supports_memo(&self) -> bool {
        matches!(self, Self::Transfer)
    }

    /// operates on the chain's native token rather than ERC-20 selections
    pub fn is_base_token(&self) -> bool {
        matches!(
            self,
            Self::UnshieldBase | Self::ShieldBase | Self::PublicBaseTransfer
        )
    }

    pub fn is_swap(&self) -> bool {
        matches!(self, Self::PrivateSwap | Self::PublicSwap)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn only_public_types_skip_proofs() {
        let unproved = TransactionType::iter()
            .filter(|t| t.proof_type().is_none())
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                TransactionType::PublicTransfer,
                TransactionType::PublicBaseTransfer,
                TransactionType::PublicSwap
            ],
            unproved
        );
    }

    #[test]
    fn memo_is_transfer_only() {
        assert_eq!(
            1,
            TransactionType::iter()
                .filter(TransactionType::supports_memo)
                .count()
        );
    }
}
