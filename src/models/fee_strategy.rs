use serde::Deserialize;
use serde::Serialize;

use crate::models::address;
use crate::models::amount::TokenInfo;

/// A local wallet able to sign and pay for public transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerWalletInfo {
    pub name: String,
    pub wallet_id: String,
    pub public_address: String,
}

/// A broadcaster's offer to relay for one fee token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcasterQuote {
    pub railgun_address: String,
    pub fee_token: String,
    pub fees_id: String,

    /// fee token units charged per 10^18 units of native gas cost
    pub fee_per_unit_gas: u128,

    /// number of relaying wallets the broadcaster advertises
    pub available_wallets: u32,
}

impl BroadcasterQuote {
    pub fn selection(&self) -> BroadcasterSelection {
        BroadcasterSelection {
            railgun_address: self.railgun_address.clone(),
            fee_token: self.fee_token.clone(),
            fees_id: self.fees_id.clone(),
        }
    }
}

/// The broadcaster a private transaction will be relayed through.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcasterSelection {
    pub railgun_address: String,
    pub fee_token: String,
    pub fees_id: String,
}

impl BroadcasterSelection {
    pub fn is_same_broadcaster(&self, other_address: &str) -> bool {
        address::normalize(&self.railgun_address) == address::normalize(other_address)
    }
}

/// The fee token a broadcaster is paid in, with its quoted rate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTokenDetails {
    pub token: TokenInfo,
    pub fee_per_unit_gas: u128,
}

/// How on-chain gas for a transaction is paid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeStrategy {
    /// a local public wallet pays gas and submits directly
    SelfSigned { signer: SignerWalletInfo },

    /// a broadcaster relays the proved transaction for a fee taken from the
    /// shielded balance
    Broadcasted {
        broadcaster: BroadcasterSelection,
        fee_token: FeeTokenDetails,
    },
}

impl FeeStrategy {
    pub fn broadcasted(quote: &BroadcasterQuote, token: TokenInfo) -> Self {
        Self::Broadcasted {
            broadcaster: quote.selection(),
            fee_token: FeeTokenDetails {
                token,
                fee_per_unit_gas: quote.fee_per_unit_gas,
            },
        }
    }

    pub fn signer(&self) -> Option<&SignerWalletInfo> {
        match self {
            Self::SelfSigned { signer } => Some(signer),
            Self::Broadcasted { .. } => None,
        }
    }

    pub fn broadcaster(&self) -> Option<&BroadcasterSelection> {
        match self {
            Self::SelfSigned { .. } => None,
            Self::Broadcasted { broadcaster, .. } => Some(broadcaster),
        }
    }

    /// one line description for review headers
    pub fn describe(&self) -> String {
        match self {
            Self::SelfSigned { signer } => format!(
                "Self Signed by {} [{}]",
                signer.name,
                address::shorten(&signer.public_address)
            ),
            Self::Broadcasted {
                broadcaster,
                fee_token,
            } => format!(
                "Broadcaster {} paid in {}",
                address::shorten(&broadcaster.railgun_address),
                fee_token.token.symbol
            ),
        }
    }
}
