use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use strum::EnumIter;

use crate::models::amount::TokenInfo;

/// placeholder address aggregators and wallets use for the native token
pub const NATIVE_TOKEN_ADDRESS: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

/// The gas payment semantics a chain uses by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum GasType {
    /// a single `gasPrice`
    Legacy,

    /// `maxFeePerGas` plus `maxPriorityFeePerGas`
    Eip1559,
}

/// EVM chains the wallet can build transactions for.
#[derive(
    Clone,
    Copy,
    Debug,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumIter,
    strum::EnumIs,
)]
#[non_exhaustive]
pub enum Chain {
    #[default]
    Ethereum,
    Bnb,
    Polygon,
    Arbitrum,
}

impl Chain {
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Ethereum => 1,
            Self::Bnb => 56,
            Self::Polygon => 137,
            Self::Arbitrum => 42161,
        }
    }

    /// human readable name shown in menus and headers
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::Bnb => "BNB Chain",
            Self::Polygon => "Polygon",
            Self::Arbitrum => "Arbitrum",
        }
    }

    pub fn default_gas_type(&self) -> GasType {
        match self {
            Self::Bnb => GasType::Legacy,
            Self::Ethereum | Self::Polygon | Self::Arbitrum => GasType::Eip1559,
        }
    }

    /// symbol of the native gas token
    pub fn base_symbol(&self) -> &'static str {
        match self {
            Self::Ethereum | Self::Arbitrum => "ETH",
            Self::Bnb => "BNB",
            Self::Polygon => "POL",
        }
    }

    /// the ERC-20 wrapper of the native token, used for base shield/unshield
    pub fn wrapped_base_token(&self) -> TokenInfo {
        let (address, symbol) = match self {
            Self::Ethereum => ("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "WETH"),
            Self::Bnb => ("0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c", "WBNB"),
            Self::Polygon => ("0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270", "WPOL"),
            Self::Arbitrum => ("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", "WETH"),
        };
        TokenInfo {
            address: address.to_string(),
            symbol: symbol.to_string(),
            decimals: 18,
        }
    }

    /// the native gas token itself, addressed by [`NATIVE_TOKEN_ADDRESS`]
    pub fn native_token(&self) -> TokenInfo {
        TokenInfo {
            address: NATIVE_TOKEN_ADDRESS.to_string(),
            symbol: self.base_symbol().to_string(),
            decimals: 18,
        }
    }

    /// block explorer link for a transaction hash
    pub fn transaction_url(&self, tx_hash: &str) -> String {
        let explorer = match self {
            Self::Ethereum => "https://etherscan.io",
            Self::Bnb => "https://bscscan.com",
            Self::Polygon => "https://polygonscan.com",
            Self::Arbitrum => "https://arbiscan.io",
        };
        format!("{}/tx/{}", explorer, tx_hash)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Chain::Ethereum => "ethereum",
            Chain::Bnb => "bnb",
            Chain::Polygon => "polygon",
            Chain::Arbitrum => "arbitrum",
        };
        write!(f, "{}", string)
    }
}

impl FromStr for Chain {
    type Err = String;
    fn from_str(input: &str) -> Result<Chain, Self::Err> {
        match input.to_lowercase().as_str() {
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "bnb" | "bsc" => Ok(Chain::Bnb),
            "polygon" | "matic" => Ok(Chain::Polygon),
            "arbitrum" => Ok(Chain::Arbitrum),
            _ => Err(format!("Failed to parse {} as chain", input)),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn display_round_trips_through_from_str() {
        for chain in Chain::iter() {
            assert_eq!(chain, Chain::from_str(&chain.to_string()).unwrap());
        }
    }

    #[test]
    fn bnb_uses_legacy_gas() {
        assert_eq!(GasType::Legacy, Chain::Bnb.default_gas_type());
        assert_eq!(GasType::Eip1559, Chain::Ethereum.default_gas_type());
    }

    #[test]
    fn transaction_url_points_at_explorer() {
        assert_eq!(
            "https://polygonscan.com/tx/0xabc",
            Chain::Polygon.transaction_url("0xabc")
        );
    }
}
