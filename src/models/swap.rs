use serde::Deserialize;
use serde::Serialize;

use crate::models::amount::format_units;
use crate::models::amount::TokenInfo;
use crate::models::proved_transaction::RawTransaction;

/// A DEX aggregator quote for selling one token for another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub sell_token: TokenInfo,
    pub buy_token: TokenInfo,
    pub sell_amount: u128,
    pub buy_amount: u128,

    /// lowest acceptable output after slippage
    pub buy_minimum: u128,

    /// contract that must be approved to spend the sell token
    pub spender: String,

    /// the swap call executed on chain
    pub call: RawTransaction,
    pub slippage_bps: u32,
}

impl SwapQuote {
    pub fn describe(&self) -> String {
        format!(
            "Sell {} {} for at least {} {} (quoted {})",
            format_units(self.sell_amount, self.sell_token.decimals),
            self.sell_token.symbol,
            format_units(self.buy_minimum, self.buy_token.decimals),
            self.buy_token.symbol,
            format_units(self.buy_amount, self.buy_token.decimals),
        )
    }
}

/// The parameters a swap quote is requested with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub sell_token: TokenInfo,
    pub buy_token: TokenInfo,
    pub sell_amount: u128,
    pub slippage_bps: u32,

    /// quote for a swap executed from the shielded pool's relay adapt contract
    pub private: bool,
}
