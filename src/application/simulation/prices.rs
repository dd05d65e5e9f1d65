use num_traits::checked_pow;

use crate::models::amount::TokenInfo;
use crate::models::chain::Chain;

/// price of one whole token in micro-dollars
pub(super) fn usd_price(symbol: &str) -> Option<u128> {
    match symbol {
        "USDC" => Some(1_000_000),
        "ETH" | "WETH" => Some(2_400_000_000),
        "BNB" | "WBNB" => Some(600_000_000),
        "POL" | "WPOL" => Some(500_000),
        _ => None,
    }
}

/// `amount` of `from` expressed in units of `to`, at simulated prices
pub(super) fn convert(amount: u128, from: &TokenInfo, to: &TokenInfo) -> Option<u128> {
    let from_price = usd_price(&from.symbol)?;
    let to_price = usd_price(&to.symbol)?;
    let value = if to.decimals >= from.decimals {
        let scale = checked_pow(10u128, usize::from(to.decimals - from.decimals))?;
        amount.checked_mul(scale)?.checked_mul(from_price)?
    } else {
        let scale = checked_pow(10u128, usize::from(from.decimals - to.decimals))?;
        amount.checked_mul(from_price)? / scale
    };
    value.checked_div(to_price)
}

/// `token` units one whole base token of gas is worth on `chain`
pub(super) fn base_token_rate(chain: Chain, token: &TokenInfo) -> Option<u128> {
    let base = chain.native_token();
    let one = checked_pow(10u128, usize::from(base.decimals))?;
    convert(one, &base, token)
}
