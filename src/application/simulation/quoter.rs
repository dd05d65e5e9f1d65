use async_trait::async_trait;
use tracing::debug;

use super::prices;
use super::SWAP_ROUTER_ADDRESS;
use crate::api::collaborators::ExternalError;
use crate::api::collaborators::SwapQuoter;
use crate::models::address;
use crate::models::chain::Chain;
use crate::models::chain::NATIVE_TOKEN_ADDRESS;
use crate::models::proved_transaction::RawTransaction;
use crate::models::swap::SwapQuote;
use crate::models::swap::SwapRequest;

/// aggregator fee kept from the output, in basis points
const AGGREGATOR_FEE_BPS: u128 = 30;

/// calldata selector of the router's `swap`
const SWAP_SELECTOR: &str = "0x415565b0";

/// A DEX aggregator pricing swaps at fixed simulated prices.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedQuoter;

#[async_trait]
impl SwapQuoter for SimulatedQuoter {
    async fn quote(&self, chain: Chain, request: &SwapRequest) -> Result<SwapQuote, ExternalError> {
        if request.sell_amount == 0 {
            return Err(ExternalError::new("sell amount must be greater than zero"));
        }
        let gross = prices::convert(request.sell_amount, &request.sell_token, &request.buy_token)
            .ok_or_else(|| {
                ExternalError::new(format!(
                    "no liquidity for {} to {} on {}",
                    request.sell_token.symbol, request.buy_token.symbol, chain
                ))
            })?;
        let buy_amount = gross.saturating_mul(10_000 - AGGREGATOR_FEE_BPS) / 10_000;
        let slippage = u128::from(request.slippage_bps.min(10_000));
        let buy_minimum = buy_amount.saturating_mul(10_000 - slippage) / 10_000;

        let sells_native =
            address::normalize(&request.sell_token.address) == address::normalize(NATIVE_TOKEN_ADDRESS);
        let payload: [u8; 96] = std::array::from_fn(|_| rand::random());
        let call = RawTransaction::call(
            chain,
            SWAP_ROUTER_ADDRESS,
            format!("{}{}", SWAP_SELECTOR, hex::encode(payload)),
            if sells_native { request.sell_amount } else { 0 },
        );

        debug!(
            "quoted {} {} for {} {} on {}",
            request.sell_amount,
            request.sell_token.symbol,
            buy_amount,
            request.buy_token.symbol,
            chain
        );
        Ok(SwapQuote {
            sell_token: request.sell_token.clone(),
            buy_token: request.buy_token.clone(),
            sell_amount: request.sell_amount,
            buy_amount,
            buy_minimum,
            spender: SWAP_ROUTER_ADDRESS.to_string(),
            call,
            slippage_bps: request.slippage_bps,
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use macro_rules_attr::apply;

    use super::*;
    use crate::application::simulation::stablecoin;
    use crate::tests::shared_tokio_runtime;

    fn request(sell_amount: u128) -> SwapRequest {
        SwapRequest {
            sell_token: Chain::Ethereum.wrapped_base_token(),
            buy_token: stablecoin(),
            sell_amount,
            slippage_bps: 100,
            private: true,
        }
    }

    #[apply(shared_tokio_runtime)]
    async fn slippage_lowers_the_minimum_output() {
        let quote = SimulatedQuoter
            .quote(Chain::Ethereum, &request(1_000_000_000_000_000_000))
            .await
            .unwrap();

        assert_eq!(2_392_800_000, quote.buy_amount);
        assert_eq!(2_368_872_000, quote.buy_minimum);
        assert_eq!(0, quote.call.value);
        assert!(quote.call.has_call_data());
    }

    #[apply(shared_tokio_runtime)]
    async fn zero_amounts_are_not_quoted() {
        assert!(SimulatedQuoter
            .quote(Chain::Ethereum, &request(0))
            .await
            .is_err());
    }
}
