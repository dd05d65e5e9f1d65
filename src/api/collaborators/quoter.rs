use async_trait::async_trait;

use super::ExternalError;
use crate::models::chain::Chain;
use crate::models::swap::SwapQuote;
use crate::models::swap::SwapRequest;

/// DEX aggregator pricing.
#[async_trait]
pub trait SwapQuoter: Send + Sync + std::fmt::Debug {
    async fn quote(&self, chain: Chain, request: &SwapRequest) -> Result<SwapQuote, ExternalError>;
}
