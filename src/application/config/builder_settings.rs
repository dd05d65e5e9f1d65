use std::time::Duration;

use super::cli_args::Args;
use super::gas_price_floors::GasPriceFloors;
use crate::application::retry::RetryPolicy;

/// Tunables the transaction builder and its background tasks read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderSettings {
    pub gas_floors: GasPriceFloors,
    pub fee_data_timeout: Duration,
    pub broadcaster_query_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub proof_retry: RetryPolicy,
    pub swap_slippage_bps: u32,
    pub show_sender_address: bool,
    pub quiet_v2_scan_errors: bool,
    pub balance_refresh_interval: Duration,
    pub balance_refresh_timeout: Duration,
    pub manual_refresh_timeout: Duration,
    pub chain_switch_timeout: Duration,
}

impl From<&Args> for BuilderSettings {
    fn from(args: &Args) -> Self {
        Self {
            gas_floors: GasPriceFloors::default().with_overrides(&args.min_gas_prices),
            fee_data_timeout: args.fee_data_timeout,
            broadcaster_query_timeout: args.broadcaster_query_timeout,
            confirmation_timeout: args.confirmation_timeout,
            proof_retry: RetryPolicy::new(args.proof_retry_attempts, args.proof_retry_base_delay),
            swap_slippage_bps: args.swap_slippage_bps,
            show_sender_address: args.show_sender_address,
            quiet_v2_scan_errors: args.quiet_v2_scan_errors,
            balance_refresh_interval: args.balance_refresh_interval,
            balance_refresh_timeout: args.balance_refresh_timeout,
            manual_refresh_timeout: args.manual_refresh_timeout,
            chain_switch_timeout: args.chain_switch_timeout,
        }
    }
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self::from(&Args::default())
    }
}
