use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use super::gas_price_floors::GasFloorOverride;
use crate::models::chain::Chain;

/// The `shielded-terminal` program is an interactive wallet for shielded
/// token transactions on EVM chains.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct Args {
    /// The data directory that holds configuration and logs
    ///
    /// The default varies by operating system, and includes the chain, e.g.
    ///
    /// Linux:   /home/alice/.local/share/shielded-terminal/ethereum
    ///
    /// Windows: C:\Users\Alice\AppData\Roaming\shielded-terminal\data\ethereum
    ///
    /// macOS:   /Users/Alice/Library/Application Support/shielded-terminal/ethereum
    #[clap(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Chain to start on. Can be switched from the main menu.
    #[clap(long, default_value = "ethereum")]
    pub chain: Chain,

    /// Name of the wallet to open.
    #[clap(long, default_value = "default")]
    pub wallet: String,

    /// Use the built-in simulated engine, provider and broadcaster network.
    ///
    /// No other backend ships with this binary.
    #[clap(long)]
    pub simulate: bool,

    /// How often shielded balances are rescanned in the background.
    #[clap(long, default_value = "5m", value_parser = humantime::parse_duration)]
    pub balance_refresh_interval: Duration,

    /// Time limit for a background balance rescan.
    #[clap(long, default_value = "60s", value_parser = humantime::parse_duration)]
    pub balance_refresh_timeout: Duration,

    /// Time limit for a balance rescan requested from the menu.
    #[clap(long, default_value = "90s", value_parser = humantime::parse_duration)]
    pub manual_refresh_timeout: Duration,

    /// Time limit for switching chains.
    #[clap(long, default_value = "30s", value_parser = humantime::parse_duration)]
    pub chain_switch_timeout: Duration,

    /// Time limit for fetching fee data from the chain provider.
    #[clap(long, default_value = "15s", value_parser = humantime::parse_duration)]
    pub fee_data_timeout: Duration,

    /// Time limit for listing broadcasters.
    #[clap(long, default_value = "20s", value_parser = humantime::parse_duration)]
    pub broadcaster_query_timeout: Duration,

    /// How long a submitted transaction is watched for confirmation.
    #[clap(long, default_value = "10m", value_parser = humantime::parse_duration)]
    pub confirmation_timeout: Duration,

    /// Attempts made at generating a proof when the engine reports a
    /// transient failure.
    #[clap(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=10))]
    pub proof_retry_attempts: u32,

    /// Delay before the first proof retry; each further retry waits one more
    /// multiple of it.
    #[clap(long, default_value = "2s", value_parser = humantime::parse_duration)]
    pub proof_retry_base_delay: Duration,

    /// Minimum gas price for a chain in gwei, `<chain>=<gwei>` or
    /// `<chain>=<minimum>:<self-signed>`. May be repeated.
    ///
    /// BNB chain defaults to 1 gwei, and 3 gwei for self signed sends.
    #[clap(long = "min-gas-price", value_name = "CHAIN=GWEI")]
    pub min_gas_prices: Vec<GasFloorOverride>,

    /// Maximum slippage accepted on swaps, in basis points.
    #[clap(long, default_value = "320", value_parser = clap::value_parser!(u32).range(1..=5000))]
    pub swap_slippage_bps: u32,

    /// Log the engine's "V2 events" scan errors at debug level instead of
    /// warning about them.
    #[clap(long, default_value = "true", action = clap::ArgAction::Set)]
    pub quiet_v2_scan_errors: bool,

    /// Show the sender's shielded address to recipients of private transfers.
    #[clap(long)]
    pub show_sender_address: bool,

    /// Enable tokio tracing for consumption by the tokio-console application
    /// note: this will attempt to connect to localhost:6669
    #[clap(long)]
    pub tokio_console: bool,
}

impl Default for Args {
    fn default() -> Self {
        let empty: Vec<String> = vec![];
        Self::parse_from(empty)
    }
}
