//! an in-process stand-in for the shielded engine, the chain RPC, the
//! broadcaster network and the swap aggregator.
//!
//! balances, fees and receipts live in memory. each simulator also exposes
//! knobs (queued failures, delays, recorded calls) that tests use to steer
//! a session.
mod chain;
mod engine;
mod prices;
mod quoter;
mod relay;

use std::sync::Mutex;
use std::sync::MutexGuard;

pub use chain::SimulatedChain;
pub use engine::SimulatedEngine;
pub use quoter::SimulatedQuoter;
pub use relay::SimulatedRelay;

use crate::application::session::ActiveWallet;
use crate::models::amount::TokenInfo;
use crate::models::chain::Chain;
use crate::models::fee_strategy::SignerWalletInfo;

/// entry point of the shielded pool contract
pub const SHIELDED_POOL_ADDRESS: &str = "0xFA7093CDD9EE6932B4eb2c9e1cde7CE00B1FA4b9";

/// contract that wraps and unwraps base tokens and runs cross contract calls
pub const RELAY_ADAPT_ADDRESS: &str = "0x4025ee6512DBbda97049Bcf5AA5D38C54aF6bE8a";

/// the aggregator router swaps are executed through
pub const SWAP_ROUTER_ADDRESS: &str = "0xDef1C0ded9bec7F1a1670819833240f027b25EfF";

/// broadcasters on the simulated network and their fee markup over the
/// fair gas price, in basis points
pub const SIMULATED_BROADCASTERS: [(&str, u128); 3] = [
    (
        "0zk1qyqv0sfj4vx4fpkc7u5dnyx8ft3mj9hw6x9m6x7yx0wpa8hu6xd9rv7j6fe3z53laj8f6ysd4fw0qgcyzzpxg9j5gdt2wvmd0f6hs8",
        11_000,
    ),
    (
        "0zk1qy9tr6w83ut0a2xhhj3vavw7pq50vx4q6s8kk7l0g3kuac2jh4dnzrv7j6fe3z53la6hq8yjzkcp8p2jxs8rrz7f4lsyxpan9v5ck4",
        10_800,
    ),
    (
        "0zk1qyv8mf2q0ykqc3hsm4d0x7z3k5rj0w6gz2lztrfaq4kt5nvpq3lwrrv7j6fe3z53lap2zq0yfqkkss0xxvzvjt4h8k3wqn6y4c6ex9",
        12_500,
    ),
];

/// the stablecoin every simulated wallet holds
pub fn stablecoin() -> TokenInfo {
    TokenInfo {
        address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string(),
        symbol: "USDC".to_string(),
        decimals: 6,
    }
}

/// tokens the simulators know on `chain`
fn known_tokens(chain: Chain) -> [TokenInfo; 3] {
    [stablecoin(), chain.wrapped_base_token(), chain.native_token()]
}

/// A wallet named `name` with addresses derived from the name.
pub fn simulated_wallet(name: &str) -> ActiveWallet {
    let seed = name
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |hash, b| {
            (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
    let public_hex = format!(
        "{:016x}{:016x}{:08x}",
        seed,
        seed.rotate_left(17),
        seed.rotate_left(41) & 0xffff_ffff
    );
    ActiveWallet {
        name: name.to_string(),
        wallet_id: format!("{:016x}", seed),
        shielded_address: format!("0zk1qy{}{}", hex::encode(name.as_bytes()), public_hex),
        public_address: format!("0x{}", public_hex),
    }
}

/// Wallets able to self sign: the active one, then a dedicated gas wallet.
pub fn simulated_signers(active: &ActiveWallet) -> Vec<SignerWalletInfo> {
    let gas_wallet = simulated_wallet(&format!("{}-gas", active.name));
    vec![active.signer(), gas_wallet.signer()]
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// a random 32 byte hash, `0x` prefixed
fn random_hash() -> String {
    let bytes: [u8; 32] = rand::random();
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::models::address;

    #[test]
    fn simulated_wallets_have_valid_addresses() {
        let wallet = simulated_wallet("alice");
        assert!(address::is_public_address(&wallet.public_address));
        assert!(address::is_shielded_address(&wallet.shielded_address));
        assert_eq!(wallet, simulated_wallet("alice"));
        assert_ne!(wallet.public_address, simulated_wallet("bob").public_address);
    }

    #[test]
    fn broadcasters_are_shielded_and_distinctly_priced() {
        for (i, (addr, markup)) in SIMULATED_BROADCASTERS.iter().enumerate() {
            assert!(address::is_shielded_address(addr));
            for (other, other_markup) in &SIMULATED_BROADCASTERS[i + 1..] {
                assert_ne!(addr, other);
                assert_ne!(markup, other_markup);
            }
        }
    }

    #[test]
    fn two_signers_are_offered() {
        let wallet = simulated_wallet("alice");
        let signers = simulated_signers(&wallet);
        assert_eq!(2, signers.len());
        assert_eq!(wallet.signer(), signers[0]);
    }
}
