//! address classification helpers.
//!
//! shielded addresses are bech32-style strings with a `0zk` prefix. public
//! addresses are 20-byte hex strings with a `0x` prefix.

use std::sync::OnceLock;

use regex::Regex;

pub const SHIELDED_ADDRESS_PREFIX: &str = "0zk";

/// indicates if `address` looks like a shielded (0zk) address
pub fn is_shielded_address(address: &str) -> bool {
    address.starts_with(SHIELDED_ADDRESS_PREFIX) && address.len() > SHIELDED_ADDRESS_PREFIX.len()
}

/// indicates if `address` is a well formed public (0x) address
pub fn is_public_address(address: &str) -> bool {
    static PUBLIC_ADDRESS: OnceLock<Option<Regex>> = OnceLock::new();
    PUBLIC_ADDRESS
        .get_or_init(|| Regex::new("^0x[0-9a-fA-F]{40}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(address))
}

/// canonical form used when comparing addresses for equality
pub fn normalize(address: &str) -> String {
    address.trim().to_lowercase()
}

/// shortens an address for menu display, eg `0x1234...cdef`
pub fn shorten(address: &str) -> String {
    const KEEP: usize = 6;
    if address.len() <= KEEP * 2 + 3 {
        return address.to_string();
    }
    format!(
        "{}...{}",
        &address[..KEEP],
        &address[address.len() - KEEP + 2..]
    )
}
