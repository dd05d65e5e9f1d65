//! per-chain minimum gas prices.
//!
//! some chains reject transactions priced below a floor that their fee
//! oracles happily report. floors are configuration, not constants, so a
//! chain can be adjusted without a release.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::models::amount::parse_units;
use crate::models::chain::Chain;
use crate::models::gas::GWEI;

/// Floors for one chain, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainGasFloor {
    /// never price below this on any path
    pub minimum: u128,

    /// floor for transactions the local wallet signs and sends itself
    pub self_signed: u128,
}

/// A `--min-gas-price` command line entry, eg `bnb=3` or `bnb=1:3`.
///
/// A single value sets both floors; `minimum:self_signed` sets them
/// separately. Values are in gwei and may be fractional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasFloorOverride {
    pub chain: Chain,
    pub floor: ChainGasFloor,
}

impl FromStr for GasFloorOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chain, values) = s
            .split_once('=')
            .ok_or_else(|| format!("expected <chain>=<gwei>, got `{s}`"))?;
        let chain = Chain::from_str(chain.trim())?;
        let gwei = |v: &str| {
            parse_units(v, 9).map_err(|e| format!("invalid gwei value `{v}`: {e}"))
        };
        let floor = match values.split_once(':') {
            Some((minimum, self_signed)) => ChainGasFloor {
                minimum: gwei(minimum)?,
                self_signed: gwei(self_signed)?,
            },
            None => {
                let both = gwei(values)?;
                ChainGasFloor {
                    minimum: both,
                    self_signed: both,
                }
            }
        };
        if floor.self_signed < floor.minimum {
            return Err(format!(
                "self signed floor must not be below the minimum for {chain}"
            ));
        }
        Ok(Self { chain, floor })
    }
}

/// The floors in effect for every chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPriceFloors {
    floors: HashMap<Chain, ChainGasFloor>,
}

impl Default for GasPriceFloors {
    /// BNB chain nodes drop transactions priced under 1 gwei, and self
    /// signed sends below 3 gwei tend to stall.
    fn default() -> Self {
        let floors = HashMap::from([(
            Chain::Bnb,
            ChainGasFloor {
                minimum: GWEI,
                self_signed: 3 * GWEI,
            },
        )]);
        Self { floors }
    }
}

impl GasPriceFloors {
    pub fn with_overrides(mut self, overrides: &[GasFloorOverride]) -> Self {
        for o in overrides {
            self.floors.insert(o.chain, o.floor);
        }
        self
    }

    /// floor for `chain` on the given path, if the chain has one
    pub fn floor_for(&self, chain: Chain, self_signed: bool) -> Option<u128> {
        self.floors.get(&chain).map(|floor| {
            if self_signed {
                floor.self_signed
            } else {
                floor.minimum
            }
        })
    }
}
