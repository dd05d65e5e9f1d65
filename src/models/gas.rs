//! gas pricing and cost estimates.

use serde::Deserialize;
use serde::Serialize;

use crate::models::amount::format_units_fixed;
use crate::models::amount::SelectedAmount;
use crate::models::chain::GasType;

pub const GWEI: u128 = 1_000_000_000;

/// Fee data as reported by a chain provider. Any field may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeData {
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl FeeData {
    /// Pricing in the requested gas type, if the provider reported the
    /// fields that type needs.
    pub fn pricing_for(&self, gas_type: GasType) -> Option<GasPricing> {
        match gas_type {
            GasType::Legacy => self
                .gas_price
                .map(|gas_price| GasPricing::Legacy { gas_price }),
            GasType::Eip1559 => {
                let max_fee_per_gas = self.max_fee_per_gas?;
                Some(GasPricing::Eip1559 {
                    max_fee_per_gas,
                    max_priority_fee_per_gas: self
                        .max_priority_fee_per_gas
                        .unwrap_or_default()
                        .min(max_fee_per_gas),
                })
            }
        }
    }
}

/// Price per unit of gas in one of the two EVM pricing schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GasPricing {
    Legacy {
        gas_price: u128,
    },
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

impl GasPricing {
    pub fn gas_type(&self) -> GasType {
        match self {
            Self::Legacy { .. } => GasType::Legacy,
            Self::Eip1559 { .. } => GasType::Eip1559,
        }
    }

    /// the price the cost calculation multiplies by: `gasPrice` or `maxFeePerGas`
    pub fn price_per_gas(&self) -> u128 {
        match *self {
            Self::Legacy { gas_price } => gas_price,
            Self::Eip1559 {
                max_fee_per_gas, ..
            } => max_fee_per_gas,
        }
    }

    /// Raises the price to at least `floor`.
    pub fn with_floor(self, floor: u128) -> Self {
        match self {
            Self::Legacy { gas_price } => Self::Legacy {
                gas_price: gas_price.max(floor),
            },
            Self::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => Self::Eip1559 {
                max_fee_per_gas: max_fee_per_gas.max(floor),
                max_priority_fee_per_gas,
            },
        }
    }
}

/// A gas unit estimate together with the pricing it was made under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatedGasDetails {
    pub gas_estimate: u64,
    pub pricing: GasPricing,
}

impl EstimatedGasDetails {
    /// `gas_estimate × price_per_gas` in wei, `None` on overflow
    pub fn cost(&self) -> Option<u128> {
        u128::from(self.gas_estimate).checked_mul(self.pricing.price_per_gas())
    }
}

/// Cost estimate for one transaction under one fee strategy.
///
/// Regenerated whenever selections or fee strategy change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasEstimate {
    /// symbol the cost is denominated in: the fee token for broadcaster
    /// payment, otherwise the chain's native token
    pub symbol: String,

    /// cost in smallest units of `symbol`
    pub estimated_cost: u128,
    pub cost_decimals: u8,

    pub gas_details: EstimatedGasDetails,

    /// fee paid to the broadcaster out of the shielded balance
    pub broadcaster_fee_recipient: Option<SelectedAmount>,

    /// minimum gas price the broadcaster must submit with
    pub overall_batch_min_gas_price: Option<u128>,
}

impl GasEstimate {
    /// cost as a decimal string with 8 fractional digits
    pub fn estimated_cost_decimal(&self) -> String {
        format_units_fixed(self.estimated_cost, self.cost_decimals, 8)
    }
}
