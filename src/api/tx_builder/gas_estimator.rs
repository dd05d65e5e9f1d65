//! gas cost estimates in the chain's own pricing semantics.
//!
//! the cost is always `gas units × price per gas`, where the price is the
//! legacy `gasPrice` or the EIP-1559 `maxFeePerGas`, whichever the chain
//! prices in. per-chain floors are applied before any cost is computed.

use tracing::debug;
use tracing::warn;

use super::error::GasEstimateError;
use super::request::RequestParts;
use crate::api::collaborators::prompt::Notice;
use crate::api::collaborators::with_timeout;
use crate::application::session::SessionContext;
use crate::models::amount::SelectedAmount;
use crate::models::chain::Chain;
use crate::models::fee_strategy::FeeStrategy;
use crate::models::gas::EstimatedGasDetails;
use crate::models::gas::GasEstimate;
use crate::models::gas::GasPricing;
use crate::models::proved_transaction::RawTransaction;

/// fee quotes are per 10^18 units of native gas cost
const FEE_QUOTE_SCALE: u128 = 1_000_000_000_000_000_000;

/// Where the gas unit count comes from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum GasUnits<'a> {
    /// the engine's estimate for a shielded transaction
    Private(RequestParts<'a>),

    /// the provider's estimate for a populated public call
    Public {
        from: &'a str,
        transaction: &'a RawTransaction,
    },
}

/// Current network pricing for `ctx.chain`, raised to the chain's floor.
pub(crate) async fn network_pricing(
    ctx: &SessionContext,
    self_signed: bool,
) -> Result<GasPricing, GasEstimateError> {
    let chain = ctx.chain;
    let fee_data = with_timeout(
        "fee data",
        ctx.settings.fee_data_timeout,
        ctx.collaborators.provider.fee_data(chain),
    )
    .await
    .map_err(GasEstimateError::FeeData)?;

    let gas_type = chain.default_gas_type();
    let pricing =
        fee_data
            .pricing_for(gas_type)
            .ok_or_else(|| GasEstimateError::MissingPricing {
                chain: chain.to_string(),
                gas_type: gas_type.to_string(),
            })?;

    Ok(match ctx.settings.gas_floors.floor_for(chain, self_signed) {
        Some(floor) if pricing.price_per_gas() < floor => {
            debug!(
                "raising {} gas price {} to floor {}",
                chain,
                pricing.price_per_gas(),
                floor
            );
            pricing.with_floor(floor)
        }
        _ => pricing,
    })
}

/// The broadcaster's fee for a native gas cost, in fee token units.
pub fn broadcaster_fee(gas_cost: u128, fee_per_unit_gas: u128) -> Option<u128> {
    gas_cost
        .checked_mul(fee_per_unit_gas)
        .map(|scaled| scaled / FEE_QUOTE_SCALE)
}

/// Prices `gas_details` in the currency `fee` pays with.
pub fn price(
    chain: Chain,
    gas_details: EstimatedGasDetails,
    fee: &FeeStrategy,
) -> Result<GasEstimate, GasEstimateError> {
    let cost = gas_details.cost().ok_or(GasEstimateError::Overflow)?;
    match fee {
        FeeStrategy::SelfSigned { .. } => Ok(GasEstimate {
            symbol: chain.base_symbol().to_string(),
            estimated_cost: cost,
            cost_decimals: 18,
            gas_details,
            broadcaster_fee_recipient: None,
            overall_batch_min_gas_price: None,
        }),
        FeeStrategy::Broadcasted {
            broadcaster,
            fee_token,
        } => {
            let fee_amount = broadcaster_fee(cost, fee_token.fee_per_unit_gas)
                .ok_or(GasEstimateError::Overflow)?;
            Ok(GasEstimate {
                symbol: fee_token.token.symbol.clone(),
                estimated_cost: fee_amount,
                cost_decimals: fee_token.token.decimals,
                gas_details,
                broadcaster_fee_recipient: Some(SelectedAmount::new(
                    &fee_token.token,
                    fee_amount,
                    broadcaster.railgun_address.clone(),
                )),
                overall_batch_min_gas_price: Some(gas_details.pricing.price_per_gas()),
            })
        }
    }
}

/// Estimates the cost of a transaction paid for by `fee`.
pub(crate) async fn estimate(
    ctx: &SessionContext,
    units: GasUnits<'_>,
    fee: &FeeStrategy,
) -> Result<GasEstimate, GasEstimateError> {
    let pricing = network_pricing(ctx, fee.signer().is_some()).await?;

    let gas_estimate = match units {
        GasUnits::Private(parts) => {
            let placeholder = EstimatedGasDetails {
                gas_estimate: 0,
                pricing,
            };
            let batch_price = fee.broadcaster().map(|_| pricing.price_per_gas());
            let request = parts.build(ctx, placeholder, None, batch_price);
            ctx.collaborators.engine.estimate_gas(&request).await
        }
        GasUnits::Public { from, transaction } => {
            ctx.collaborators
                .provider
                .estimate_gas(ctx.chain, from, transaction)
                .await
        }
    }
    .map_err(GasEstimateError::from_external)?;

    let estimate = price(
        ctx.chain,
        EstimatedGasDetails {
            gas_estimate,
            pricing,
        },
        fee,
    )?;
    debug!(
        "estimated {} gas, {} {}",
        gas_estimate,
        estimate.estimated_cost_decimal(),
        estimate.symbol
    );
    Ok(estimate)
}

/// Like [`estimate`], but reports a failure to the user and yields `None`
/// so the caller stays in its current step.
pub(crate) async fn estimate_or_report(
    ctx: &SessionContext,
    units: GasUnits<'_>,
    fee: &FeeStrategy,
) -> Option<GasEstimate> {
    match estimate(ctx, units, fee).await {
        Ok(estimate) => Some(estimate),
        Err(e) => {
            warn!("gas estimate failed on {}: {}", ctx.chain, e);
            ctx.prompter()
                .notify(Notice::Error, &format!("{}. {}", e, e.guidance()));
            None
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use macro_rules_attr::apply;

    use super::*;
    use crate::api::collaborators::ExternalError;
    use crate::models::gas::FeeData;
    use crate::models::gas::GWEI;
    use crate::tests::shared::fixtures;
    use crate::tests::shared_tokio_runtime;

    fn details(pricing: GasPricing) -> EstimatedGasDetails {
        EstimatedGasDetails {
            gas_estimate: 21_000,
            pricing,
        }
    }

    #[test]
    fn cost_is_units_times_price_on_both_pricing_schemes() {
        let legacy = price(
            Chain::Bnb,
            details(GasPricing::Legacy {
                gas_price: 5 * GWEI,
            }),
            &fixtures::self_signed(),
        )
        .unwrap();
        let eip1559 = price(
            Chain::Ethereum,
            details(GasPricing::Eip1559 {
                max_fee_per_gas: 5 * GWEI,
                max_priority_fee_per_gas: GWEI,
            }),
            &fixtures::self_signed(),
        )
        .unwrap();

        assert_eq!(105_000_000_000_000, legacy.estimated_cost);
        assert_eq!(105_000_000_000_000, eip1559.estimated_cost);
        assert_eq!("0.00010500", eip1559.estimated_cost_decimal());
        assert_eq!("ETH", eip1559.symbol);
    }

    #[test]
    fn broadcaster_fee_is_charged_in_the_fee_token() {
        let fee = fixtures::broadcasted();
        let estimate = price(
            Chain::Ethereum,
            details(GasPricing::Legacy {
                gas_price: 5 * GWEI,
            }),
            &fee,
        )
        .unwrap();

        // 0.000105 ETH at 2500 USDC per ETH
        assert_eq!(262_500, estimate.estimated_cost);
        assert_eq!("USDC", estimate.symbol);
        assert_eq!(Some(5 * GWEI), estimate.overall_batch_min_gas_price);
        let recipient = estimate.broadcaster_fee_recipient.unwrap();
        assert_eq!(fixtures::BROADCASTER_ADDRESS, recipient.recipient_address);
        assert_eq!(262_500, recipient.amount);
    }

    #[apply(shared_tokio_runtime)]
    async fn bnb_self_signed_price_is_raised_to_floor() {
        let session = fixtures::session_on(Chain::Bnb, vec![]);
        session.chain.set_fee_data(FeeData {
            gas_price: Some(GWEI),
            ..FeeData::default()
        });

        let self_signed = network_pricing(&session.ctx, true).await.unwrap();
        let relayed = network_pricing(&session.ctx, false).await.unwrap();

        assert_eq!(3 * GWEI, self_signed.price_per_gas());
        assert_eq!(GWEI, relayed.price_per_gas());
    }

    #[apply(shared_tokio_runtime)]
    async fn missing_pricing_fields_are_an_error() {
        let session = fixtures::session(vec![]);
        session.chain.set_fee_data(FeeData {
            gas_price: Some(GWEI),
            ..FeeData::default()
        });

        assert!(matches!(
            network_pricing(&session.ctx, true).await,
            Err(GasEstimateError::MissingPricing { .. })
        ));
    }

    #[apply(shared_tokio_runtime)]
    async fn failed_estimate_is_reported_not_raised() {
        let session = fixtures::session(vec![]);
        session
            .chain
            .fail_next_fee_data(ExternalError::new("connection refused"));

        let inputs = fixtures::transfer_inputs(100);
        let key = fixtures::key();
        let fee = fixtures::self_signed();
        let units = GasUnits::Private(RequestParts {
            proof_type: crate::models::transaction_type::ProofType::Transfer,
            inputs: &inputs,
            key: &key,
            fee: &fee,
            memo: None,
        });

        assert!(estimate_or_report(&session.ctx, units, &fee).await.is_none());
        assert_eq!(1, session.prompter.notices_at(Notice::Error).len());
    }
}
