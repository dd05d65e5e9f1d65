//! ERC-20 allowance approvals sent from the public wallet before a shield
//! or public swap.

use tracing::info;
use tracing::warn;

use super::error::ApprovalError;
use super::gas_estimator::network_pricing;
use crate::api::collaborators::prompt::Notice;
use crate::api::collaborators::with_timeout;
use crate::api::collaborators::ApprovalRequest;
use crate::api::collaborators::ApprovalSpender;
use crate::api::collaborators::ExternalError;
use crate::application::session::SessionContext;
use crate::models::address;
use crate::models::amount::format_units;
use crate::models::amount::format_units_fixed;
use crate::models::amount::SelectedAmount;

fn spender_name(spender: &ApprovalSpender) -> String {
    match spender {
        ApprovalSpender::ShieldedPool => "the shielded pool".to_string(),
        ApprovalSpender::Contract(contract) => address::shorten(contract),
    }
}

/// the approval's gas cost in the native token, when it can be estimated
async fn approval_cost(ctx: &SessionContext, request: &ApprovalRequest) -> Option<String> {
    let pricing = network_pricing(ctx, true).await.ok()?;
    let units = ctx
        .collaborators
        .provider
        .estimate_gas(ctx.chain, &ctx.wallet.public_address, &request.transaction)
        .await
        .ok()?;
    let cost = u128::from(units).checked_mul(pricing.price_per_gas())?;
    Some(format!(
        "{} {}",
        format_units_fixed(cost, 18, 8),
        ctx.chain.base_symbol()
    ))
}

async fn approve_one(
    ctx: &SessionContext,
    spender: &ApprovalSpender,
    request: &ApprovalRequest,
) -> Result<(), ApprovalError> {
    let symbol = request.token.symbol.clone();
    let cost = approval_cost(ctx, request)
        .await
        .unwrap_or_else(|| "unknown".to_string());
    let question = format!(
        "Approve {} {} for {}? Estimated gas: {}",
        format_units(request.amount, request.token.decimals),
        symbol,
        spender_name(spender),
        cost
    );
    if !ctx.prompter().confirm(&question).await {
        return Err(ApprovalError::Declined(symbol));
    }

    let failed = |source: ExternalError| ApprovalError::Failed {
        symbol: request.token.symbol.clone(),
        source,
    };
    let provider = &ctx.collaborators.provider;
    let mut transaction = request.transaction.clone();
    transaction.from = None;
    let tx_hash = provider
        .send_transaction(ctx.chain, &ctx.wallet.signer(), &transaction)
        .await
        .map_err(failed)?;
    info!("sent {} approval {}", symbol, tx_hash);
    ctx.prompter().notify(
        Notice::Info,
        &format!("Waiting for {} approval {}", symbol, tx_hash),
    );

    let receipt = with_timeout(
        "approval confirmation",
        ctx.settings.confirmation_timeout,
        provider.wait_for_confirmation(ctx.chain, &tx_hash),
    )
    .await
    .map_err(failed)?;
    if !receipt.success {
        return Err(failed(ExternalError::new(format!(
            "approval {} reverted",
            tx_hash
        ))));
    }

    ctx.prompter()
        .notify(Notice::Success, &format!("Approved {}", symbol));
    Ok(())
}

/// Sends every approval `spender` still needs to move `amounts`, one at a
/// time and each confirmed by the user first.
pub async fn ensure_approvals(
    ctx: &SessionContext,
    spender: &ApprovalSpender,
    amounts: &[SelectedAmount],
) -> Result<(), ApprovalError> {
    let requests = ctx
        .collaborators
        .provider
        .approvals_needed(ctx.chain, &ctx.wallet.public_address, spender, amounts)
        .await
        .map_err(ApprovalError::Lookup)?;

    for request in &requests {
        if let Err(e) = approve_one(ctx, spender, request).await {
            warn!("approval for {} did not complete: {}", request.token.symbol, e);
            return Err(e);
        }
    }
    Ok(())
}
