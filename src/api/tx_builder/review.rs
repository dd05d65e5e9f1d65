//! the summary shown above the builder menu.

use crate::api::tx_builder::state::BuilderState;
use crate::application::session::SessionContext;
use crate::models::address;
use crate::models::transaction_type::TransactionType;

fn proof_status(state: &BuilderState) -> &'static str {
    match state {
        BuilderState::Empty => "Nothing selected",
        BuilderState::Selected(_) => "Amounts not confirmed",
        BuilderState::Confirmed(_) => "Fee option not selected",
        BuilderState::FeeResolved(s) if s.estimate.is_none() => "Gas estimate unavailable",
        BuilderState::FeeResolved(_) => "Proof not generated",
        BuilderState::Proved(s) if s.proved.metadata.proof_type.is_none() => "Ready to send",
        BuilderState::Proved(_) => "Proof ready",
    }
}

/// Renders everything the user has chosen so far, one fact per line.
pub fn render(ctx: &SessionContext, tx_type: TransactionType, state: &BuilderState) -> String {
    let wallet_address = if tx_type.spends_shielded_balance() {
        &ctx.wallet.shielded_address
    } else {
        &ctx.wallet.public_address
    };
    let mut lines = vec![
        format!("{} on {}", tx_type, ctx.chain.display_name()),
        format!(
            "Wallet: {} [{}]",
            ctx.wallet.name,
            address::shorten(wallet_address)
        ),
    ];

    if let Some(inputs) = state.inputs() {
        match inputs.swap_quote() {
            Some(quote) => lines.push(format!("Swap: {}", quote.describe())),
            None => {
                for recipient in inputs.recipients() {
                    lines.push(format!(
                        "Send: {} -> {}",
                        recipient.display_amount(),
                        address::shorten(&recipient.recipient_address)
                    ));
                }
            }
        }
    }
    if let Some(memo) = state.memo() {
        lines.push(format!("Memo: {}", memo));
    }
    if let Some(fee) = state.fee() {
        lines.push(format!("Fee: {}", fee.describe()));
    }
    if let Some(estimate) = state.estimate() {
        lines.push(format!(
            "Estimated gas: {} {}",
            estimate.estimated_cost_decimal(),
            estimate.symbol
        ));
    }
    lines.push(format!("Status: {}", proof_status(state)));
    if let Some((_, status)) = ctx.status.current() {
        lines.push(status);
    }
    lines.join("\n")
}
