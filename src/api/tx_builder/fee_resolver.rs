//! chooses how gas is paid: a broadcaster paid in a fee token, or a local
//! wallet that self signs.
//!
//! the broadcaster network is never allowed to block the user. a failed or
//! empty broadcaster query falls back to the self sign wallet prompt.

use tracing::info;
use tracing::warn;

use super::state::TxInputs;
use crate::api::collaborators::prompt::Menu;
use crate::api::collaborators::prompt::Notice;
use crate::api::collaborators::with_timeout;
use crate::application::session::SessionContext;
use crate::models::address;
use crate::models::amount::format_units;
use crate::models::amount::TokenInfo;
use crate::models::fee_strategy::BroadcasterQuote;
use crate::models::fee_strategy::FeeStrategy;
use crate::models::transaction_type::TransactionType;

#[derive(Debug, Clone, PartialEq, Eq)]
enum FeeChoice {
    Token(TokenInfo),
    SelfSign,
    Back,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BroadcasterChoice {
    Quote(BroadcasterQuote),
    Back,
}

/// Outcome of picking a broadcaster for one fee token.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BroadcasterOutcome {
    Chosen(FeeStrategy),
    Back,

    /// the network could not offer a broadcaster; self signing is next
    Unavailable,
}

/// fee tokens offered: each selected token, then the wrapped base token
fn fee_tokens(ctx: &SessionContext, inputs: &TxInputs) -> Vec<TokenInfo> {
    let mut tokens: Vec<TokenInfo> = vec![];
    let candidates = inputs
        .recipients()
        .into_iter()
        .map(|r| r.token())
        .chain(std::iter::once(ctx.chain.wrapped_base_token()));
    for token in candidates {
        let known = tokens
            .iter()
            .any(|t| address::normalize(&t.address) == address::normalize(&token.address));
        if !known {
            tokens.push(token);
        }
    }
    tokens
}

/// pinned broadcasters first, then cheapest
fn rank(quotes: &mut [BroadcasterQuote], pinned: &[String]) {
    let is_pinned = |q: &BroadcasterQuote| {
        pinned
            .iter()
            .any(|p| address::normalize(p) == address::normalize(&q.railgun_address))
    };
    quotes.sort_by_key(|q| (!is_pinned(q), q.fee_per_unit_gas));
}

fn quote_label(
    quote: &BroadcasterQuote,
    token: &TokenInfo,
    base_symbol: &str,
    pinned: &[String],
) -> String {
    let pin = if pinned
        .iter()
        .any(|p| address::normalize(p) == address::normalize(&quote.railgun_address))
    {
        " (pinned)"
    } else {
        ""
    };
    format!(
        "{}{}: {} {} per {} of gas",
        address::shorten(&quote.railgun_address),
        pin,
        format_units(quote.fee_per_unit_gas, token.decimals),
        token.symbol,
        base_symbol
    )
}

async fn choose_broadcaster(
    ctx: &SessionContext,
    tx_type: TransactionType,
    token: &TokenInfo,
    exclude: Option<&str>,
) -> BroadcasterOutcome {
    let prompter = ctx.prompter();
    let listed = with_timeout(
        "broadcaster query",
        ctx.settings.broadcaster_query_timeout,
        ctx.collaborators.relay.list_broadcasters(
            ctx.chain,
            &token.address,
            tx_type.uses_relay_adapt(),
        ),
    )
    .await;

    let mut quotes = match listed {
        Ok(quotes) => quotes,
        Err(e) => {
            warn!("broadcaster query for {} failed: {}", token.symbol, e);
            prompter.notify(
                Notice::Warning,
                &format!(
                    "Could not reach broadcasters ({}). Continuing with self signing.",
                    e.truncated(80)
                ),
            );
            return BroadcasterOutcome::Unavailable;
        }
    };
    if let Some(excluded) = exclude {
        quotes.retain(|q| address::normalize(&q.railgun_address) != address::normalize(excluded));
    }
    if quotes.is_empty() {
        info!("no broadcasters accept {} on {}", token.symbol, ctx.chain);
        prompter.notify(
            Notice::Warning,
            &format!(
                "No broadcasters accept {} right now. Continuing with self signing.",
                token.symbol
            ),
        );
        return BroadcasterOutcome::Unavailable;
    }

    let pinned = ctx.custom_broadcasters.lock().await.addresses().to_vec();
    rank(&mut quotes, &pinned);
    let base_symbol = ctx.chain.base_symbol();

    let mut menu = Menu::new(format!("Select a broadcaster paid in {}", token.symbol));
    if let Some(best) = quotes.first() {
        menu = menu.entry(
            BroadcasterChoice::Quote(best.clone()),
            "Best broadcaster",
            Some(quote_label(best, token, base_symbol, &pinned)),
            true,
        );
    }
    for quote in &quotes {
        menu = menu.choice(
            BroadcasterChoice::Quote(quote.clone()),
            quote_label(quote, token, base_symbol, &pinned),
        );
    }
    menu = menu.choice(BroadcasterChoice::Back, "Back");

    match menu.run(prompter).await {
        Some(BroadcasterChoice::Quote(quote)) => {
            info!(
                "selected broadcaster {} for {}",
                quote.railgun_address, token.symbol
            );
            BroadcasterOutcome::Chosen(FeeStrategy::broadcasted(&quote, token.clone()))
        }
        Some(BroadcasterChoice::Back) | None => BroadcasterOutcome::Back,
    }
}

/// Prompts for the local wallet that signs and pays gas.
pub async fn choose_self_signer(ctx: &SessionContext) -> Option<FeeStrategy> {
    let mut menu = Menu::new("Select a wallet to sign and pay gas");
    for wallet in &ctx.signer_wallets {
        menu = menu.entry(
            Some(wallet.clone()),
            wallet.name.clone(),
            Some(address::shorten(&wallet.public_address)),
            true,
        );
    }
    menu = menu.choice(None, "Back");
    let signer = menu.run(ctx.prompter()).await.flatten()?;
    Some(FeeStrategy::SelfSigned { signer })
}

/// Resolves the fee strategy for `inputs`. `None` when the user backs out,
/// which leaves any current strategy in place.
pub async fn resolve_fee(
    ctx: &SessionContext,
    tx_type: TransactionType,
    inputs: &TxInputs,
    current: Option<&FeeStrategy>,
) -> Option<FeeStrategy> {
    let current_token = match current {
        Some(FeeStrategy::Broadcasted { fee_token, .. }) => Some(fee_token.token.address.clone()),
        _ => None,
    };

    loop {
        let mut menu = Menu::new("How should gas be paid?");
        for token in fee_tokens(ctx, inputs) {
            let hint = current_token
                .as_deref()
                .filter(|t| address::normalize(t) == address::normalize(&token.address))
                .map(|_| "current".to_string());
            let label = format!("Pay broadcaster in {}", token.symbol);
            menu = menu.entry(FeeChoice::Token(token), label, hint, true);
        }
        let self_hint = current
            .and_then(FeeStrategy::signer)
            .map(|s| format!("current: {}", s.name));
        menu = menu
            .entry(FeeChoice::SelfSign, "Self Sign Transaction", self_hint, true)
            .choice(FeeChoice::Back, "Back");

        match menu.run(ctx.prompter()).await {
            None | Some(FeeChoice::Back) => return None,
            Some(FeeChoice::SelfSign) => {
                if let Some(fee) = choose_self_signer(ctx).await {
                    return Some(fee);
                }
            }
            Some(FeeChoice::Token(token)) => {
                match choose_broadcaster(ctx, tx_type, &token, None).await {
                    BroadcasterOutcome::Chosen(fee) => return Some(fee),
                    BroadcasterOutcome::Back => {}
                    BroadcasterOutcome::Unavailable => {
                        if let Some(fee) = choose_self_signer(ctx).await {
                            return Some(fee);
                        }
                    }
                }
            }
        }
    }
}

/// Picks another broadcaster for the same fee token, excluding the one
/// that failed. `None` if there is none or the user backs out.
pub async fn choose_other_broadcaster(
    ctx: &SessionContext,
    tx_type: TransactionType,
    current: &FeeStrategy,
) -> Option<FeeStrategy> {
    let FeeStrategy::Broadcasted {
        broadcaster,
        fee_token,
    } = current
    else {
        return None;
    };
    match choose_broadcaster(
        ctx,
        tx_type,
        &fee_token.token,
        Some(&broadcaster.railgun_address),
    )
    .await
    {
        BroadcasterOutcome::Chosen(fee) => Some(fee),
        BroadcasterOutcome::Back | BroadcasterOutcome::Unavailable => None,
    }
}
