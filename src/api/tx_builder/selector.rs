//! interactive collection of tokens, amounts and recipients.
//!
//! selections are consolidated on the way out, so a token sent twice to the
//! same recipient reaches later steps as one summed entry.

use tracing::debug;

use super::error::SelectionError;
use super::state::TxInputs;
use crate::api::collaborators::prompt::input_until_valid;
use crate::api::collaborators::prompt::Menu;
use crate::api::collaborators::prompt::Notice;
use crate::api::collaborators::Prompter;
use crate::application::session::SessionContext;
use crate::models::address;
use crate::models::amount::format_units;
use crate::models::amount::parse_units;
use crate::models::amount::SelectedAmount;
use crate::models::amount::TokenBalance;
use crate::models::amount::TokenInfo;
use crate::models::swap::SwapRequest;

/// The address format a recipient must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    Shielded,
    Public,
}

impl RecipientKind {
    fn validate(self, input: &str) -> Result<String, String> {
        let input = input.trim();
        match self {
            Self::Shielded if address::is_shielded_address(input) => Ok(input.to_string()),
            Self::Shielded => Err(format!(
                "Enter a shielded address starting with {}",
                address::SHIELDED_ADDRESS_PREFIX
            )),
            Self::Public if address::is_public_address(input) => Ok(input.to_string()),
            Self::Public => Err("Enter a public 0x address of 40 hex digits".to_string()),
        }
    }
}

/// What the amount selector offers and accepts.
#[derive(Debug, Clone)]
pub struct AmountRequest {
    pub balances: Vec<TokenBalance>,
    pub recipient: RecipientKind,

    /// prefilled recipient, eg the wallet's own shielded address when shielding
    pub default_recipient: Option<String>,

    /// only one (token, amount, recipient) entry is allowed
    pub single_entry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmountChoice {
    Token(usize),
    Clear,
    Done,
}

pub(crate) async fn shielded_balances(
    ctx: &SessionContext,
    base_only: bool,
) -> Result<Vec<TokenBalance>, SelectionError> {
    let balances = ctx
        .collaborators
        .engine
        .shielded_balances(ctx.chain, &ctx.wallet.wallet_id)
        .await
        .map_err(SelectionError::Balances)?;
    let wrapped = address::normalize(&ctx.chain.wrapped_base_token().address);
    Ok(balances
        .into_iter()
        .filter(|b| !base_only || address::normalize(&b.token.address) == wrapped)
        .collect())
}

/// public ERC-20 balances, plus the native token when `with_native`
pub(crate) async fn public_balances(
    ctx: &SessionContext,
    with_native: bool,
) -> Result<Vec<TokenBalance>, SelectionError> {
    let provider = &ctx.collaborators.provider;
    let mut balances = provider
        .public_balances(ctx.chain, &ctx.wallet.public_address)
        .await
        .map_err(SelectionError::Balances)?;
    if with_native {
        balances.insert(0, native_balance(ctx).await?);
    }
    Ok(balances)
}

pub(crate) async fn native_balance(ctx: &SessionContext) -> Result<TokenBalance, SelectionError> {
    let amount = ctx
        .collaborators
        .provider
        .balance(ctx.chain, &ctx.wallet.public_address)
        .await
        .map_err(SelectionError::Balances)?;
    Ok(TokenBalance {
        token: ctx.chain.native_token(),
        amount,
    })
}

fn selected_of(entries: &[SelectedAmount], token: &TokenInfo) -> u128 {
    entries
        .iter()
        .filter(|e| address::normalize(&e.token_address) == address::normalize(&token.address))
        .fold(0u128, |sum, e| sum.saturating_add(e.amount))
}

fn summary(entries: &[SelectedAmount]) -> String {
    if entries.is_empty() {
        return "Nothing selected yet".to_string();
    }
    entries
        .iter()
        .map(|e| {
            format!(
                "{} -> {}",
                e.display_amount(),
                address::shorten(&e.recipient_address)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn prompt_amount(prompter: &dyn Prompter, token: &TokenInfo, available: u128) -> Option<u128> {
    let message = format!(
        "Amount of {} (max {})",
        token.symbol,
        format_units(available, token.decimals)
    );
    input_until_valid(prompter, &message, None, |raw| {
        let amount = parse_units(raw, token.decimals).map_err(|e| e.to_string())?;
        if amount == 0 {
            return Err("Amount must be greater than zero".to_string());
        }
        if amount > available {
            return Err(format!(
                "Only {} {} available",
                format_units(available, token.decimals),
                token.symbol
            ));
        }
        Ok(amount)
    })
    .await
}

async fn prompt_recipient(
    prompter: &dyn Prompter,
    kind: RecipientKind,
    default: Option<&str>,
) -> Option<String> {
    input_until_valid(prompter, "Recipient address", default, |raw| kind.validate(raw)).await
}

/// Collects (token, amount, recipient) entries until the user is done.
///
/// Starts from `prior` when re-editing. `Ok(None)` means the user backed out
/// and the previous selection stands.
pub async fn select_amounts(
    ctx: &SessionContext,
    request: &AmountRequest,
    prior: Option<&TxInputs>,
) -> Result<Option<TxInputs>, SelectionError> {
    let balances = request
        .balances
        .iter()
        .filter(|b| b.amount > 0)
        .cloned()
        .collect::<Vec<_>>();
    if balances.is_empty() {
        let symbols = request
            .balances
            .iter()
            .map(|b| b.token.symbol.as_str())
            .collect::<Vec<_>>();
        let what = if symbols.is_empty() {
            "token".to_string()
        } else {
            symbols.join("/")
        };
        return Err(SelectionError::NoBalance(what));
    }

    let prompter = ctx.prompter();
    let mut entries = match prior {
        Some(TxInputs::Amounts(amounts)) => amounts.clone(),
        _ => vec![],
    };

    loop {
        let full = request.single_entry && !entries.is_empty();
        let mut menu = Menu::new("Select a token").header(summary(&entries));
        for (i, balance) in balances.iter().enumerate() {
            let remaining = balance
                .amount
                .saturating_sub(selected_of(&entries, &balance.token));
            menu = menu.entry(
                AmountChoice::Token(i),
                balance.token.symbol.clone(),
                Some(format!(
                    "{} available",
                    format_units(remaining, balance.token.decimals)
                )),
                remaining > 0 && !full,
            );
        }
        menu = menu
            .entry(AmountChoice::Clear, "Clear Selections", None, !entries.is_empty())
            .entry(AmountChoice::Done, "Done", None, !entries.is_empty());

        match menu.run(prompter).await {
            None => return Ok(None),
            Some(AmountChoice::Done) => {
                debug!("selected {} entr(ies)", entries.len());
                return TxInputs::amounts(&entries)
                    .map(Some)
                    .ok_or(SelectionError::Overflow);
            }
            Some(AmountChoice::Clear) => entries.clear(),
            Some(AmountChoice::Token(i)) => {
                let balance = &balances[i];
                let remaining = balance
                    .amount
                    .saturating_sub(selected_of(&entries, &balance.token));
                let Some(amount) = prompt_amount(prompter, &balance.token, remaining).await
                else {
                    continue;
                };
                let Some(recipient) = prompt_recipient(
                    prompter,
                    request.recipient,
                    request.default_recipient.as_deref(),
                )
                .await
                else {
                    continue;
                };
                entries.push(SelectedAmount::new(&balance.token, amount, recipient));
            }
        }
    }
}

/// Picks sell token, amount and buy token, then fetches and confirms a quote.
///
/// A private swap sells from the shielded balance and returns the proceeds
/// to the wallet's shielded address; a public swap trades from the public
/// wallet.
pub async fn select_swap(
    ctx: &SessionContext,
    private: bool,
) -> Result<Option<TxInputs>, SelectionError> {
    let prompter = ctx.prompter();
    let (balances, recipient, extra_buy) = if private {
        (
            shielded_balances(ctx, false).await?,
            ctx.wallet.shielded_address.clone(),
            ctx.chain.wrapped_base_token(),
        )
    } else {
        (
            public_balances(ctx, true).await?,
            ctx.wallet.public_address.clone(),
            ctx.chain.native_token(),
        )
    };
    let balances = balances
        .into_iter()
        .filter(|b| b.amount > 0)
        .collect::<Vec<_>>();
    if balances.is_empty() {
        return Err(SelectionError::NoBalance("token".to_string()));
    }

    let mut sell_menu = Menu::new("Select a token to sell");
    for (i, balance) in balances.iter().enumerate() {
        sell_menu = sell_menu.entry(
            i,
            balance.token.symbol.clone(),
            Some(format!(
                "{} available",
                format_units(balance.amount, balance.token.decimals)
            )),
            true,
        );
    }
    let Some(sell_index) = sell_menu.run(prompter).await else {
        return Ok(None);
    };
    let sell = &balances[sell_index];
    let Some(sell_amount) = prompt_amount(prompter, &sell.token, sell.amount).await else {
        return Ok(None);
    };

    let mut candidates = balances
        .iter()
        .map(|b| b.token.clone())
        .collect::<Vec<_>>();
    candidates.push(extra_buy);
    let mut seen = vec![address::normalize(&sell.token.address)];
    let mut buy_menu = Menu::new("Select a token to buy");
    for token in candidates {
        let key = address::normalize(&token.address);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        let label = token.symbol.clone();
        buy_menu = buy_menu.choice(token, label);
    }
    if buy_menu.is_empty() {
        prompter.notify(Notice::Warning, "No other token to swap into");
        return Ok(None);
    }
    let Some(buy_token) = buy_menu.run(prompter).await else {
        return Ok(None);
    };

    let request = SwapRequest {
        sell_token: sell.token.clone(),
        buy_token,
        sell_amount,
        slippage_bps: ctx.settings.swap_slippage_bps,
        private,
    };
    let quote = ctx
        .collaborators
        .quoter
        .quote(ctx.chain, &request)
        .await
        .map_err(SelectionError::Quote)?;

    prompter.notify(Notice::Info, &quote.describe());
    if !prompter.confirm("Accept this quote?").await {
        return Ok(None);
    }

    let funding = SelectedAmount::new(&sell.token, sell_amount, recipient);
    Ok(Some(TxInputs::Swap { quote, funding }))
}

/// Prompts for a memo, trimmed. `None` if cancelled; an empty memo clears it.
pub async fn prompt_memo(prompter: &dyn Prompter, current: Option<&str>) -> Option<String> {
    let raw = prompter
        .input("Memo (leave empty for none)", current)
        .await?;
    Some(raw.trim().to_string())
}
