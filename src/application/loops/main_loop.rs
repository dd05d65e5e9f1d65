//! the top level menu.
//!
//! owns the session context and the balance poller. switching chain swaps
//! both: the poller is stopped, the context is rebuilt for the new chain
//! and a fresh poller is started once the first rescan finishes.

use std::time::Duration;

use itertools::Itertools;
use strum::IntoEnumIterator;
use tracing::info;
use tracing::warn;

use super::background_task::BackgroundTask;
use super::balance_poller::BalancePoller;
use crate::api::broadcaster::settings_menu::run_settings_menu;
use crate::api::collaborators::prompt::Menu;
use crate::api::collaborators::with_timeout;
use crate::api::tx_builder::run_builder;
use crate::application::session::SessionContext;
use crate::models::address;
use crate::models::amount::format_units;
use crate::models::chain::Chain;
use crate::models::transaction_type::TransactionType;

/// how long the balance summary in the menu header may take
const BALANCE_SUMMARY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MainAction {
    Build(TransactionType),
    RefreshBalances,
    BroadcasterSettings,
    SwitchChain,
    Exit,
}

impl std::fmt::Display for MainAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build(tx_type) => write!(f, "{}", tx_type),
            Self::RefreshBalances => write!(f, "Refresh Balances"),
            Self::BroadcasterSettings => write!(f, "Broadcaster Settings"),
            Self::SwitchChain => write!(f, "Switch Chain"),
            Self::Exit => write!(f, "Exit"),
        }
    }
}

/// The interactive session between startup and shutdown.
#[derive(Debug)]
pub struct MainLoop {
    ctx: SessionContext,
    poller: Option<BackgroundTask>,
}

impl MainLoop {
    /// takes over `ctx` and starts its background balance poller
    pub fn start(ctx: SessionContext) -> Self {
        let poller = Some(Self::spawn_poller(&ctx));
        Self { ctx, poller }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    fn balance_poller(ctx: &SessionContext) -> BalancePoller {
        BalancePoller {
            engine: ctx.collaborators.engine.clone(),
            chain: ctx.chain,
            wallet_id: ctx.wallet.wallet_id.clone(),
            status: ctx.status.clone(),
            quiet_v2_scan_errors: ctx.settings.quiet_v2_scan_errors,
        }
    }

    fn spawn_poller(ctx: &SessionContext) -> BackgroundTask {
        Self::balance_poller(ctx).spawn(
            ctx.settings.balance_refresh_interval,
            ctx.settings.balance_refresh_timeout,
        )
    }

    async fn header(&self) -> String {
        let ctx = &self.ctx;
        let balances = with_timeout(
            "balance summary",
            BALANCE_SUMMARY_TIMEOUT,
            ctx.collaborators
                .engine
                .shielded_balances(ctx.chain, &ctx.wallet.wallet_id),
        )
        .await;
        let balances = match balances {
            Ok(balances) if balances.is_empty() => "No shielded balances".to_string(),
            Ok(balances) => balances
                .iter()
                .map(|b| {
                    format!(
                        "{} {}",
                        format_units(b.amount, b.token.decimals),
                        b.token.symbol
                    )
                })
                .join(", "),
            Err(e) => {
                warn!("could not read shielded balances: {}", e);
                "Shielded balances unavailable".to_string()
            }
        };

        let mut lines = vec![
            format!(
                "{} [{}] on {}",
                ctx.wallet.name,
                address::shorten(&ctx.wallet.shielded_address),
                ctx.chain.display_name()
            ),
            balances,
        ];
        if let Some((level, text)) = ctx.status.current() {
            lines.push(format!("{}: {}", level, text));
        }
        lines.join("\n")
    }

    /// Shows the main menu until the user exits.
    pub async fn run(&mut self) {
        loop {
            let menu = TransactionType::iter()
                .map(MainAction::Build)
                .chain([
                    MainAction::RefreshBalances,
                    MainAction::BroadcasterSettings,
                    MainAction::SwitchChain,
                    MainAction::Exit,
                ])
                .fold(
                    Menu::new("What would you like to do?").header(self.header().await),
                    |menu, action| menu.choice(action, action.to_string()),
                );

            match menu.run(self.ctx.prompter()).await {
                Some(MainAction::Build(tx_type)) => {
                    if let Some(submitted) = run_builder(&self.ctx, tx_type).await {
                        info!("{} submitted as {}", tx_type, submitted.tx_hash);
                    }
                }
                Some(MainAction::RefreshBalances) => {
                    Self::balance_poller(&self.ctx)
                        .refresh(self.ctx.settings.manual_refresh_timeout, true)
                        .await;
                }
                Some(MainAction::BroadcasterSettings) => run_settings_menu(&self.ctx).await,
                Some(MainAction::SwitchChain) => self.switch_chain().await,
                Some(MainAction::Exit) | None => {
                    info!("main menu closed");
                    return;
                }
            }
        }
    }

    async fn switch_chain(&mut self) {
        let current = self.ctx.chain;
        let menu = Chain::iter()
            .filter(|c| *c != current)
            .fold(Menu::new("Switch to which chain?"), |menu, chain| {
                menu.choice(Some(chain), chain.display_name())
            })
            .choice(None, "Back");
        let Some(Some(chain)) = menu.run(self.ctx.prompter()).await else {
            return;
        };

        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        info!("switching from {} to {}", current, chain);
        self.ctx = self.ctx.on_chain(chain);
        Self::balance_poller(&self.ctx)
            .refresh(self.ctx.settings.chain_switch_timeout, true)
            .await;
        self.poller = Some(Self::spawn_poller(&self.ctx));
    }

    /// Stops the poller and the collaborators' background work.
    pub async fn shutdown(mut self) {
        info!("Shutdown initiated.");
        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        self.ctx.collaborators.engine.shutdown().await;
        self.ctx.collaborators.relay.shutdown().await;
        info!("Shutdown completed.");
    }
}
