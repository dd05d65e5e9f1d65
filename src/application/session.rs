//! the explicit context every builder step receives.

use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::Mutex as AsyncMutex;

use crate::api::broadcaster::CustomBroadcasters;
use crate::api::collaborators::BroadcasterNetwork;
use crate::api::collaborators::ChainProvider;
use crate::api::collaborators::Prompter;
use crate::api::collaborators::ShieldedEngine;
use crate::api::collaborators::SwapQuoter;
use crate::application::config::builder_settings::BuilderSettings;
use crate::application::loops::confirmation_watcher::ConfirmationWatcher;
use crate::application::status::StatusLine;
use crate::models::chain::Chain;
use crate::models::encryption_key::EncryptionKey;
use crate::models::fee_strategy::SignerWalletInfo;

/// The external systems a session talks to.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub engine: Arc<dyn ShieldedEngine>,
    pub provider: Arc<dyn ChainProvider>,
    pub relay: Arc<dyn BroadcasterNetwork>,
    pub quoter: Arc<dyn SwapQuoter>,
    pub prompter: Arc<dyn Prompter>,
}

/// The wallet the session spends from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWallet {
    pub name: String,
    pub wallet_id: String,
    pub shielded_address: String,
    pub public_address: String,
}

impl ActiveWallet {
    /// the wallet as a self-signing payer
    pub fn signer(&self) -> SignerWalletInfo {
        SignerWalletInfo {
            name: self.name.clone(),
            wallet_id: self.wallet_id.clone(),
            public_address: self.public_address.clone(),
        }
    }
}

/// The password-derived key, cached between the steps that need it.
#[derive(Debug, Clone, Default)]
pub struct PasswordCache(Arc<Mutex<Option<EncryptionKey>>>);

impl PasswordCache {
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<EncryptionKey>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get(&self) -> Option<EncryptionKey> {
        self.slot().clone()
    }

    pub fn store(&self, key: EncryptionKey) {
        *self.slot() = Some(key);
    }

    /// drops the cached key; the next password step prompts again
    pub fn clear(&self) {
        *self.slot() = None;
    }
}

/// Everything a builder session needs, passed explicitly to every step.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub chain: Chain,
    pub wallet: ActiveWallet,

    /// local wallets that may self-sign, the active one included
    pub signer_wallets: Vec<SignerWalletInfo>,
    pub settings: BuilderSettings,
    pub collaborators: Collaborators,
    pub status: StatusLine,
    pub watcher: Arc<dyn ConfirmationWatcher>,
    pub custom_broadcasters: Arc<AsyncMutex<CustomBroadcasters>>,
    pub password: PasswordCache,
}

impl SessionContext {
    pub fn prompter(&self) -> &dyn Prompter {
        self.collaborators.prompter.as_ref()
    }

    /// the same session on another chain; cached credentials are dropped
    pub fn on_chain(&self, chain: Chain) -> Self {
        Self {
            chain,
            password: PasswordCache::default(),
            ..self.clone()
        }
    }
}
