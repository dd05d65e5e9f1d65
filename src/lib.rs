//
// If code coverage tool `cargo-llvm-cov` is running with the nightly toolchain,
// enable the unstable “coverage” attribute. This allows using the annotation
// `#[coverage(off)]` to explicitly exclude certain parts of the code from
// being considered as “code under test.” Most prominently, the annotation
// should be added to every `#[cfg(test)]` module. Since the “coverage”
// feature is enable only conditionally, the annotation to use is:
// `#[cfg_attr(coverage_nightly, coverage(off))]`.
//
// See also:
// - https://github.com/taiki-e/cargo-llvm-cov#exclude-code-from-coverage
// - https://github.com/rust-lang/rust/issues/84605
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod application;
pub mod models;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
pub mod tests;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

use crate::api::broadcaster::settings_menu::publish_preferences;
use crate::api::broadcaster::CustomBroadcasters;
use crate::application::config::builder_settings::BuilderSettings;
use crate::application::config::cli_args;
use crate::application::config::data_directory::DataDirectory;
use crate::application::loops::confirmation_watcher::BackgroundConfirmationWatcher;
use crate::application::loops::main_loop::MainLoop;
use crate::application::loops::shutdown;
use crate::application::loops::shutdown::ShutdownReason;
use crate::application::session::Collaborators;
use crate::application::session::PasswordCache;
use crate::application::session::SessionContext;
use crate::application::simulation;
use crate::application::simulation::SimulatedChain;
use crate::application::simulation::SimulatedEngine;
use crate::application::simulation::SimulatedQuoter;
use crate::application::simulation::SimulatedRelay;
use crate::application::status::StatusLine;
use crate::application::ui::TerminalPrompter;

/// wall time of one simulated proof
const SIMULATED_PROOF_DURATION: Duration = Duration::from_secs(4);

/// delay between submission and the receipt on the simulated chain
const SIMULATED_BLOCK_TIME: Duration = Duration::from_secs(12);

/// A started session, ready to show the main menu.
#[derive(Debug)]
pub struct Session {
    main_loop: MainLoop,
}

impl Session {
    /// Runs the main menu until the user exits or a shutdown signal arrives,
    /// then stops background work. Returns the process exit code.
    pub async fn run(mut self) -> i32 {
        let reason = tokio::select! {
            () = self.main_loop.run() => ShutdownReason::Exit,
            reason = shutdown::signal_received() => reason,
        };
        info!("Session ending: {}.", reason);
        self.main_loop.shutdown().await;
        0
    }
}

fn simulated_collaborators() -> Collaborators {
    let chain = Arc::new(SimulatedChain::default());
    chain.set_auto_mine(true);
    chain.set_block_time(SIMULATED_BLOCK_TIME);

    Collaborators {
        engine: Arc::new(SimulatedEngine::with_proof_duration(SIMULATED_PROOF_DURATION)),
        relay: Arc::new(SimulatedRelay::new(chain.clone())),
        provider: chain,
        quoter: Arc::new(SimulatedQuoter),
        prompter: Arc::new(TerminalPrompter::default()),
    }
}

/// Opens the wallet and its collaborators and starts background work.
pub async fn initialize(cli_args: cli_args::Args) -> Result<Session> {
    if !cli_args.simulate {
        anyhow::bail!(
            "No wallet backend is available in this build. \
             Start with --simulate to use the built-in simulated engine and networks."
        );
    }
    info!("Starting shielded-terminal on {}.", cli_args.chain);

    let data_directory = DataDirectory::get(cli_args.data_dir.clone(), cli_args.chain)?;
    DataDirectory::create_dir_if_not_exists(&data_directory.root_dir_path()).await?;
    info!("Data directory is {}", data_directory.root_dir_path().display());

    let settings = BuilderSettings::from(&cli_args);
    let collaborators = simulated_collaborators();
    let wallet = simulation::simulated_wallet(&cli_args.wallet);
    let status = StatusLine::default();
    let watcher = Arc::new(BackgroundConfirmationWatcher::new(
        collaborators.provider.clone(),
        status.clone(),
        settings.confirmation_timeout,
    ));
    let custom_broadcasters =
        CustomBroadcasters::load(data_directory.custom_broadcasters_file_path()).await;

    let ctx = SessionContext {
        chain: cli_args.chain,
        signer_wallets: simulation::simulated_signers(&wallet),
        wallet,
        settings,
        collaborators,
        status,
        watcher,
        custom_broadcasters: Arc::new(AsyncMutex::new(custom_broadcasters)),
        password: PasswordCache::default(),
    };
    publish_preferences(&ctx).await;

    info!("Opened wallet {} on {}.", ctx.wallet.name, ctx.chain);
    Ok(Session {
        main_loop: MainLoop::start(ctx),
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod lib_tests {
    use clap::Parser;
    use macro_rules_attr::apply;

    use super::*;
    use crate::models::chain::Chain;
    use crate::tests::shared::files::unit_test_dir;
    use crate::tests::shared_tokio_runtime;

    #[apply(shared_tokio_runtime)]
    async fn startup_without_a_backend_names_the_flag() {
        let err = initialize(cli_args::Args::default()).await.unwrap_err();
        assert!(err.to_string().contains("--simulate"));
    }

    #[apply(shared_tokio_runtime)]
    async fn simulated_session_loads_pinned_broadcasters() {
        let data_dir = unit_test_dir();
        let data_dir_arg = data_dir.to_string_lossy().to_string();
        let args = cli_args::Args::parse_from([
            "shielded-terminal",
            "--simulate",
            "--chain",
            "polygon",
            "--data-dir",
            data_dir_arg.as_str(),
        ]);
        let file = DataDirectory::get(Some(data_dir.clone()), args.chain)
            .unwrap()
            .custom_broadcasters_file_path();
        CustomBroadcasters::empty(&file)
            .add(simulation::SIMULATED_BROADCASTERS[2].0)
            .await
            .unwrap();

        let session = initialize(args).await.unwrap();
        let ctx = session.main_loop.context();
        assert_eq!(Chain::Polygon, ctx.chain);
        assert_eq!(2, ctx.signer_wallets.len());
        assert!(ctx
            .custom_broadcasters
            .lock()
            .await
            .contains(simulation::SIMULATED_BROADCASTERS[2].0));
        session.main_loop.shutdown().await;
    }
}
