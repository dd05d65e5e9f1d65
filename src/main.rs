use std::fs::OpenOptions;
use std::process;
use std::sync::Mutex;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use shielded_terminal::application::config::cli_args;
use shielded_terminal::application::config::data_directory::DataDirectory;
use shielded_terminal::application::ui::set_panic_hook;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;

pub fn main() -> Result<()> {
    let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()
        .context("Could not create tokio runtime")?;

    let run_result = tokio_runtime.block_on(async {
        // Fetch the CLI arguments
        let args = cli_args::Args::parse();

        #[cfg(not(feature = "tokio-console"))]
        {
            use std::io::Write;
            if args.tokio_console {
                let mut stderr = std::io::BufWriter::new(std::io::stderr().lock());
                writeln!(stderr, "tokio-console support not included in this build.")?;
                writeln!(stderr, "To use the tokio-console command-line argument,")?;
                writeln!(stderr, "please build with the tokio-console feature-flag.")?;
                stderr.flush()?;
                anyhow::bail!("tokio-console not included. Build with tokio-console feature-flag.");
            }

            set_up_logger(&args).await?;
        }

        #[cfg(feature = "tokio-console")]
        if args.tokio_console {
            console_subscriber::init();
        } else {
            set_up_logger(&args).await?;
        }

        set_panic_hook();
        Ok(shielded_terminal::initialize(args).await?.run().await)
    });

    tokio_runtime.shutdown_timeout(tokio::time::Duration::from_secs(10));

    process::exit(run_result?)
}

/// Configure logger to use ISO-8601, of which rfc3339 is a subset. Install
/// global collector configured based on RUST_LOG env var. Accepted `RUST_LOG`
/// values are `trace`, `debug`, `info`, `warn`, and `error`.
///
/// The terminal belongs to the menus, so log lines go to a file in the data
/// directory.
async fn set_up_logger(args: &cli_args::Args) -> Result<()> {
    let data_directory = DataDirectory::get(args.data_dir.clone(), args.chain)?;
    DataDirectory::create_dir_if_not_exists(&data_directory.root_dir_path()).await?;
    let log_file_path = data_directory.log_file_path();
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .with_context(|| format!("Could not open log file {}", log_file_path.display()))?;

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_thread_ids(true)
            .with_ansi(false)
            .with_writer(Mutex::new(log_file))
            .finish(),
    )
    .context("Unable to set global default subscriber")
}
