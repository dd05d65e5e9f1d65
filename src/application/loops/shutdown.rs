//! process signals that end the session.

use tokio::signal;
use tracing::info;
use tracing::warn;

/// What ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ShutdownReason {
    #[strum(to_string = "exit chosen from the main menu")]
    Exit,
    #[strum(to_string = "Ctrl+c")]
    CtrlC,
    #[strum(to_string = "SIGTERM")]
    Terminate,
    #[strum(to_string = "SIGINT")]
    Interrupt,
    #[strum(to_string = "SIGQUIT")]
    Quit,
}

/// Resolves on the first shutdown signal.
///
/// On unix, SIGTERM, SIGINT and SIGQUIT are watched alongside Ctrl+c. A
/// signal that cannot be registered is logged and left unwatched.
pub async fn signal_received() -> ShutdownReason {
    #[cfg(unix)]
    {
        use tokio::signal::unix::signal as unix_signal;
        use tokio::signal::unix::SignalKind;

        let register = |kind: SignalKind, name: &str| match unix_signal(kind) {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!("cannot watch {}: {}", name, e);
                None
            }
        };
        let mut sigterm = register(SignalKind::terminate(), "SIGTERM");
        let mut sigint = register(SignalKind::interrupt(), "SIGINT");
        let mut sigquit = register(SignalKind::quit(), "SIGQUIT");

        let reason = tokio::select! {
            Ok(()) = signal::ctrl_c() => ShutdownReason::CtrlC,
            Some(()) = recv(&mut sigterm) => ShutdownReason::Terminate,
            Some(()) = recv(&mut sigint) => ShutdownReason::Interrupt,
            Some(()) = recv(&mut sigquit) => ShutdownReason::Quit,
            else => std::future::pending::<ShutdownReason>().await,
        };
        info!("Detected {} signal.", reason);
        reason
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            warn!("cannot watch Ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Detected Ctrl+c signal.");
        ShutdownReason::CtrlC
    }
}

/// next delivery of a watched signal; pends forever when it is unwatched
#[cfg(unix)]
async fn recv(stream: &mut Option<signal::unix::Signal>) -> Option<()> {
    match stream {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use macro_rules_attr::apply;

    use super::*;
    use crate::tests::shared_tokio_runtime;

    #[apply(shared_tokio_runtime)]
    async fn no_signal_means_no_shutdown() {
        let waited = tokio::time::timeout(Duration::from_millis(30), signal_received()).await;
        assert!(waited.is_err());
    }

    #[test]
    fn reasons_name_their_signal() {
        assert_eq!("SIGTERM", ShutdownReason::Terminate.to_string());
        assert_eq!("Ctrl+c", ShutdownReason::CtrlC.to_string());
    }
}
