//! periodic shielded balance rescans.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::background_task::BackgroundTask;
use crate::api::collaborators::prompt::Notice;
use crate::api::collaborators::with_timeout;
use crate::api::collaborators::ExternalError;
use crate::api::collaborators::ShieldedEngine;
use crate::application::status::StatusLine;
use crate::models::chain::Chain;

/// marker the engine puts in errors from its legacy event scanner
const V2_EVENTS_MARKER: &str = "V2 events";

const FAILURE_STATUS_TTL: Duration = Duration::from_secs(5);
const SUCCESS_STATUS_TTL: Duration = Duration::from_secs(3);

/// Rescans one wallet's shielded balances.
#[derive(Debug, Clone)]
pub struct BalancePoller {
    pub engine: Arc<dyn ShieldedEngine>,
    pub chain: Chain,
    pub wallet_id: String,
    pub status: StatusLine,
    pub quiet_v2_scan_errors: bool,
}

impl BalancePoller {
    /// Runs one rescan within `limit`. Failures are logged and shown on the
    /// status line, never returned.
    pub async fn refresh(&self, limit: Duration, manual: bool) -> bool {
        if manual {
            self.status
                .set(Notice::Info, "Refreshing balances...", None);
        }
        let result = with_timeout(
            "balance refresh",
            limit,
            self.engine.refresh_balances(self.chain, &self.wallet_id),
        )
        .await;

        match result {
            Ok(()) => {
                debug!("refreshed balances for {} on {}", self.wallet_id, self.chain);
                if manual {
                    self.status
                        .set(Notice::Success, "Balances refreshed", Some(SUCCESS_STATUS_TTL));
                }
                true
            }
            Err(e) => {
                self.report_failure(&e, manual);
                false
            }
        }
    }

    fn report_failure(&self, error: &ExternalError, manual: bool) {
        if error.mentions(V2_EVENTS_MARKER) {
            if self.quiet_v2_scan_errors {
                debug!("balance scan reported a V2 events error: {}", error);
                if manual {
                    self.status.clear();
                }
                return;
            }
            warn!("balance scan reported a V2 events error: {}", error);
        } else {
            warn!("balance refresh failed on {}: {}", self.chain, error);
        }

        let prefix = if manual {
            "Balance refresh failed"
        } else {
            "Background balance refresh failed"
        };
        self.status.set(
            Notice::Error,
            format!("{}: {}", prefix, error.truncated(80)),
            Some(FAILURE_STATUS_TTL),
        );
    }

    /// Rescans every `interval`, each attempt capped at `limit`. A failed or
    /// timed out rescan is reported and the next one is scheduled as usual.
    pub fn spawn(self, interval: Duration, limit: Duration) -> BackgroundTask {
        info!(
            "balance refresh every {} on {}",
            humantime::format_duration(interval),
            self.chain
        );
        BackgroundTask::spawn("balance_poller", move |mut cancel| async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.refresh(limit, false).await;
                    }
                }
            }
        })
    }
}
