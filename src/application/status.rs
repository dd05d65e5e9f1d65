//! the one-line status display shared by the menu loop and background tasks.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use tokio::time::Instant;

use crate::api::collaborators::prompt::Notice;

#[derive(Debug, Clone)]
struct StatusEntry {
    text: String,
    level: Notice,
    expires_at: Option<Instant>,
    pinned: bool,
}

impl StatusEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |t| now < t)
    }
}

/// Current status text, with optional expiry.
///
/// A pinned entry (eg a mined transaction link) is not replaced by ordinary
/// updates until it expires.
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    inner: Arc<Mutex<Option<StatusEntry>>>,
}

impl StatusLine {
    fn lock(&self) -> MutexGuard<'_, Option<StatusEntry>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Sets the status unless a live pinned entry is showing.
    pub fn set(&self, level: Notice, text: impl Into<String>, ttl: Option<Duration>) {
        let now = Instant::now();
        let mut entry = self.lock();
        if entry.as_ref().is_some_and(|e| e.pinned && e.is_live(now)) {
            return;
        }
        *entry = Some(StatusEntry {
            text: text.into(),
            level,
            expires_at: ttl.map(|ttl| now + ttl),
            pinned: false,
        });
    }

    /// Sets a status that ordinary updates cannot replace for `ttl`.
    pub fn set_pinned(&self, level: Notice, text: impl Into<String>, ttl: Duration) {
        *self.lock() = Some(StatusEntry {
            text: text.into(),
            level,
            expires_at: Some(Instant::now() + ttl),
            pinned: true,
        });
    }

    /// the live status, dropping it if it has expired
    pub fn current(&self) -> Option<(Notice, String)> {
        let now = Instant::now();
        let mut entry = self.lock();
        match entry.as_ref() {
            Some(e) if e.is_live(now) => Some((e.level, e.text.clone())),
            Some(_) => {
                *entry = None;
                None
            }
            None => None,
        }
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use macro_rules_attr::apply;

    use super::*;
    use crate::tests::shared_tokio_runtime;

    #[test]
    fn status_without_ttl_persists() {
        let status = StatusLine::default();
        status.set(Notice::Info, "Refreshing balances...", None);
        assert_eq!(
            Some((Notice::Info, "Refreshing balances...".to_string())),
            status.current()
        );
    }

    #[apply(shared_tokio_runtime)]
    async fn status_expires_after_ttl() {
        let status = StatusLine::default();
        status.set(Notice::Success, "Balances refreshed", Some(Duration::from_millis(20)));
        assert!(status.current().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(status.current().is_none());
    }

    #[apply(shared_tokio_runtime)]
    async fn pinned_status_blocks_ordinary_updates_until_expiry() {
        let status = StatusLine::default();
        status.set_pinned(Notice::Success, "Transaction Mined", Duration::from_millis(20));
        status.set(Notice::Info, "Refreshing balances...", None);
        assert_eq!("Transaction Mined", status.current().unwrap().1);

        tokio::time::sleep(Duration::from_millis(40)).await;
        status.set(Notice::Info, "Refreshing balances...", None);
        assert_eq!("Refreshing balances...", status.current().unwrap().1);
    }
}
