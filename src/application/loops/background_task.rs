use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to a spawned background task that can be asked to stop.
///
/// Dropping the handle also signals the task to stop.
#[derive(Debug)]
pub struct BackgroundTask {
    name: &'static str,
    cancel_tx: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

/// Receiving end of a [`BackgroundTask`] cancel signal.
#[derive(Debug, Clone)]
pub struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
    /// resolves once cancellation is requested or the handle is gone
    pub async fn cancelled(&mut self) {
        while !*self.0.borrow_and_update() {
            if self.0.changed().await.is_err() {
                return;
            }
        }
    }
}

impl BackgroundTask {
    /// spawns `task`, handing it the token it must watch
    pub fn spawn<F, Fut>(name: &'static str, task: F) -> Self
    where
        F: FnOnce(CancelToken) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let join = tokio::spawn(task(CancelToken(cancel_rx)));
        debug!("spawned background task {}", name);
        Self {
            name,
            cancel_tx,
            join: Some(join),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// signals the task and waits for it to end
    pub async fn stop(mut self) {
        let _ = self.cancel_tx.send(true);
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                tracing::warn!("background task {} ended abnormally: {}", self.name, e);
            }
        }
        debug!("stopped background task {}", self.name);
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        let _ = self.cancel_tx.send(true);
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
    async fn stop_ends_a_waiting_task() {
        let task = BackgroundTask::spawn("idle", |mut cancel| async move {
            cancel.cancelled().await;
        });
        assert!(!task.is_finished());

        tokio::time::timeout(Duration::from_secs(5), task.stop())
            .await
            .unwrap();
    }
}
