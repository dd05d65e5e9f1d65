use std::time::Duration;

/// A failure reported by an external collaborator.
///
/// Collaborators speak in messages and optional JSON-RPC style codes; the
/// builder classifies them into actionable errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExternalError {
    pub message: String,
    pub code: Option<i64>,
}

impl ExternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    /// the error produced when a call exceeds its time budget
    pub fn timeout(operation: &str, limit: Duration) -> Self {
        Self::new(format!(
            "{} timed out after {}",
            operation,
            humantime::format_duration(limit)
        ))
    }

    /// case-insensitive substring test against the message
    pub fn mentions(&self, needle: &str) -> bool {
        self.message.to_lowercase().contains(&needle.to_lowercase())
    }

    /// the message limited to `max` characters, for status and menu display
    pub fn truncated(&self, max: usize) -> String {
        if self.message.chars().count() <= max {
            return self.message.clone();
        }
        let mut short = self.message.chars().take(max).collect::<String>();
        short.push_str("...");
        short
    }
}

/// Runs `fut` with a time budget, mapping expiry to [`ExternalError::timeout`].
pub async fn with_timeout<T>(
    operation: &str,
    limit: Duration,
    fut: impl std::future::Future<Output = Result<T, ExternalError>>,
) -> Result<T, ExternalError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ExternalError::timeout(operation, limit)),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use macro_rules_attr::apply;

    use super::*;
    use crate::tests::shared_tokio_runtime;

    #[test]
    fn mentions_ignores_case() {
        let err = ExternalError::new("Broadcaster does NOT have enough gas");
        assert!(err.mentions("does not have enough"));
        assert!(!err.mentions("revert"));
    }

    #[test]
    fn truncation_appends_ellipsis() {
        let err = ExternalError::new("abcdefgh");
        assert_eq!("abcd...", err.truncated(4));
        assert_eq!("abcdefgh", err.truncated(8));
    }

    #[apply(shared_tokio_runtime)]
    async fn slow_calls_become_timeout_errors() {
        let result: Result<(), ExternalError> = with_timeout(
            "fee data fetch",
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.mentions("fee data fetch timed out"));
    }
}
