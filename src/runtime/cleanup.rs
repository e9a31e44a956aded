//! Bounded-retry deletion of transient unit files.

use std::io::ErrorKind;
use std::path::Path;

use tracing::warn;

use crate::config::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed,
    /// Nothing on disk; nothing to do.
    Missing,
    /// Still present after all attempts. Logged by the caller's policy; never
    /// an error.
    Failed,
}

/// Delete `path`, retrying with backoff. A process that exited a moment ago
/// can still hold the file open on some platforms.
pub async fn remove_file_with_retries(path: &Path, policy: &RetryPolicy) -> CleanupOutcome {
    for attempt in 0..policy.attempts {
        match tokio::fs::remove_file(path).await {
            Ok(()) => return CleanupOutcome::Removed,
            Err(e) if e.kind() == ErrorKind::NotFound => return CleanupOutcome::Missing,
            Err(e) => {
                if attempt + 1 < policy.attempts {
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                } else {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to clean up temporary unit file"
                    );
                }
            }
        }
    }
    CleanupOutcome::Failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn removes_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unit.py");
        std::fs::write(&path, "print('x')").unwrap();
        let outcome = remove_file_with_retries(&path, &fast_policy()).await;
        assert_eq!(outcome, CleanupOutcome::Removed);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.py");
        let outcome = remove_file_with_retries(&path, &fast_policy()).await;
        assert_eq!(outcome, CleanupOutcome::Missing);
    }
}
