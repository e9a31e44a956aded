use std::time::Duration;

/// Bounded retry-with-backoff for transient-file deletion. A freshly exited
/// child can still hold its unit file briefly on some filesystems.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Linear backoff: `base_delay * (attempt + 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * (attempt + 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Engine-wide settings. One instance is shared by the supervisor and the
/// pipeline runner; CLI flags override the defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interpreter used to run invocation units.
    pub python_bin: String,
    /// Wall-clock budget per node invocation.
    pub node_timeout: Duration,
    /// Grace period between SIGTERM and SIGKILL when terminating a process
    /// group.
    pub kill_grace: Duration,
    /// Cleanup policy for transient unit files.
    pub cleanup: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            python_bin: "python3".to_string(),
            node_timeout: Duration::from_secs(30),
            kill_grace: Duration::from_secs(2),
            cleanup: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = timeout;
        self
    }

    pub fn with_python_bin(mut self, bin: impl Into<String>) -> Self {
        self.python_bin = bin.into();
        self
    }
}
