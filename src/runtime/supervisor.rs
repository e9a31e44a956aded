//! Child-process supervision: launch, bounded wait, cancellation.
//!
//! Every launch registers the child in the shared process table under its
//! node identifier; every terminal path (completion, timeout, error,
//! cancellation) removes the entry and deletes the transient unit file.
//! Children run in their own process group so termination reaches their
//! descendants too.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::cleanup::{remove_file_with_retries, CleanupOutcome};
use super::table::{ProcessTable, RunningProcess};
use super::{parse_unit_output, ExecutionResult, NodeExecutor, NodeSpec};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::unit::{build_unit, InvocationUnit};

/// Report of a `cancel_all` sweep.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CancelSummary {
    pub terminated_count: usize,
    pub cleaned_file_count: usize,
}

/// A launched, registered child awaiting supervision.
pub struct LaunchHandle {
    pub(crate) node_id: String,
    pub(crate) child: Child,
    pub(crate) unit_path: PathBuf,
}

#[derive(Clone)]
pub struct Supervisor {
    pub(crate) config: EngineConfig,
    pub(crate) table: Arc<ProcessTable>,
}

impl Supervisor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            table: Arc::new(ProcessTable::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Nodes currently tracked in the running-process table.
    pub fn running_nodes(&self) -> Vec<String> {
        self.table
            .snapshot()
            .into_iter()
            .map(|(node_id, _)| node_id)
            .collect()
    }

    /// Persist the unit to a node-scoped transient file and start it as a
    /// child process, registering it in the table.
    pub async fn launch(
        &self,
        node_id: &str,
        script_path: &Path,
        unit: &InvocationUnit,
    ) -> Result<LaunchHandle, EngineError> {
        let unit_path = self.persist_unit(node_id, &unit.source)?;

        let mut cmd = Command::new(&self.config.python_bin);
        cmd.arg("-u")
            .arg(&unit_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        cmd.process_group(0);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                remove_file_with_retries(&unit_path, &self.config.cleanup).await;
                return Err(EngineError::Launch(format!(
                    "{}: {e}",
                    self.config.python_bin
                )));
            }
        };
        let pid = child.id().unwrap_or_default();

        self.table.register(
            node_id,
            RunningProcess {
                pid,
                started_at: Instant::now(),
                script_path: script_path.to_path_buf(),
                unit_path: unit_path.clone(),
            },
        );
        debug!(node_id, pid, unit = %unit_path.display(), "launched invocation unit");

        Ok(LaunchHandle {
            node_id: node_id.to_string(),
            child,
            unit_path,
        })
    }

    /// Block until the child exits or the configured timeout elapses. On
    /// timeout the whole process group is terminated. The table entry is
    /// removed and the unit file cleaned on every path out of here.
    pub async fn await_result(&self, handle: LaunchHandle) -> ExecutionResult {
        let LaunchHandle {
            node_id,
            mut child,
            unit_path,
        } = handle;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_task = tokio::spawn(read_stream(stdout));
        let err_task = tokio::spawn(read_stream(stderr));

        let result = match timeout(self.config.node_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let stdout = out_task.await.unwrap_or_default();
                let stderr = err_task.await.unwrap_or_default();
                parse_unit_output(&stdout, &stderr, status.success())
            }
            Ok(Err(e)) => ExecutionResult::failure(
                EngineError::Process(format!("failed to wait for child: {e}")).to_string(),
            ),
            Err(_) => {
                let secs = self.config.node_timeout.as_secs();
                warn!(node_id, secs, "node exceeded its wall-clock budget, killing");
                if let Some(pid) = child.id() {
                    kill_process_tree(pid, self.config.kill_grace).await;
                }
                let _ = child.kill().await;
                let _ = child.wait().await;
                ExecutionResult::failure(EngineError::Timeout(secs).to_string())
            }
        };

        self.table.unregister(&node_id);
        remove_file_with_retries(&unit_path, &self.config.cleanup).await;
        result
    }

    /// Terminate every tracked process (and its descendants) and clean up
    /// their unit files. Best effort across all nodes; cleanup failures are
    /// logged, never raised.
    pub async fn cancel_all(&self) -> CancelSummary {
        let mut summary = CancelSummary::default();
        for (node_id, entry) in self.table.drain() {
            if kill_process_tree(entry.pid, self.config.kill_grace).await {
                info!(node_id, pid = entry.pid, "terminated running process");
                summary.terminated_count += 1;
            }
            match remove_file_with_retries(&entry.unit_path, &self.config.cleanup).await {
                CleanupOutcome::Removed => summary.cleaned_file_count += 1,
                CleanupOutcome::Missing | CleanupOutcome::Failed => {}
            }
        }
        summary
    }

    fn persist_unit(&self, node_id: &str, source: &str) -> Result<PathBuf, EngineError> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("flowrun-{node_id}-"))
            .suffix(".py")
            .tempfile()
            .map_err(|e| EngineError::Launch(format!("failed to create unit file: {e}")))?;
        file.write_all(source.as_bytes())
            .map_err(|e| EngineError::Launch(format!("failed to write unit file: {e}")))?;
        file.into_temp_path()
            .keep()
            .map_err(|e| EngineError::Launch(format!("failed to persist unit file: {e}")))
    }
}

#[async_trait]
impl NodeExecutor for Supervisor {
    /// Full single-node invocation: read, analyze, build the unit, launch,
    /// await. Analysis and missing-argument errors surface before any
    /// process is spawned.
    async fn execute(&self, spec: &NodeSpec) -> Result<ExecutionResult, EngineError> {
        let source = tokio::fs::read_to_string(&spec.script_path).await?;
        let unit = build_unit(
            &source,
            &spec.script_path,
            &spec.call_arguments,
            &spec.input_values,
        )?;
        let handle = self
            .launch(&spec.node_id, &spec.script_path, &unit)
            .await?;
        Ok(self.await_result(handle).await)
    }
}

pub(crate) async fn read_stream(stream: Option<impl tokio::io::AsyncRead + Unpin>) -> String {
    let mut out = String::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_string(&mut out).await;
    }
    out
}

/// Terminate a process and its descendants: TERM to the process group, a
/// grace period, then KILL for survivors. Returns whether the process was
/// alive when the sweep started.
#[cfg(unix)]
pub(crate) async fn kill_process_tree(pid: u32, grace: Duration) -> bool {
    if !is_pid_alive(pid) {
        return false;
    }
    signal_group(pid, libc::SIGTERM);

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if !is_pid_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    if is_pid_alive(pid) {
        signal_group(pid, libc::SIGKILL);
    }
    true
}

#[cfg(not(unix))]
pub(crate) async fn kill_process_tree(_pid: u32, _grace: Duration) -> bool {
    false
}

/// Signal the whole process group (children included); falls back to the
/// single process if it leads no group.
#[cfg(unix)]
fn signal_group(pid: u32, sig: libc::c_int) {
    let pid = pid as libc::pid_t;
    unsafe {
        if libc::kill(-pid, sig) != 0 {
            libc::kill(pid, sig);
        }
    }
}

/// kill(pid, 0) probes for existence without sending a signal.
#[cfg(unix)]
pub(crate) fn is_pid_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
pub(crate) fn is_pid_alive(_pid: u32) -> bool {
    false
}
