//! Streaming execution: stdout relayed line by line while the node runs,
//! followed by exactly one result event.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use super::cleanup::remove_file_with_retries;
use super::supervisor::{read_stream, LaunchHandle, Supervisor};
use super::{parse_unit_output, ExecutionResult, NodeSpec};
use crate::error::EngineError;
use crate::unit::{build_unit, RESULT_END, RESULT_START};

/// One event on a streaming execution channel.
#[derive(Debug, Clone)]
pub enum ExecEvent {
    /// A line of console output, emitted as the child produces it. Lines
    /// belonging to the sentinel result block are not relayed.
    Stdout(String),
    /// The final structured outcome. Always the last event on the channel.
    Result(ExecutionResult),
}

impl Supervisor {
    /// Launch a node and stream its output. The returned channel yields
    /// `Stdout` events while the child runs and closes after the single
    /// terminal `Result` event. Streaming runs are not subject to the
    /// configured timeout; they live until the child exits or is cancelled.
    pub async fn launch_streaming(
        &self,
        spec: &NodeSpec,
    ) -> Result<mpsc::Receiver<ExecEvent>, EngineError> {
        let source = tokio::fs::read_to_string(&spec.script_path).await?;
        let unit = build_unit(
            &source,
            &spec.script_path,
            &spec.call_arguments,
            &spec.input_values,
        )?;
        let handle = self.launch(&spec.node_id, &spec.script_path, &unit).await?;

        let (tx, rx) = mpsc::channel(64);
        let supervisor = self.clone();
        tokio::spawn(async move {
            supervisor.relay(handle, tx).await;
        });
        Ok(rx)
    }

    /// Forward child stdout to the channel, then parse and send the result.
    /// The table entry is removed only once the result is computed, so the
    /// node stays cancellable for its whole lifetime.
    async fn relay(&self, handle: LaunchHandle, tx: mpsc::Sender<ExecEvent>) {
        let LaunchHandle {
            node_id,
            mut child,
            unit_path,
        } = handle;

        let stderr = child.stderr.take();
        let err_task = tokio::spawn(read_stream(stderr));

        let mut collected = String::new();
        let mut in_result_block = false;
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                collected.push_str(&line);
                collected.push('\n');
                if line.trim() == RESULT_START {
                    in_result_block = true;
                    continue;
                }
                if line.trim() == RESULT_END {
                    in_result_block = false;
                    continue;
                }
                if !in_result_block {
                    // Receiver gone means the consumer hung up; keep draining
                    // so the child cannot block on a full pipe.
                    let _ = tx.send(ExecEvent::Stdout(line)).await;
                }
            }
        }

        let exit_ok = match child.wait().await {
            Ok(status) => status.success(),
            Err(_) => false,
        };
        let stderr = err_task.await.unwrap_or_default();
        let result = parse_unit_output(&collected, &stderr, exit_ok);

        self.table.unregister(&node_id);
        remove_file_with_retries(&unit_path, &self.config.cleanup).await;
        debug!(node_id, success = result.success, "streaming node finished");

        let _ = tx.send(ExecEvent::Result(result)).await;
    }
}
