//! Sequential pipeline execution.
//!
//! Nodes run strictly in order and the pipeline stops at the first node that
//! does not succeed. `failed` marks a node whose process ran and reported
//! failure; `error` marks a node that never produced a result (missing
//! script, analysis failure, launch failure).

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::runtime::{ExecutionResult, NodeExecutor, NodeSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Success,
    Failed,
    Error,
}

/// Outcome of one node within a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRunRecord {
    pub node_id: String,
    pub node_name: String,
    pub script_path: String,
    pub index: usize,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub result: ExecutionResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub execution_id: Uuid,
    pub status: PipelineStatus,
    pub message: String,
    pub results: Vec<NodeRunRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at_index: Option<usize>,
    pub total_nodes: usize,
    pub completed_nodes: usize,
}

/// Run `specs` in order against `executor`, stopping at the first node that
/// fails or errors. An empty pipeline is rejected outright.
pub async fn run_pipeline<E: NodeExecutor>(
    executor: &E,
    specs: &[NodeSpec],
) -> Result<PipelineResult, EngineError> {
    if specs.is_empty() {
        return Err(EngineError::Pipeline(
            "no nodes provided for execution".to_string(),
        ));
    }

    let execution_id = Uuid::new_v4();
    let total_nodes = specs.len();
    info!(%execution_id, total_nodes, "starting pipeline");

    let mut results: Vec<NodeRunRecord> = Vec::with_capacity(total_nodes);
    let mut status = PipelineStatus::Success;
    let mut failed_at_index = None;
    let mut message = format!("all {total_nodes} nodes executed successfully");

    for (index, spec) in specs.iter().enumerate() {
        let name = spec.display_name().to_string();
        info!(%execution_id, index, node = %name, "executing node");

        if !spec.script_path.exists() {
            warn!(%execution_id, index, node = %name, "script not found");
            results.push(record(
                spec,
                index,
                0,
                ExecutionResult::failure(format!(
                    "script not found: {}",
                    spec.script_path.display()
                )),
            ));
            status = PipelineStatus::Error;
            failed_at_index = Some(index);
            message = format!("node '{name}' (index {index}) could not be executed");
            break;
        }

        let started = Instant::now();
        match executor.execute(spec).await {
            Ok(result) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let succeeded = result.success;
                results.push(record(spec, index, elapsed_ms, result));
                if !succeeded {
                    status = PipelineStatus::Failed;
                    failed_at_index = Some(index);
                    message = format!("node '{name}' (index {index}) failed");
                    break;
                }
            }
            Err(e) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                results.push(record(
                    spec,
                    index,
                    elapsed_ms,
                    ExecutionResult::failure(e.to_string()),
                ));
                status = PipelineStatus::Error;
                failed_at_index = Some(index);
                message = format!("node '{name}' (index {index}) could not be executed: {e}");
                break;
            }
        }
    }

    let completed_nodes = results.len();
    info!(%execution_id, ?status, completed_nodes, "pipeline finished");

    Ok(PipelineResult {
        execution_id,
        status,
        message,
        results,
        failed_at_index,
        total_nodes,
        completed_nodes,
    })
}

fn record(spec: &NodeSpec, index: usize, elapsed_ms: u64, result: ExecutionResult) -> NodeRunRecord {
    NodeRunRecord {
        node_id: spec.node_id.clone(),
        node_name: spec.display_name().to_string(),
        script_path: spec.script_path.display().to_string(),
        index,
        elapsed_ms,
        result,
    }
}
