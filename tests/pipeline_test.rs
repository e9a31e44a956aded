mod common;

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use flowrun::error::EngineError;
use flowrun::pipeline::{run_pipeline, PipelineStatus};
use flowrun::runtime::{ExecutionResult, NodeExecutor, NodeSpec};

/// Scripted stand-in for the process supervisor: succeeds unless the node is
/// listed, and records invocation order.
struct MockExecutor {
    fail_on: Vec<String>,
    error_on: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MockExecutor {
    fn new() -> Self {
        Self {
            fail_on: Vec::new(),
            error_on: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NodeExecutor for MockExecutor {
    async fn execute(&self, spec: &NodeSpec) -> Result<ExecutionResult, EngineError> {
        self.calls.lock().unwrap().push(spec.node_id.clone());
        if self.error_on.contains(&spec.node_id) {
            return Err(EngineError::Launch("interpreter vanished".to_string()));
        }
        if self.fail_on.contains(&spec.node_id) {
            return Ok(ExecutionResult::failure("script raised"));
        }
        Ok(ExecutionResult {
            success: true,
            return_value: json!(spec.node_id.clone()),
            ..Default::default()
        })
    }
}

fn spec(node_id: &str, script_path: PathBuf) -> NodeSpec {
    NodeSpec {
        node_id: node_id.to_string(),
        name: Some(format!("node {node_id}")),
        script_path,
        call_arguments: Default::default(),
        input_values: Vec::new(),
    }
}

fn three_specs(dir: &std::path::Path) -> Vec<NodeSpec> {
    ["a", "b", "c"]
        .into_iter()
        .map(|id| {
            let path = common::write_script(dir, &format!("{id}.py"), "def f():\n    return 1\n");
            spec(id, path)
        })
        .collect()
}

#[tokio::test]
async fn test_all_nodes_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let executor = MockExecutor::new();

    let outcome = run_pipeline(&executor, &three_specs(dir.path())).await.unwrap();
    assert_eq!(outcome.status, PipelineStatus::Success);
    assert_eq!(outcome.total_nodes, 3);
    assert_eq!(outcome.completed_nodes, 3);
    assert!(outcome.failed_at_index.is_none());
    assert_eq!(executor.calls(), vec!["a", "b", "c"]);
    assert_eq!(outcome.results[2].result.return_value, json!("c"));
}

#[tokio::test]
async fn test_pipeline_stops_at_the_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut executor = MockExecutor::new();
    executor.fail_on.push("b".to_string());

    let outcome = run_pipeline(&executor, &three_specs(dir.path())).await.unwrap();
    assert_eq!(outcome.status, PipelineStatus::Failed);
    assert_eq!(outcome.failed_at_index, Some(1));
    assert_eq!(outcome.completed_nodes, 2);
    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.message.contains("node b"));
    // The downstream node is never invoked.
    assert_eq!(executor.calls(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_executor_errors_mark_the_pipeline_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut executor = MockExecutor::new();
    executor.error_on.push("a".to_string());

    let outcome = run_pipeline(&executor, &three_specs(dir.path())).await.unwrap();
    assert_eq!(outcome.status, PipelineStatus::Error);
    assert_eq!(outcome.failed_at_index, Some(0));
    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.results[0]
        .result
        .error
        .as_deref()
        .unwrap()
        .contains("interpreter vanished"));
}

#[tokio::test]
async fn test_missing_script_is_an_error_without_invoking_the_executor() {
    let dir = tempfile::tempdir().unwrap();
    let mut specs = three_specs(dir.path());
    specs[1].script_path = dir.path().join("ghost.py");

    let executor = MockExecutor::new();
    let outcome = run_pipeline(&executor, &specs).await.unwrap();
    assert_eq!(outcome.status, PipelineStatus::Error);
    assert_eq!(outcome.failed_at_index, Some(1));
    assert_eq!(executor.calls(), vec!["a"]);
    assert!(outcome.results[1]
        .result
        .error
        .as_deref()
        .unwrap()
        .contains("script not found"));
}

#[tokio::test]
async fn test_empty_pipeline_is_rejected() {
    let executor = MockExecutor::new();
    let err = run_pipeline(&executor, &[]).await.unwrap_err();
    assert!(matches!(err, EngineError::Pipeline(_)));
    assert!(err.to_string().contains("no nodes provided"));
}
