//! Process-backed execution of invocation units.

pub mod cleanup;
pub mod stream;
pub mod supervisor;
pub mod table;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::unit::{CallArguments, InputValues, RESULT_END, RESULT_START};

/// Structured outcome of one node invocation. The field shape matches the
/// JSON object a unit prints between the sentinel markers, so a well-formed
/// sentinel block deserializes straight into this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub return_value: Value,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
    /// Echo of the keyword arguments the unit was invoked with.
    #[serde(default)]
    pub function_args: Value,
    /// Echo of the substitute input values, for traceability.
    #[serde(default)]
    pub input_values: Value,
}

impl ExecutionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// One node invocation request, as supplied by the external caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub node_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub script_path: PathBuf,
    #[serde(default)]
    pub call_arguments: CallArguments,
    /// Ordered `[name, value]` pairs; consumed positionally.
    #[serde(default)]
    pub input_values: InputValues,
}

impl NodeSpec {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.node_id)
    }
}

/// Seam between the pipeline runner and the process supervisor, so pipeline
/// semantics can be exercised against a test double.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(&self, spec: &NodeSpec) -> Result<ExecutionResult, EngineError>;
}

/// Extract the sentinel-delimited result block from captured output.
///
/// A well-formed block becomes the result, with the surrounding console text
/// preserved as `output` and stderr overlaid into `error` unless the unit
/// already reported one. A missing or malformed block falls back to a raw
/// result built from the exit status and the full streams.
pub fn parse_unit_output(stdout: &str, stderr: &str, exit_ok: bool) -> ExecutionResult {
    if let (Some(start), Some(end)) = (stdout.find(RESULT_START), stdout.find(RESULT_END)) {
        let body_start = start + RESULT_START.len();
        if body_start <= end {
            let block = stdout[body_start..end].trim();
            if let Ok(mut result) = serde_json::from_str::<ExecutionResult>(block) {
                let mut console = stdout[..start].trim().to_string();
                let after = stdout[end + RESULT_END.len()..].trim();
                if !after.is_empty() {
                    console.push_str(after);
                }
                result.output = console;
                if !stderr.is_empty() {
                    result.error = Some(stderr.to_string());
                }
                return result;
            }
        }
    }

    ExecutionResult {
        success: exit_ok,
        return_value: Value::Null,
        output: stdout.to_string(),
        error: if stderr.is_empty() {
            None
        } else {
            Some(stderr.to_string())
        },
        ..Default::default()
    }
}
