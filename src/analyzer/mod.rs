//! Static analysis of node scripts.
//!
//! The analyzer infers each script's callable entry point, the variables it
//! reads interactively, and a classification of its return statements. The
//! result feeds the wiring layer (which parameters a node exposes), the
//! dependency matcher, and the invocation unit builder.

pub mod extract;
pub mod lexer;
pub mod parser;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Import,
    FromImport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(rename = "type")]
    pub kind: ImportKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub name: String,
    pub asname: Option<String>,
}

/// A single-name assignment target, with what could be inferred about its
/// right-hand side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub name: String,
    pub line: usize,
    /// Inferred type name when the RHS is a literal (`int`, `str`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// The other variable when the RHS is a bare name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub name: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalRecord {
    pub name: String,
    pub line: usize,
}

/// Variable bound from an interactive-input call, with its source line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBinding {
    pub name: String,
    pub line: usize,
}

/// Classification of one `return` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReturnDescriptor {
    Variable { name: String, line: usize },
    Constant { value: String, data_type: String, line: usize },
    List { line: usize },
    Dict { line: usize },
    FunctionCall { name: String, line: usize },
    Expression { line: usize },
}

impl ReturnDescriptor {
    pub fn line(&self) -> usize {
        match self {
            ReturnDescriptor::Variable { line, .. }
            | ReturnDescriptor::Constant { line, .. }
            | ReturnDescriptor::List { line }
            | ReturnDescriptor::Dict { line }
            | ReturnDescriptor::FunctionCall { line, .. }
            | ReturnDescriptor::Expression { line } => *line,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    /// Signature parameters, in declaration order.
    pub formal_parameters: Vec<String>,
    /// Prompt-derived fallback names, parallel to `input_variable_names`.
    pub input_calls: Vec<String>,
    /// Variables bound from interactive-input calls, in program order.
    pub input_variable_names: Vec<String>,
    pub input_variable_details: Vec<InputBinding>,
    pub returns: Vec<ReturnDescriptor>,
    /// Descriptor of the last `return` that is a direct child of the body;
    /// authoritative when multiple direct returns exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_return: Option<ReturnDescriptor>,
    /// True for the synthesized `main` entry of a script with no functions.
    #[serde(default)]
    pub synthetic: bool,
    pub line: usize,
}

impl FunctionInfo {
    /// Parameter names exposed to the wiring layer: the interactive-input
    /// variable names when any exist, else the prompt-derived fallbacks.
    pub fn effective_parameters(&self) -> &[String] {
        if !self.input_variable_names.is_empty() {
            &self.input_variable_names
        } else {
            &self.input_calls
        }
    }
}

/// Full analysis of one script. Recomputed on every call; never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptAnalysis {
    pub file_path: String,
    /// Set when the script could not be read or parsed; all other fields are
    /// empty in that case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub imports: Vec<ImportRecord>,
    pub functions: Vec<FunctionInfo>,
    pub assignments: Vec<AssignmentRecord>,
    pub usages: Vec<UsageRecord>,
    pub globals: Vec<GlobalRecord>,
}

/// Wiring view of a script's entry point: what a node exposes to the outside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryView {
    pub function_name: String,
    /// Names the wiring layer should offer as connectable parameters.
    pub parameters: Vec<String>,
    pub formal_parameters: Vec<String>,
    pub input_variable_names: Vec<String>,
    pub input_variable_details: Vec<InputBinding>,
    pub returns: Vec<ReturnDescriptor>,
    pub line: usize,
}

impl ScriptAnalysis {
    /// The callable the engine would invoke: the first discovered function
    /// (which may be the synthetic `main`).
    pub fn entry(&self) -> Option<&FunctionInfo> {
        self.functions.first()
    }

    pub fn entry_view(&self) -> Option<EntryView> {
        self.entry().map(|func| EntryView {
            function_name: func.name.clone(),
            parameters: func.effective_parameters().to_vec(),
            formal_parameters: func.formal_parameters.clone(),
            input_variable_names: func.input_variable_names.clone(),
            input_variable_details: func.input_variable_details.clone(),
            returns: func.returns.clone(),
            line: func.line,
        })
    }

    fn failed(file_path: &str, error: String) -> Self {
        Self {
            file_path: file_path.to_string(),
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Analyze script source text.
pub fn analyze(source: &str) -> Result<ScriptAnalysis, EngineError> {
    let body = parser::parse(source).map_err(EngineError::Analysis)?;
    Ok(extract::build_analysis(&body, ""))
}

/// Analyze a script on disk. Read or parse failures are embedded in the
/// returned record (empty fields, `error` set) so the dependency matcher can
/// report them instead of crashing.
pub fn analyze_file(path: &Path) -> ScriptAnalysis {
    let display = path.display().to_string();
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            return ScriptAnalysis::failed(&display, format!("failed to analyze {display}: {e}"))
        }
    };
    match parser::parse(&source) {
        Ok(body) => extract::build_analysis(&body, &display),
        Err(e) => ScriptAnalysis::failed(&display, format!("failed to analyze {display}: {e}")),
    }
}
