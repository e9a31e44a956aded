//! Variable hand-off candidates between two node scripts.
//!
//! Given the analyses of a source and a target script, propose the variables
//! the wiring layer could connect, from exact (explicit imports) down to
//! speculative (matching parameter names), deduplicated downward.

use std::path::Path;

use serde::Serialize;

use crate::analyzer::{ReturnDescriptor, ScriptAnalysis};
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    FunctionImport,
    VariableImport,
    DefinedAndUsed,
    CommonAssignment,
    ParameterMatch,
}

/// One proposed hand-off. Import matches are exact and carry no confidence;
/// the optional fields describe whatever the match kind knows about.
#[derive(Debug, Clone, Serialize)]
pub struct SharedVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MatchKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<Vec<ReturnDescriptor>>,
}

impl SharedVariable {
    fn new(name: &str, kind: MatchKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            confidence: None,
            source_line: None,
            target_line: None,
            value_type: None,
            target_function: None,
            parameters: None,
            returns: None,
        }
    }
}

/// Match output, carrying both raw analyses for downstream display.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub source_file: String,
    pub target_file: String,
    pub shared_variables: Vec<SharedVariable>,
    pub source_analysis: ScriptAnalysis,
    pub target_analysis: ScriptAnalysis,
}

pub fn match_scripts(
    source: &ScriptAnalysis,
    target: &ScriptAnalysis,
) -> Result<DependencyReport, EngineError> {
    if source.error.is_some() || target.error.is_some() {
        let detail = [source.error.as_deref(), target.error.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("; ");
        return Err(EngineError::Analysis(format!(
            "failed to analyze one or both scripts: {detail}"
        )));
    }

    let mut shared: Vec<SharedVariable> = Vec::new();
    let seen = |shared: &[SharedVariable], name: &str| shared.iter().any(|sv| sv.name == name);

    // Priority 1: the target explicitly imports a name from the source module.
    let source_stem = Path::new(&source.file_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !source_stem.is_empty() {
        for imp in &target.imports {
            let from_source = imp
                .module
                .as_deref()
                .is_some_and(|m| m.contains(&source_stem));
            if !from_source {
                continue;
            }
            for func in &source.functions {
                if func.name == imp.name {
                    let mut sv = SharedVariable::new(&imp.name, MatchKind::FunctionImport);
                    sv.source_line = Some(func.line);
                    sv.parameters = Some(func.formal_parameters.clone());
                    sv.returns = Some(func.returns.clone());
                    shared.push(sv);
                }
            }
            for var in &source.assignments {
                if var.name == imp.name {
                    let mut sv = SharedVariable::new(&imp.name, MatchKind::VariableImport);
                    sv.source_line = Some(var.line);
                    sv.value_type =
                        Some(var.value_type.clone().unwrap_or_else(|| "unknown".into()));
                    shared.push(sv);
                }
            }
        }
    }

    // Priority 2: assigned in the source, read in the target.
    for var in &source.assignments {
        if seen(&shared, &var.name) {
            continue;
        }
        if let Some(usage) = target.usages.iter().find(|u| u.name == var.name) {
            let mut sv = SharedVariable::new(&var.name, MatchKind::DefinedAndUsed);
            sv.confidence = Some(Confidence::High);
            sv.source_line = Some(var.line);
            sv.target_line = Some(usage.line);
            sv.value_type = Some(var.value_type.clone().unwrap_or_else(|| "unknown".into()));
            shared.push(sv);
        }
    }

    // Priority 3: assigned in both scripts.
    for var in &source.assignments {
        if seen(&shared, &var.name) {
            continue;
        }
        if target.assignments.iter().any(|t| t.name == var.name) {
            let mut sv = SharedVariable::new(&var.name, MatchKind::CommonAssignment);
            sv.confidence = Some(Confidence::Medium);
            shared.push(sv);
        }
    }

    // Priority 4: a target parameter named like a source assignment or
    // function.
    for func in &target.functions {
        for param in &func.formal_parameters {
            if seen(&shared, param) {
                continue;
            }
            let in_source = source.assignments.iter().any(|a| &a.name == param)
                || source.functions.iter().any(|f| &f.name == param);
            if in_source {
                let mut sv = SharedVariable::new(param, MatchKind::ParameterMatch);
                sv.confidence = Some(Confidence::Low);
                sv.target_function = Some(func.name.clone());
                shared.push(sv);
            }
        }
    }

    Ok(DependencyReport {
        source_file: source.file_path.clone(),
        target_file: target.file_path.clone(),
        shared_variables: shared,
        source_analysis: source.clone(),
        target_analysis: target.clone(),
    })
}
