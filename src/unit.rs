//! Invocation unit builder.
//!
//! Turns a script plus call arguments plus substitute input values into a
//! self-contained Python unit: interactive input is mocked positionally, the
//! script's top level is re-executed so its definitions are available, the
//! target callable is invoked, and the structured outcome is printed as JSON
//! between sentinel markers. Building is pure — nothing here spawns a
//! process — so units can be tested by piping them through any interpreter.

use std::fmt::Write as _;
use std::path::Path;

use serde_json::{Map, Value};

use crate::analyzer::analyze;
use crate::error::EngineError;

pub const RESULT_START: &str = "__RESULT_START__";
pub const RESULT_END: &str = "__RESULT_END__";

/// Keyword call arguments for the target callable.
pub type CallArguments = Map<String, Value>;

/// Substitute input values in consumption order. The names are kept for
/// traceability only; consumption is strictly positional.
pub type InputValues = Vec<(String, String)>;

/// A generated unit, with the entry point it will invoke.
#[derive(Debug, Clone)]
pub struct InvocationUnit {
    pub source: String,
    pub function_name: String,
}

/// Build the invocation unit for one run of `script_source`.
///
/// Fails with `Analysis` when the script has no callable or implicit entry,
/// and with `MissingArguments` (before any code is generated) when a formal
/// parameter of the target has no call argument.
pub fn build_unit(
    script_source: &str,
    script_path: &Path,
    call_arguments: &CallArguments,
    input_values: &InputValues,
) -> Result<InvocationUnit, EngineError> {
    let analysis = analyze(script_source)?;
    let target = analysis.entry().ok_or_else(|| {
        EngineError::Analysis("no function or input assignments found in script".to_string())
    })?;

    // The synthetic `main` entry has no formals; a real function must have
    // every formal satisfied.
    let mut call_args: Vec<(&String, &Value)> = Vec::new();
    let mut missing = Vec::new();
    for param in &target.formal_parameters {
        match call_arguments.get(param) {
            Some(value) => call_args.push((param, value)),
            None => missing.push(param.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(EngineError::MissingArguments(missing));
    }

    let synthetic = target.synthetic;
    let has_formals = !target.formal_parameters.is_empty();

    let script_dir = script_path
        .parent()
        .map(|p| p.display().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ".".to_string());

    let values_list = py_str_list(input_values.iter().map(|(_, v)| v.as_str()));
    let kwargs = py_dict(call_args.iter().map(|(k, v)| (k.as_str(), py_literal(v))));
    let inputs_echo = py_dict(
        input_values
            .iter()
            .map(|(k, v)| (k.as_str(), py_str(v))),
    );

    let call = if synthetic {
        // Top-level code is the entry point; it already ran above.
        "_result = None".to_string()
    } else if has_formals {
        format!("_result = {}(**{})", target.name, kwargs)
    } else {
        format!("_result = {}()", target.name)
    };

    let mut unit = String::new();
    let _ = write!(
        unit,
        r#"import json
import sys
import os
sys.path.insert(0, {script_dir})

_input_values = {values_list}
_input_call_count = 0

def _mock_input(prompt=""):
    global _input_call_count
    _input_call_count += 1
    if _input_call_count <= len(_input_values):
        _val = _input_values[_input_call_count - 1]
        print(f"{{prompt}}{{_val}}")
        return str(_val)
    print(f"{{prompt}}")
    return ""

import builtins
builtins.input = _mock_input

{script_source}

try:
    {call}
    _output = {{
        'success': True,
        'return_value': _result,
        'function_name': {function_name},
        'function_args': {kwargs},
        'input_values': {inputs_echo},
    }}
    print("{RESULT_START}")
    print(json.dumps(_output, default=str))
    print("{RESULT_END}")
except Exception as e:
    _output = {{
        'success': False,
        'error': str(e),
        'function_name': {function_name},
        'function_args': {kwargs},
        'input_values': {inputs_echo},
    }}
    print("{RESULT_START}")
    print(json.dumps(_output, default=str))
    print("{RESULT_END}")
"#,
        script_dir = py_str(&script_dir),
        function_name = py_str(&target.name),
    );

    Ok(InvocationUnit {
        source: unit,
        function_name: target.name.clone(),
    })
}

/// Render a JSON value as a Python literal.
pub fn py_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => py_str(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(py_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => py_dict(map.iter().map(|(k, v)| (k.as_str(), py_literal(v)))),
    }
}

/// Single-quoted Python string literal.
pub fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn py_str_list<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let inner: Vec<String> = values.map(py_str).collect();
    format!("[{}]", inner.join(", "))
}

fn py_dict<'a>(entries: impl Iterator<Item = (&'a str, String)>) -> String {
    let inner: Vec<String> = entries
        .map(|(k, v)| format!("{}: {}", py_str(k), v))
        .collect();
    format!("{{{}}}", inner.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn py_literal_renders_json_shapes() {
        assert_eq!(py_literal(&json!(null)), "None");
        assert_eq!(py_literal(&json!(true)), "True");
        assert_eq!(py_literal(&json!(3)), "3");
        assert_eq!(py_literal(&json!(2.5)), "2.5");
        assert_eq!(py_literal(&json!("it's")), "'it\\'s'");
        assert_eq!(py_literal(&json!([1, "a"])), "[1, 'a']");
        assert_eq!(py_literal(&json!({"k": [false]})), "{'k': [False]}");
    }

    #[test]
    fn py_str_escapes_control_characters() {
        assert_eq!(py_str("a\nb\tc"), "'a\\nb\\tc'");
        assert_eq!(py_str("back\\slash"), "'back\\\\slash'");
    }
}
