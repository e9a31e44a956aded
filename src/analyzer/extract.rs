//! Walks the statement tree and produces the analysis records.

use super::lexer::Tok;
use super::parser::{is_keyword, matching_bracket, split_top_level, Stmt};
use super::{
    AssignmentRecord, FunctionInfo, GlobalRecord, ImportKind, ImportRecord, InputBinding,
    ReturnDescriptor, ScriptAnalysis, UsageRecord,
};

pub fn build_analysis(body: &[Stmt], file_path: &str) -> ScriptAnalysis {
    let mut analysis = ScriptAnalysis {
        file_path: file_path.to_string(),
        ..Default::default()
    };

    // Imports are collected regardless of nesting depth.
    walk(body, true, &mut |stmt| match stmt {
        Stmt::Import { names, .. } => {
            for alias in names {
                analysis.imports.push(ImportRecord {
                    kind: ImportKind::Import,
                    module: None,
                    name: alias.name.clone(),
                    asname: alias.asname.clone(),
                });
            }
        }
        Stmt::FromImport { module, names, .. } => {
            for alias in names {
                analysis.imports.push(ImportRecord {
                    kind: ImportKind::FromImport,
                    module: Some(module.clone()),
                    name: alias.name.clone(),
                    asname: alias.asname.clone(),
                });
            }
        }
        _ => {}
    });

    // One FunctionInfo per top-level def.
    for stmt in body {
        if let Stmt::FunctionDef {
            name,
            params,
            body: fn_body,
            line,
        } = stmt
        {
            analysis.functions.push(function_info(name, params, fn_body, *line));
        }
    }

    // Synthetic `main` when the script is a bare sequence of input() reads.
    if analysis.functions.is_empty() {
        let bindings = top_level_input_bindings(body);
        if !bindings.is_empty() {
            let mut main = FunctionInfo {
                name: "main".to_string(),
                synthetic: true,
                line: 1,
                ..Default::default()
            };
            for (binding, prompt) in bindings {
                main.input_calls.push(prompt_fallback(&prompt, &binding.name));
                main.input_variable_names.push(binding.name.clone());
                main.input_variable_details.push(binding);
            }
            analysis.functions.push(main);
        }
    }

    // Module-wide assignment/usage/global extraction (all depths, the way an
    // ast.walk would visit them).
    walk(body, true, &mut |stmt| match stmt {
        Stmt::Assign {
            targets,
            target_toks,
            value,
            line,
        } => {
            for name in targets {
                let (value_type, depends_on) = classify_value(value);
                analysis.assignments.push(AssignmentRecord {
                    name: name.clone(),
                    line: *line,
                    value_type,
                    depends_on,
                });
            }
            // Plain name targets are writes; names inside compound targets
            // (`a[i]`, `obj.attr`) are reads.
            scan_usages(target_toks, *line, &mut analysis.usages);
            scan_usages(value, *line, &mut analysis.usages);
        }
        Stmt::Expr { toks, line } => scan_usages(toks, *line, &mut analysis.usages),
        Stmt::Return { value, line } => scan_usages(value, *line, &mut analysis.usages),
        Stmt::If { headers, line, .. } => {
            for header in headers {
                scan_usages(header, *line, &mut analysis.usages);
            }
        }
        Stmt::Loop { header, line, .. } => scan_usages(header, *line, &mut analysis.usages),
        Stmt::With { header, line, .. } => scan_usages(header, *line, &mut analysis.usages),
        Stmt::Try { headers, line, .. } => {
            for header in headers {
                scan_usages(header, *line, &mut analysis.usages);
            }
        }
        Stmt::Global { names, line } => {
            for name in names {
                analysis.globals.push(GlobalRecord {
                    name: name.clone(),
                    line: *line,
                });
            }
        }
        _ => {}
    });

    analysis
}

fn function_info(name: &str, params: &[String], body: &[Stmt], line: usize) -> FunctionInfo {
    let mut info = FunctionInfo {
        name: name.to_string(),
        formal_parameters: params.to_vec(),
        line,
        ..Default::default()
    };

    // Input bindings anywhere inside the function, in program order.
    walk(body, true, &mut |stmt| {
        if let Stmt::Assign {
            targets,
            value,
            line,
            ..
        } = stmt
        {
            if let Some(prompt) = find_input_call(value) {
                for target in targets {
                    info.input_variable_names.push(target.clone());
                    info.input_variable_details.push(InputBinding {
                        name: target.clone(),
                        line: *line,
                    });
                    info.input_calls.push(prompt_fallback(&prompt, target));
                }
            }
        }
    });

    collect_returns(body, &mut info.returns);

    // Only the last direct return is authoritative for inference.
    info.primary_return = body
        .iter()
        .rev()
        .find_map(|stmt| match stmt {
            Stmt::Return { value, line } if !value.is_empty() => {
                Some(classify_return(value, *line))
            }
            _ => None,
        });

    info
}

/// Return statements that belong to the function body: direct children plus
/// `if`/loop/`try`/`with` nesting, never nested `def` or `class` bodies.
fn collect_returns(stmts: &[Stmt], out: &mut Vec<ReturnDescriptor>) {
    for stmt in stmts {
        match stmt {
            Stmt::Return { value, line } if !value.is_empty() => {
                out.push(classify_return(value, *line));
            }
            Stmt::If { branches, .. } => {
                for branch in branches {
                    collect_returns(branch, out);
                }
            }
            Stmt::Loop { body, orelse, .. } => {
                collect_returns(body, out);
                collect_returns(orelse, out);
            }
            Stmt::Try { bodies, .. } => {
                for body in bodies {
                    collect_returns(body, out);
                }
            }
            Stmt::With { body, .. } => collect_returns(body, out),
            _ => {}
        }
    }
}

/// Classify the returned expression into the closed descriptor set.
pub fn classify_return(toks: &[Tok], line: usize) -> ReturnDescriptor {
    if toks.len() == 1 {
        match &toks[0] {
            Tok::Ident(name) if !is_keyword(name) => {
                return ReturnDescriptor::Variable {
                    name: name.clone(),
                    line,
                }
            }
            Tok::Ident(name) => {
                // True/False/None are constants; other keywords fall through.
                if let Some(data_type) = keyword_constant_type(name) {
                    return ReturnDescriptor::Constant {
                        value: name.clone(),
                        data_type: data_type.to_string(),
                        line,
                    };
                }
            }
            Tok::Number(n) => {
                return ReturnDescriptor::Constant {
                    value: n.clone(),
                    data_type: number_type(n).to_string(),
                    line,
                }
            }
            Tok::Str(s) => {
                return ReturnDescriptor::Constant {
                    value: s.clone(),
                    data_type: "str".to_string(),
                    line,
                }
            }
            _ => {}
        }
    }

    if let Some(Tok::Op(o)) = toks.first() {
        if o == "[" && matching_bracket(toks, 0) == Some(toks.len() - 1) {
            return ReturnDescriptor::List { line };
        }
        if o == "{" && matching_bracket(toks, 0) == Some(toks.len() - 1) {
            if is_dict_literal(&toks[1..toks.len() - 1]) {
                return ReturnDescriptor::Dict { line };
            }
            return ReturnDescriptor::Expression { line };
        }
    }

    // `name(...)` spanning the whole expression.
    if toks.len() >= 3 {
        if let (Tok::Ident(name), true) = (&toks[0], toks[1].is_op("(")) {
            if !is_keyword(name) && matching_bracket(toks, 1) == Some(toks.len() - 1) {
                return ReturnDescriptor::FunctionCall {
                    name: format!("{name}()"),
                    line,
                };
            }
        }
    }

    ReturnDescriptor::Expression { line }
}

/// Inner tokens of a `{...}` literal: a dict has a top-level `:` or `**`
/// spread; an empty `{}` is a dict; anything else is a set display.
fn is_dict_literal(inner: &[Tok]) -> bool {
    if inner.is_empty() {
        return true;
    }
    let mut depth = 0usize;
    for t in inner {
        if let Tok::Op(o) = t {
            match o.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                ":" | "**" if depth == 0 => return true,
                _ => {}
            }
        }
    }
    false
}

/// Inferred value type for a literal RHS, or the dependency name for a bare
/// name RHS.
pub fn classify_value(toks: &[Tok]) -> (Option<String>, Option<String>) {
    if toks.len() != 1 {
        return (None, None);
    }
    match &toks[0] {
        Tok::Number(n) => (Some(number_type(n).to_string()), None),
        Tok::Str(_) => (Some("str".to_string()), None),
        Tok::Ident(name) => {
            if let Some(data_type) = keyword_constant_type(name) {
                (Some(data_type.to_string()), None)
            } else if is_keyword(name) {
                (None, None)
            } else {
                (None, Some(name.clone()))
            }
        }
        _ => (None, None),
    }
}

fn keyword_constant_type(name: &str) -> Option<&'static str> {
    match name {
        "True" | "False" => Some("bool"),
        "None" => Some("NoneType"),
        _ => None,
    }
}

fn number_type(literal: &str) -> &'static str {
    let lower = literal.to_ascii_lowercase();
    if lower.starts_with("0x") || lower.starts_with("0o") || lower.starts_with("0b") {
        return "int";
    }
    if lower.contains('.') || lower.contains('e') {
        "float"
    } else {
        "int"
    }
}

/// Does this expression contain a call to the `input` primitive? Returns the
/// literal prompt when the first argument is a plain string.
pub fn find_input_call(toks: &[Tok]) -> Option<Option<String>> {
    for i in 0..toks.len() {
        if !toks[i].is_ident("input") {
            continue;
        }
        if i > 0 && toks[i - 1].is_op(".") {
            continue; // method call on some object, not the builtin
        }
        if !toks.get(i + 1).is_some_and(|t| t.is_op("(")) {
            continue;
        }
        let prompt = match toks.get(i + 2) {
            Some(Tok::Str(s))
                if toks
                    .get(i + 3)
                    .is_some_and(|t| t.is_op(")") || t.is_op(",")) =>
            {
                Some(s.clone())
            }
            _ => None,
        };
        return Some(prompt);
    }
    None
}

/// Derive the wiring-layer parameter name for an input binding, from the
/// prompt text when one exists, else from the variable name.
pub fn prompt_fallback(prompt: &Option<String>, variable: &str) -> String {
    match prompt {
        Some(p) => {
            let base = p.replace("Enter ", "").replace(':', "");
            let base = base.trim().replace(' ', "_").to_lowercase();
            if base.is_empty() {
                "input".to_string()
            } else {
                base
            }
        }
        None => variable.to_lowercase(),
    }
}

/// Input bindings outside any function or class body (recursing through
/// `if`/loop/`try`/`with` blocks).
fn top_level_input_bindings(body: &[Stmt]) -> Vec<(InputBinding, Option<String>)> {
    let mut out = Vec::new();
    walk(body, false, &mut |stmt| {
        if let Stmt::Assign {
            targets,
            value,
            line,
            ..
        } = stmt
        {
            if let Some(prompt) = find_input_call(value) {
                for target in targets {
                    out.push((
                        InputBinding {
                            name: target.clone(),
                            line: *line,
                        },
                        prompt.clone(),
                    ));
                }
            }
        }
    });
    out
}

/// Depth-first statement walk. `into_defs` controls whether function and
/// class bodies are visited.
fn walk<'a>(stmts: &'a [Stmt], into_defs: bool, f: &mut impl FnMut(&'a Stmt)) {
    for stmt in stmts {
        f(stmt);
        match stmt {
            Stmt::FunctionDef { body, .. } | Stmt::ClassDef { body, .. } => {
                if into_defs {
                    walk(body, into_defs, f);
                }
            }
            Stmt::If { branches, .. } => {
                for branch in branches {
                    walk(branch, into_defs, f);
                }
            }
            Stmt::Loop { body, orelse, .. } => {
                walk(body, into_defs, f);
                walk(orelse, into_defs, f);
            }
            Stmt::Try { bodies, .. } => {
                for body in bodies {
                    walk(body, into_defs, f);
                }
            }
            Stmt::With { body, .. } => walk(body, into_defs, f),
            _ => {}
        }
    }
}

/// Name reads inside a token run. Attribute accesses, keyword-argument names
/// and `as` bindings are not reads.
fn scan_usages(toks: &[Tok], line: usize, out: &mut Vec<UsageRecord>) {
    let mut depth = 0usize;
    for i in 0..toks.len() {
        match &toks[i] {
            Tok::Op(o) => match o.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                _ => {}
            },
            Tok::Ident(name) => {
                if is_keyword(name) {
                    continue;
                }
                if i > 0 {
                    match &toks[i - 1] {
                        Tok::Op(o) if o == "." => continue,
                        Tok::Ident(prev) if prev == "as" => continue,
                        _ => {}
                    }
                }
                // keyword argument in a call: `f(name=1)`
                if depth > 0 && toks.get(i + 1).is_some_and(|t| t.is_op("=")) {
                    continue;
                }
                out.push(UsageRecord {
                    name: name.clone(),
                    line,
                });
            }
            _ => {}
        }
    }
}
