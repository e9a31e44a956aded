use flowrun::analyzer::{analyze, analyze_file, ImportKind, ReturnDescriptor};

use std::path::Path;

#[test]
fn test_function_signature_and_returns() {
    let source = r#"
def add(a, b):
    total = a + b
    return total
"#;
    let analysis = analyze(source).unwrap();
    assert_eq!(analysis.functions.len(), 1);

    let func = &analysis.functions[0];
    assert_eq!(func.name, "add");
    assert_eq!(func.formal_parameters, vec!["a", "b"]);
    assert!(!func.synthetic);
    assert_eq!(
        func.primary_return,
        Some(ReturnDescriptor::Variable {
            name: "total".to_string(),
            line: 4,
        })
    );
}

#[test]
fn test_input_bindings_and_prompt_fallbacks() {
    let source = r#"
def greet():
    name = input("Enter name: ")
    city = input()
    return name
"#;
    let analysis = analyze(source).unwrap();
    let func = &analysis.functions[0];
    assert_eq!(func.input_variable_names, vec!["name", "city"]);
    assert_eq!(func.input_calls, vec!["name", "city"]);
    assert_eq!(func.input_variable_details[0].line, 3);
    // Wiring parameters prefer the bound variable names.
    assert_eq!(func.effective_parameters(), ["name", "city"]);
}

#[test]
fn test_synthetic_main_for_bare_input_script() {
    let source = r#"
x = input("Enter x: ")
y = input("Enter y: ")
print(x, y)
"#;
    let analysis = analyze(source).unwrap();
    let func = analysis.entry().unwrap();
    assert_eq!(func.name, "main");
    assert!(func.synthetic);
    assert!(func.formal_parameters.is_empty());
    assert_eq!(func.input_variable_names, vec!["x", "y"]);
}

#[test]
fn test_no_synthetic_main_without_input_calls() {
    let analysis = analyze("x = 1\nprint(x)\n").unwrap();
    assert!(analysis.functions.is_empty());
    assert!(analysis.entry().is_none());
}

#[test]
fn test_return_classification() {
    let source = r#"
def shapes(flag):
    if flag == 1:
        return 42
    if flag == 2:
        return "done"
    if flag == 3:
        return [1, 2]
    if flag == 4:
        return {"k": 1}
    if flag == 5:
        return helper()
    return flag + 1
"#;
    let analysis = analyze(source).unwrap();
    let returns = &analysis.functions[0].returns;
    assert_eq!(returns.len(), 6);
    assert!(matches!(
        &returns[0],
        ReturnDescriptor::Constant { value, data_type, .. }
            if value == "42" && data_type == "int"
    ));
    assert!(matches!(
        &returns[1],
        ReturnDescriptor::Constant { value, data_type, .. }
            if value == "done" && data_type == "str"
    ));
    assert!(matches!(&returns[2], ReturnDescriptor::List { .. }));
    assert!(matches!(&returns[3], ReturnDescriptor::Dict { .. }));
    assert!(matches!(
        &returns[4],
        ReturnDescriptor::FunctionCall { name, .. } if name == "helper()"
    ));
    assert!(matches!(&returns[5], ReturnDescriptor::Expression { .. }));

    // The last direct-child return wins.
    assert!(matches!(
        analysis.functions[0].primary_return,
        Some(ReturnDescriptor::Expression { .. })
    ));
}

#[test]
fn test_set_display_is_not_a_dict() {
    let analysis = analyze("def f():\n    return {1, 2}\n").unwrap();
    assert!(matches!(
        &analysis.functions[0].returns[0],
        ReturnDescriptor::Expression { .. }
    ));
    let empty = analyze("def f():\n    return {}\n").unwrap();
    assert!(matches!(
        &empty.functions[0].returns[0],
        ReturnDescriptor::Dict { .. }
    ));
}

#[test]
fn test_returns_ignore_nested_defs() {
    let source = r#"
def outer():
    def inner():
        return 1
    return 2
"#;
    let analysis = analyze(source).unwrap();
    let returns = &analysis.functions[0].returns;
    assert_eq!(returns.len(), 1);
    assert!(matches!(
        &returns[0],
        ReturnDescriptor::Constant { value, .. } if value == "2"
    ));
}

#[test]
fn test_imports_at_any_depth() {
    let source = r#"
import os
from utils import load, save as persist

def f():
    import json
    return json
"#;
    let analysis = analyze(source).unwrap();
    assert_eq!(analysis.imports.len(), 4);
    assert_eq!(analysis.imports[0].kind, ImportKind::Import);
    assert_eq!(analysis.imports[0].name, "os");
    assert_eq!(analysis.imports[1].kind, ImportKind::FromImport);
    assert_eq!(analysis.imports[1].module.as_deref(), Some("utils"));
    assert_eq!(analysis.imports[2].asname.as_deref(), Some("persist"));
    assert_eq!(analysis.imports[3].name, "json");
}

#[test]
fn test_assignment_value_types_and_dependencies() {
    let source = r#"
count = 5
rate = 2.5
label = "hi"
flag = True
alias = count
combo = count + 1
"#;
    let analysis = analyze(source).unwrap();
    let by_name = |name: &str| {
        analysis
            .assignments
            .iter()
            .find(|a| a.name == name)
            .unwrap()
    };
    assert_eq!(by_name("count").value_type.as_deref(), Some("int"));
    assert_eq!(by_name("rate").value_type.as_deref(), Some("float"));
    assert_eq!(by_name("label").value_type.as_deref(), Some("str"));
    assert_eq!(by_name("flag").value_type.as_deref(), Some("bool"));
    assert_eq!(by_name("alias").depends_on.as_deref(), Some("count"));
    assert!(by_name("combo").value_type.is_none());
    assert!(by_name("combo").depends_on.is_none());
}

#[test]
fn test_usages_skip_attributes_and_kwargs() {
    let source = r#"
result = process(data, mode="fast")
obj.method(result)
"#;
    let analysis = analyze(source).unwrap();
    let names: Vec<&str> = analysis.usages.iter().map(|u| u.name.as_str()).collect();
    assert!(names.contains(&"process"));
    assert!(names.contains(&"data"));
    assert!(names.contains(&"obj"));
    assert!(names.contains(&"result"));
    assert!(!names.contains(&"mode"));
    assert!(!names.contains(&"method"));
}

#[test]
fn test_globals_are_recorded() {
    let source = r#"
def f():
    global counter, total
    counter = 1
"#;
    let analysis = analyze(source).unwrap();
    let names: Vec<&str> = analysis.globals.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["counter", "total"]);
}

#[test]
fn test_entry_view_exposes_wiring_parameters() {
    let source = r#"
def greet():
    name = input("Enter name: ")
    return name
"#;
    let analysis = analyze(source).unwrap();
    let view = analysis.entry_view().unwrap();
    assert_eq!(view.function_name, "greet");
    assert_eq!(view.parameters, vec!["name"]);
    assert!(view.formal_parameters.is_empty());
    assert_eq!(view.line, 2);
}

#[test]
fn test_analyze_errors_on_broken_source() {
    assert!(analyze("x = 'unterminated\n").is_err());
}

#[test]
fn test_analyze_file_embeds_read_failures() {
    let analysis = analyze_file(Path::new("/nonexistent/ghost.py"));
    let error = analysis.error.unwrap();
    assert!(error.contains("failed to analyze"));
    assert!(analysis.functions.is_empty());
}
