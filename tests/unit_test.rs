mod common;

use std::path::Path;
use std::process::Command;

use serde_json::{json, Map};

use flowrun::error::EngineError;
use flowrun::runtime::parse_unit_output;
use flowrun::unit::{build_unit, CallArguments, InputValues, RESULT_END, RESULT_START};

fn args(entries: &[(&str, serde_json::Value)]) -> CallArguments {
    let mut map = Map::new();
    for (k, v) in entries {
        map.insert(k.to_string(), v.clone());
    }
    map
}

#[test]
fn test_missing_arguments_are_reported_before_generation() {
    let source = "def add(a, b, c):\n    return a + b + c\n";
    let err = build_unit(
        source,
        Path::new("/tmp/add.py"),
        &args(&[("b", json!(2))]),
        &InputValues::new(),
    )
    .unwrap_err();

    match err {
        EngineError::MissingArguments(missing) => {
            assert_eq!(missing, vec!["a", "c"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unit_invokes_the_entry_with_keyword_arguments() {
    let source = "def add(a, b):\n    return a + b\n";
    let unit = build_unit(
        source,
        Path::new("/tmp/add.py"),
        &args(&[("a", json!(1)), ("b", json!(2))]),
        &InputValues::new(),
    )
    .unwrap();

    assert_eq!(unit.function_name, "add");
    assert!(unit.source.contains("_result = add(**{'a': 1, 'b': 2})"));
    assert!(unit.source.contains("builtins.input = _mock_input"));
    assert!(unit.source.contains(RESULT_START));
    assert!(unit.source.contains(RESULT_END));
    assert!(unit.source.contains(source.trim_end()));
}

#[test]
fn test_unit_for_a_synthetic_entry_runs_top_level_code() {
    let source = "x = input(\"Enter x: \")\nprint(x)\n";
    let unit = build_unit(
        source,
        Path::new("/tmp/bare.py"),
        &CallArguments::new(),
        &vec![("x".to_string(), "7".to_string())],
    )
    .unwrap();

    assert_eq!(unit.function_name, "main");
    assert!(unit.source.contains("_result = None"));
    assert!(unit.source.contains("_input_values = ['7']"));
}

#[test]
fn test_scripts_with_no_entry_are_rejected() {
    let err = build_unit(
        "x = 1\nprint(x)\n",
        Path::new("/tmp/none.py"),
        &CallArguments::new(),
        &InputValues::new(),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Analysis(_)));
}

#[test]
fn test_unit_round_trip_through_the_interpreter() {
    if !common::python_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let script = common::write_script(
        dir.path(),
        "add.py",
        "def add(a, b):\n    print(\"adding\")\n    return a + b\n",
    );

    let unit = build_unit(
        &std::fs::read_to_string(&script).unwrap(),
        &script,
        &args(&[("a", json!(2)), ("b", json!(3))]),
        &InputValues::new(),
    )
    .unwrap();
    let unit_path = common::write_script(dir.path(), "add_unit.py", &unit.source);

    let out = Command::new("python3").arg(&unit_path).output().unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    let result = parse_unit_output(&stdout, "", out.status.success());

    assert!(result.success, "unit failed: {:?}", result.error);
    assert_eq!(result.return_value, json!(5));
    assert_eq!(result.output, "adding");
    assert_eq!(result.function_name.as_deref(), Some("add"));
}

#[test]
fn test_input_values_are_consumed_positionally() {
    if !common::python_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let script = common::write_script(
        dir.path(),
        "ask.py",
        concat!(
            "def ask():\n",
            "    first = input(\"Enter first: \")\n",
            "    second = input(\"Enter second: \")\n",
            "    third = input(\"Enter third: \")\n",
            "    return [first, second, third]\n",
        ),
    );

    // Two values for three input() calls: the third read gets "".
    let unit = build_unit(
        &std::fs::read_to_string(&script).unwrap(),
        &script,
        &CallArguments::new(),
        &vec![
            ("first".to_string(), "one".to_string()),
            ("second".to_string(), "two".to_string()),
        ],
    )
    .unwrap();
    let unit_path = common::write_script(dir.path(), "ask_unit.py", &unit.source);

    let out = Command::new("python3").arg(&unit_path).output().unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    let result = parse_unit_output(&stdout, "", out.status.success());

    assert!(result.success);
    assert_eq!(result.return_value, json!(["one", "two", ""]));
    // Prompts are echoed with the substituted value appended.
    assert!(result.output.contains("Enter first: one"));
    assert!(result.output.contains("Enter second: two"));
}

#[test]
fn test_exceptions_become_a_structured_failure() {
    if !common::python_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let script = common::write_script(
        dir.path(),
        "boom.py",
        "def boom():\n    raise ValueError(\"it broke\")\n",
    );

    let unit = build_unit(
        &std::fs::read_to_string(&script).unwrap(),
        &script,
        &CallArguments::new(),
        &InputValues::new(),
    )
    .unwrap();
    let unit_path = common::write_script(dir.path(), "boom_unit.py", &unit.source);

    let out = Command::new("python3").arg(&unit_path).output().unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    let result = parse_unit_output(&stdout, "", out.status.success());

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("it broke"));
}
