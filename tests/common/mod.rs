#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

/// Tests that launch real child processes need a Python interpreter on PATH.
/// They pass trivially when none is installed.
pub fn python_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

pub fn write_script(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, source).unwrap();
    path
}
