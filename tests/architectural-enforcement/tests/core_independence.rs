//! Integration Test: Core Independence
//!
//! **Policy**: `claims-chat-core` is headless. It MUST NOT depend on terminal,
//! CLI, or subscriber crates; surfaces bring those themselves.

use std::fs;

use architectural_enforcement::{production_lines, rust_files, workspace_root};

const UI_CRATES: &[&str] = &["ratatui", "crossterm", "clap", "tracing-subscriber", "textwrap"];

fn core_dependencies() -> String {
    let manifest = fs::read_to_string(workspace_root().join("assistant/core/Cargo.toml"))
        .expect("core manifest readable");
    manifest
        .split("[dependencies]")
        .nth(1)
        .and_then(|rest| rest.split("[dev-dependencies]").next())
        .unwrap_or_default()
        .to_string()
}

/// Test that the core manifest lists no UI or CLI crates
#[test]
fn test_core_manifest_has_no_ui_dependencies() {
    let deps = core_dependencies();
    for name in UI_CRATES {
        assert!(
            !deps.lines().any(|l| l.trim_start().starts_with(&format!("{name} "))),
            "claims-chat-core must not depend on {name}"
        );
    }
}

/// Test that core sources never print directly
#[test]
fn test_core_does_not_print() {
    let mut violations = Vec::new();

    for path in rust_files(&workspace_root().join("assistant/core/src")) {
        let content = fs::read_to_string(&path).expect("source readable");
        for (line, code) in production_lines(&content) {
            if code.contains("println!") || code.contains("eprintln!") {
                violations.push(format!("{}:{line} - {}", path.display(), code.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "core must report through ChatUpdate and tracing, not stdout:\n{}",
        violations.join("\n")
    );
}
