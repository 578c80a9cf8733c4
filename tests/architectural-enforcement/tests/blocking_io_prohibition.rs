//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async functions MUST NOT use blocking I/O.
//! **Required**: `tokio::fs`, `tokio::net`, `tokio::io`, async `reqwest`.
//! **Acceptable**: blocking calls in non-async functions (e.g. config
//! loading before the first request) and test code.

use architectural_enforcement::{is_in_async_fn, scan};

const FORBIDDEN_IN_ASYNC: &[&str] = &[
    "std::fs::",
    "std::net::",
    "std::process::Command",
    "std::io::stdin()",
    "std::io::stdout()",
    "std::io::stderr()",
];

/// Test that async production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_async_code() {
    let violations = scan(|lines, idx| {
        let code = &lines[idx].1;
        FORBIDDEN_IN_ASYNC.iter().any(|p| code.contains(p)) && is_in_async_fn(lines, idx)
    });

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in async code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read().await");
        eprintln!("  - tokio::io::stdin() / tokio::io::stdout()");

        panic!(
            "\nFound {} blocking I/O violation(s) in async code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Test that the blocking HTTP client is never used
#[test]
fn test_no_blocking_http_client() {
    let violations = scan(|lines, idx| lines[idx].1.contains("reqwest::blocking"));
    assert!(
        violations.is_empty(),
        "reqwest::blocking used in production code: {violations:#?}"
    );
}
