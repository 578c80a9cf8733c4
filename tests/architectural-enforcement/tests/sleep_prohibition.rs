//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT sleep. The client waits on I/O and
//! cancellation tokens only; there is no polling loop to pace.

use architectural_enforcement::scan;

/// Test that production code does not contain sleep calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan(|lines, idx| {
        let code = &lines[idx].1;
        code.contains("thread::sleep") || code.contains("time::sleep") || code.contains("sleep_until")
    });

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Wait on the stream, a channel, or a CancellationToken instead.");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}
