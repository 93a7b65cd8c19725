//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the streamer crates MUST NOT sleep unless
//! the sleep races cancellation inside `tokio::select!`. Pacing between
//! records is the one legitimate wait, and it has to end the moment the
//! streamer is cancelled.

use architectural_enforcement::{scan_production, uncancellable_sleep};

#[test]
fn test_no_uncancellable_sleep_in_production_code() {
    let violations = scan_production(uncancellable_sleep);

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Uncancellable sleep found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - tokio::time::sleep as one arm of tokio::select! with token.cancelled()");
        eprintln!("  - Test code (#[cfg(test)] modules)");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - std::thread::sleep anywhere");
        eprintln!("  - Sleep as poor man's synchronization (use Notify or the queue)");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}
