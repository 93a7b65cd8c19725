//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Production code in the streamer crates MUST NOT use blocking I/O.
//! **Required**: Use `tokio::fs`, `tokio::io`, `tokio::net`.

use architectural_enforcement::{blocking_io, scan_production, workspace_root, PRODUCTION_DIRS};

#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = scan_production(blocking_io);

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n❌ FORBIDDEN blocking I/O:");
        eprintln!("  - std::fs::File, std::fs::read_to_string()");
        eprintln!("  - std::net::TcpStream, std::net::TcpListener");
        eprintln!("  - std::process::Command");
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::File::open().await with tokio::io::BufReader");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_production_dirs_exist() {
    let root = workspace_root();
    for dir in PRODUCTION_DIRS {
        assert!(root.join(dir).is_dir(), "missing source tree {dir}");
    }
}
