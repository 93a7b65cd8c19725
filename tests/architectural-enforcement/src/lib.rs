//! Architectural Enforcement
//!
//! Source scanners backing the integration tests in `tests/`. They keep the
//! streaming crates honest about two rules:
//! - No blocking I/O in production code (the pipeline runs on tokio)
//! - No bare sleeps; every wait must race cancellation
//!
//! Test modules (`#[cfg(test)]` to end of file) are exempt.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source trees of the workspace, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["streamer/core/src", "streamer/daemon/src"];

/// One offending line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: PathBuf,
    pub line: usize,
    pub rule: &'static str,
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line,
            self.rule,
            self.text
        )
    }
}

/// A line-level rule: returns a rule name when `lines[idx]` breaks it
pub type Rule = fn(lines: &[&str], idx: usize, code: &str) -> Option<&'static str>;

/// Workspace root, two levels above this package
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Scan every production tree with `rule`
pub fn scan_production(rule: Rule) -> Vec<Violation> {
    let root = workspace_root();
    PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| scan_directory(&root.join(dir), rule))
        .collect()
}

/// Scan all `.rs` files below `dir`; a missing directory yields nothing
pub fn scan_directory(dir: &Path, rule: Rule) -> Vec<Violation> {
    let mut violations = Vec::new();
    if !dir.exists() {
        return violations;
    }

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let content = match fs::read_to_string(entry.path()) {
            Ok(c) => c,
            Err(_) => continue,
        };
        violations.extend(scan_source(entry.path(), &content, rule));
    }

    violations
}

/// Apply `rule` to the production part of one file
pub fn scan_source(path: &Path, content: &str, rule: Rule) -> Vec<Violation> {
    let lines: Vec<&str> = content.lines().collect();
    let production = production_line_count(&lines);

    let mut violations = Vec::new();
    for idx in 0..production {
        let line = lines[idx];
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") {
            continue;
        }
        let code = line.split("//").next().unwrap_or(line);
        if let Some(name) = rule(&lines, idx, code) {
            violations.push(Violation {
                path: path.to_path_buf(),
                line: idx + 1,
                rule: name,
                text: line.trim().to_string(),
            });
        }
    }
    violations
}

/// Lines before the first `#[cfg(test)]`
fn production_line_count(lines: &[&str]) -> usize {
    lines
        .iter()
        .position(|l| l.trim_start().starts_with("#[cfg(test)]"))
        .unwrap_or(lines.len())
}

/// Blocking file, network, process, or thread calls
pub fn blocking_io(_lines: &[&str], _idx: usize, code: &str) -> Option<&'static str> {
    if code.contains("std::fs") {
        Some("Blocking file I/O")
    } else if code.contains("std::net") {
        Some("Blocking network I/O")
    } else if code.contains("std::process::Command") {
        Some("Blocking process I/O")
    } else if code.contains("std::io::stdin()") {
        Some("Blocking stdin")
    } else {
        None
    }
}

/// Sleeps that do not race cancellation inside a `select!`
pub fn uncancellable_sleep(lines: &[&str], idx: usize, code: &str) -> Option<&'static str> {
    if code.contains("thread::sleep(") {
        return Some("Thread sleep");
    }
    if (code.contains("::sleep(") || code.contains("sleep_until(")) && !in_select(lines, idx) {
        return Some("Sleep outside select!");
    }
    None
}

/// Whether an open `select!` block precedes `idx` within its arms
fn in_select(lines: &[&str], idx: usize) -> bool {
    for i in (0..idx).rev() {
        let line = lines[i].trim();
        if line.contains("select!") {
            return true;
        }
        if line.starts_with("fn ") || line.contains(" fn ") || line.ends_with(';') {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str, rule: Rule) -> Vec<Violation> {
        scan_source(Path::new("sample.rs"), source, rule)
    }

    #[test]
    fn test_sleep_in_select_allowed() {
        let source = "async fn pace(token: &CancellationToken) -> bool {\n    tokio::select! {\n        () = token.cancelled() => false,\n        () = tokio::time::sleep(delay) => true,\n    }\n}\n";
        assert!(scan(source, uncancellable_sleep).is_empty());
    }

    #[test]
    fn test_bare_sleep_flagged() {
        let source = "async fn poll() {\n    let x = 1;\n    tokio::time::sleep(delay).await;\n}\n";
        let violations = scan(source, uncancellable_sleep);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 3);
    }

    #[test]
    fn test_thread_sleep_flagged_even_in_select() {
        let source = "select! {\n    _ = std::thread::sleep(d) => {}\n}\n";
        assert_eq!(scan(source, uncancellable_sleep)[0].rule, "Thread sleep");
    }

    #[test]
    fn test_test_module_exempt() {
        let source = "fn run() {}\n\n#[cfg(test)]\nmod tests {\n    fn t() { std::fs::read(\"x\"); std::thread::sleep(d); }\n}\n";
        assert!(scan(source, blocking_io).is_empty());
        assert!(scan(source, uncancellable_sleep).is_empty());
    }

    #[test]
    fn test_comments_ignored() {
        let source = "// std::fs::read is blocking\nlet x = 1; // std::net::TcpStream\n";
        assert!(scan(source, blocking_io).is_empty());
    }

    #[test]
    fn test_blocking_io_flagged() {
        let source = "use std::fs::File;\n";
        assert_eq!(scan(source, blocking_io)[0].rule, "Blocking file I/O");
    }
}
