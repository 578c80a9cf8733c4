//! Architectural Enforcement
//!
//! Source-scanning helpers shared by the enforcement tests in `tests/`:
//! - No sleeping in production code
//! - No blocking I/O inside async functions
//! - The core library stays free of UI and CLI dependencies
//!
//! Scanning is line-based. Everything from the first `#[cfg(test)]` in a
//! file onward is treated as test code and skipped, as are `//` comments.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_SOURCES: &[&str] = &["assistant/core/src", "assistant/cli/src"];

/// A forbidden pattern found in production code
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// File containing the violation
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Offending source line, trimmed
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Workspace root, derived from this crate's manifest directory
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// All `.rs` files under `dir`
pub fn rust_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Production lines of a source file: `(line number, code without comment)`
pub fn production_lines(content: &str) -> Vec<(usize, String)> {
    content
        .lines()
        .take_while(|line| !line.trim_start().starts_with("#[cfg(test)]"))
        .enumerate()
        .map(|(idx, line)| (idx + 1, strip_comment(line).to_string()))
        .collect()
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        // Keep URLs in string literals intact
        Some(pos) if pos > 0 && line[..pos].ends_with(':') => line,
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Whether the function enclosing line `idx` is `async`
pub fn is_in_async_fn(lines: &[(usize, String)], idx: usize) -> bool {
    lines[..=idx]
        .iter()
        .rev()
        .map(|(_, code)| code.trim())
        .find(|code| code.starts_with("fn ") || code.contains(" fn ") || code.starts_with("async fn"))
        .is_some_and(|signature| signature.contains("async fn"))
}

/// Scan production sources with `check`, which sees every line and its context
pub fn scan<F>(check: F) -> Vec<Violation>
where
    F: Fn(&[(usize, String)], usize) -> bool,
{
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in PRODUCTION_SOURCES {
        for path in rust_files(&root.join(dir)) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let lines = production_lines(&content);
            for idx in 0..lines.len() {
                if check(&lines, idx) {
                    violations.push(Violation {
                        path: path.clone(),
                        line: lines[idx].0,
                        text: lines[idx].1.trim().to_string(),
                    });
                }
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let content = "fn a() {}\n// note\n#[cfg(test)]\nmod tests {}\n";
        let lines = production_lines(content);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], (2, String::new()));
    }

    #[test]
    fn test_urls_are_not_comments() {
        assert_eq!(strip_comment("let u = \"http://x\";"), "let u = \"http://x\";");
        assert_eq!(strip_comment("let a = 1; // one"), "let a = 1; ");
    }

    #[test]
    fn test_async_detection() {
        let lines = production_lines("pub async fn run() {\n    work();\n}\nfn sync() {\n    work();\n}\n");
        assert!(is_in_async_fn(&lines, 1));
        assert!(!is_in_async_fn(&lines, 4));
    }

    #[test]
    fn test_sources_exist() {
        for dir in PRODUCTION_SOURCES {
            assert!(
                !rust_files(&workspace_root().join(dir)).is_empty(),
                "no sources under {dir}"
            );
        }
    }
}
