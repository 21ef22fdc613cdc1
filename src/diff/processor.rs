//! Per-file diff block splitting and path exclusion.
//!
//! A multi-file unified diff is split at each `diff --git a/... b/...` line
//! into one block per file (header line through the last hunk line). Blocks
//! for excluded paths are dropped before chunking ever sees them.
//!
//! Exclusion patterns come in three forms, tried in this order per pattern:
//!
//! 1. trailing `/` — explicit directory prefix (`vendor/`)
//! 2. bare names without a `.` that contain `/` or look like a well-known
//!    directory (`vendor`, `node_modules`, ...) — tried as a directory
//!    prefix first, then as a glob
//! 3. anything else — a shell-style glob over the full relative path
//!    (`*` does not cross `/`)
//!
//! A file is excluded if any pattern matches.

use crate::globs;
use regex::Regex;
use std::sync::LazyLock;

static DIFF_GIT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^diff --git a/(.+) b/(.+)$").unwrap());

static HUNK_START_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@ -\d+(?:,\d+)? \+(\d+)(?:,\d+)? @@").unwrap());

/// Directory names treated as directory prefixes even without a trailing `/`.
const COMMON_DIR_NAMES: &[&str] = &[
    "vendor",
    "node_modules",
    "build",
    "dist",
    "target",
    "bin",
    "obj",
    "out",
    "tmp",
    "temp",
    "cache",
    "coverage",
    "logs",
    "src",
    "test",
    "tests",
    "spec",
    "docs",
];

/// One file's slice of a multi-file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiffBlock {
    /// Diff-relative path, `b/`-prefixed as it appears in the header.
    pub path: String,
    /// Raw diff text for this file, right-trimmed with one trailing newline.
    pub diff: String,
}

/// Splits full diffs into per-file blocks and filters excluded paths.
#[derive(Debug, Clone, Default)]
pub struct DiffProcessor {
    exclude_patterns: Vec<String>,
}

impl DiffProcessor {
    /// Create a processor with the given ordered exclusion patterns.
    pub fn new(exclude_patterns: Vec<String>) -> Self {
        Self { exclude_patterns }
    }

    /// Split `full_diff` into per-file blocks, dropping excluded files.
    ///
    /// Blocks keep their encounter order. Without exclusion patterns this is
    /// an identity split. Text before the first `diff --git` line is ignored.
    pub fn extract_file_diffs(&self, full_diff: &str) -> Vec<FileDiffBlock> {
        let mut blocks: Vec<FileDiffBlock> = Vec::new();
        let mut current: Option<(String, Vec<&str>)> = None;

        let mut finish = |blocks: &mut Vec<FileDiffBlock>, entry: Option<(String, Vec<&str>)>| {
            if let Some((path, lines)) = entry {
                let mut diff = lines.join("\n").trim_end().to_string();
                diff.push('\n');
                blocks.push(FileDiffBlock { path, diff });
            }
        };

        for line in full_diff.lines() {
            if let Some(cap) = DIFF_GIT_REGEX.captures(line) {
                finish(&mut blocks, current.take());
                current = Some((format!("b/{}", &cap[2]), vec![line]));
            } else if let Some((_, lines)) = current.as_mut() {
                lines.push(line);
            }
        }
        finish(&mut blocks, current.take());

        blocks
            .into_iter()
            .filter(|b| {
                let rel = b.path.strip_prefix("b/").unwrap_or(&b.path);
                let excluded = self.is_excluded(rel);
                if excluded {
                    tracing::debug!(path = rel, "excluded from review");
                }
                !excluded
            })
            .collect()
    }

    /// Check whether `rel_path` (no `b/` prefix) matches any exclude pattern.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern_matches(pattern, rel_path))
    }

    /// Target start line of the first hunk in a block, or 0 when none found.
    pub fn extract_start_line(block: &str) -> u32 {
        for line in block.lines() {
            if let Some(cap) = HUNK_START_REGEX.captures(line) {
                return cap[1].parse().unwrap_or(1).max(1);
            }
        }
        0
    }
}

fn dir_prefix_matches(dir: &str, path: &str) -> bool {
    path == dir || path.starts_with(&format!("{dir}/"))
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    if let Some(dir) = pattern.strip_suffix('/') {
        return dir_prefix_matches(dir, path);
    }

    let looks_like_dir = !pattern.contains('.')
        && (pattern.contains('/') || COMMON_DIR_NAMES.contains(&pattern));
    if looks_like_dir && dir_prefix_matches(pattern, path) {
        return true;
    }

    globs::matches(pattern, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FILE_DIFF: &str = "\
diff --git a/src/a.rs b/src/a.rs
index 111..222 100644
--- a/src/a.rs
+++ b/src/a.rs
@@ -1,2 +1,3 @@
 fn main() {
+    println!(\"hi\");
 }
diff --git a/README.md b/README.md
index 333..444 100644
--- a/README.md
+++ b/README.md
@@ -5,0 +6,1 @@
+new docs line
";

    // =========================================
    // Block splitting
    // =========================================

    #[test]
    fn test_splits_into_one_block_per_file() {
        let processor = DiffProcessor::default();
        let blocks = processor.extract_file_diffs(TWO_FILE_DIFF);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].path, "b/src/a.rs");
        assert_eq!(blocks[1].path, "b/README.md");
    }

    #[test]
    fn test_block_contains_header_through_last_hunk_line() {
        let processor = DiffProcessor::default();
        let blocks = processor.extract_file_diffs(TWO_FILE_DIFF);

        assert!(blocks[0].diff.starts_with("diff --git a/src/a.rs"));
        assert!(blocks[0].diff.contains("@@ -1,2 +1,3 @@"));
        assert!(blocks[0].diff.contains("+    println!(\"hi\");"));
        assert!(!blocks[0].diff.contains("README"));
    }

    #[test]
    fn test_blocks_end_with_exactly_one_newline() {
        let processor = DiffProcessor::default();
        for block in processor.extract_file_diffs(TWO_FILE_DIFF) {
            assert!(block.diff.ends_with('\n'));
            assert!(!block.diff.ends_with("\n\n"));
        }
    }

    #[test]
    fn test_preamble_before_first_diff_git_is_ignored() {
        let diff = format!("commit abc123\nAuthor: someone\n\n{TWO_FILE_DIFF}");
        let processor = DiffProcessor::default();
        assert_eq!(processor.extract_file_diffs(&diff).len(), 2);
    }

    #[test]
    fn test_empty_input_yields_no_blocks() {
        let processor = DiffProcessor::default();
        assert!(processor.extract_file_diffs("").is_empty());
    }

    // =========================================
    // Exclusion filtering
    // =========================================

    #[test]
    fn test_mixed_exclusion_pattern_forms() {
        let processor = DiffProcessor::new(vec![
            "*.md".into(),
            "vendor".into(),
            "composer.lock".into(),
        ]);

        assert!(processor.is_excluded("README.md"));
        assert!(processor.is_excluded("vendor/autoload.php"));
        assert!(processor.is_excluded("composer.lock"));
        assert!(!processor.is_excluded("src/Service.php"));
    }

    #[test]
    fn test_trailing_slash_is_directory_prefix() {
        let processor = DiffProcessor::new(vec!["vendor/".into()]);
        assert!(processor.is_excluded("vendor"));
        assert!(processor.is_excluded("vendor/lib/a.php"));
        assert!(!processor.is_excluded("vendored/a.php"));
    }

    #[test]
    fn test_common_dir_name_without_slash() {
        let processor = DiffProcessor::new(vec!["node_modules".into()]);
        assert!(processor.is_excluded("node_modules/left-pad/index.js"));
        assert!(!processor.is_excluded("my_node_modules/x.js"));
    }

    #[test]
    fn test_slash_pattern_without_dot_tries_directory_first() {
        let processor = DiffProcessor::new(vec!["generated/protos".into()]);
        assert!(processor.is_excluded("generated/protos/api.rs"));
        assert!(processor.is_excluded("generated/protos"));
    }

    #[test]
    fn test_glob_star_does_not_cross_separator() {
        let processor = DiffProcessor::new(vec!["*.md".into()]);
        assert!(processor.is_excluded("README.md"));
        assert!(!processor.is_excluded("docs/README.md"));
    }

    #[test]
    fn test_no_excludes_is_identity_passthrough() {
        let processor = DiffProcessor::default();
        let blocks = processor.extract_file_diffs(TWO_FILE_DIFF);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_exclusion_applies_to_stripped_path() {
        // patterns match the path without the `b/` prefix
        let processor = DiffProcessor::new(vec!["README.md".into()]);
        let blocks = processor.extract_file_diffs(TWO_FILE_DIFF);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].path, "b/src/a.rs");
    }

    // =========================================
    // Start-line extraction
    // =========================================

    #[test]
    fn test_extract_start_line_first_hunk() {
        let block = "diff --git a/x b/x\n+++ b/x\n@@ -3,2 +42,5 @@\n+line\n@@ -9,1 +90,1 @@\n+more\n";
        assert_eq!(DiffProcessor::extract_start_line(block), 42);
    }

    #[test]
    fn test_extract_start_line_no_hunk_is_zero() {
        assert_eq!(DiffProcessor::extract_start_line("diff --git a/x b/x\n"), 0);
    }

    #[test]
    fn test_extract_start_line_clamps_to_one() {
        let block = "@@ -0,0 +0,0 @@\n";
        assert_eq!(DiffProcessor::extract_start_line(block), 1);
    }
}
