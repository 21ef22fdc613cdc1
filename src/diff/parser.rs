//! Added-line parser for unified diffs.
//!
//! Walks a unified diff and records, per file, every line the diff introduces
//! together with its 1-based line number in the post-change file. Deletions
//! and context lines are invisible to consumers; only `+` lines are recorded.
//!
//! Note on line accounting: the running target-line counter advances only on
//! added lines. Context lines deliberately do not advance it, which diverges
//! from strict unified-diff semantics. Downstream rule evaluation depends on
//! this accounting, so it must not be "fixed" to track context lines.
//!
//! Parsing never fails: malformed input yields fewer or no entries.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static FILE_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\+\+ b/(.*)$").unwrap());

static HUNK_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@ -\d+(?:,\d+)? \+(\d+)(?:,\d+)? @@").unwrap());

/// One line introduced by the diff, scoped to a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedLine {
    /// 1-based line number in the post-change file.
    pub line: u32,
    /// Line content without the leading `+`.
    pub content: String,
}

/// All added lines for one file, in diff order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAdditions {
    /// Path from the `+++ b/` header (empty when no header preceded a hunk).
    pub path: String,
    /// Added lines in the order the diff introduces them.
    pub lines: Vec<AddedLine>,
}

/// Parse a unified diff into per-file added lines.
///
/// Files appear in encounter order. A file is registered as soon as its
/// `+++ b/` header is seen, so deletion-only files are present with an empty
/// line list. A hunk with no preceding header accumulates under the
/// empty-string path.
///
/// # Examples
///
/// ```
/// use redline::diff::parse_added_lines;
///
/// let diff = "+++ b/src/a.php\n@@ -1,2 +10,3 @@\n+echo \"hi\";\n+echo \"yo\";\n";
/// let files = parse_added_lines(diff);
/// assert_eq!(files[0].path, "src/a.php");
/// assert_eq!(files[0].lines[0].line, 10);
/// assert_eq!(files[0].lines[1].line, 11);
/// ```
pub fn parse_added_lines(diff_text: &str) -> Vec<FileAdditions> {
    let mut files: Vec<FileAdditions> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut current_file = String::new();
    let mut counter: Option<u32> = None;

    let mut register = |files: &mut Vec<FileAdditions>, path: &str| -> usize {
        if let Some(&idx) = index.get(path) {
            return idx;
        }
        files.push(FileAdditions {
            path: path.to_string(),
            lines: Vec::new(),
        });
        let idx = files.len() - 1;
        index.insert(path.to_string(), idx);
        idx
    };

    let mut lines = diff_text.split('\n').collect::<Vec<_>>();
    // split leaves one empty trailing element when the input ends with \n
    if lines.last() == Some(&"") {
        lines.pop();
    }

    for line in lines {
        if let Some(cap) = FILE_HEADER_REGEX.captures(line) {
            current_file = cap[1].to_string();
            register(&mut files, &current_file);
            counter = None;
            continue;
        }
        if let Some(cap) = HUNK_HEADER_REGEX.captures(line) {
            // register even the headerless empty-string file key
            register(&mut files, &current_file);
            counter = cap[1].parse::<u32>().ok();
            continue;
        }
        if let Some(n) = counter {
            if line.starts_with('+') && !line.starts_with("+++") {
                let idx = register(&mut files, &current_file);
                files[idx].lines.push(AddedLine {
                    line: n,
                    content: line[1..].to_string(),
                });
                counter = Some(n + 1);
            }
            // deletions and context lines neither advance the counter nor
            // produce entries
        }
    }

    files
}
