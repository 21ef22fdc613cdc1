//! Anchored glob matching for rule applicability and path exclusion.
//!
//! Translates shell-style globs to regexes with path-separator-aware
//! semantics:
//!
//! - `**` matches any sequence of path segments (crosses `/`); `**/` also
//!   matches zero segments, so `**/*.php` covers top-level files
//! - `*` matches within a single segment (never crosses `/`)
//! - `?` matches one character other than `/`
//!
//! Every other character is escaped before substitution, so user-supplied
//! patterns cannot inject regex syntax. Matches are anchored: the whole path
//! must match, not a substring.

use regex::Regex;

/// Translate a glob pattern into an anchored regex string.
pub fn to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if bytes.get(i + 1) == Some(&b'*') {
                    if bytes.get(i + 2) == Some(&b'/') {
                        // `**/` matches zero or more whole segments
                        out.push_str("(?:.*/)?");
                        i += 3;
                    } else {
                        out.push_str(".*");
                        i += 2;
                    }
                } else {
                    out.push_str("[^/]*");
                    i += 1;
                }
            }
            b'?' => {
                out.push_str("[^/]");
                i += 1;
            }
            _ => {
                // pattern is valid UTF-8; take the full char at this position
                let ch_len = pattern[i..].chars().next().map_or(1, |c| c.len_utf8());
                out.push_str(&regex::escape(&pattern[i..i + ch_len]));
                i += ch_len;
            }
        }
    }

    out.push('$');
    out
}

/// Compile a glob pattern into an anchored [`Regex`].
///
/// All regex metacharacters in the pattern are escaped during translation, so
/// compilation cannot fail for any input; the signature stays infallible.
pub fn compile(pattern: &str) -> Regex {
    // The translated pattern only contains escaped literals and the three
    // fixed substitutions, all of which are valid regex.
    Regex::new(&to_regex(pattern)).unwrap_or_else(|_| Regex::new("$^").unwrap())
}

/// Match `path` against a glob pattern (anchored, full-path).
pub fn matches(pattern: &str, path: &str) -> bool {
    compile(pattern).is_match(path)
}
