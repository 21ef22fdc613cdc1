//! Provider-aware token estimation and budget enforcement.
//!
//! Token counts are a calibrated character-based heuristic, not a real
//! tokenizer: `ceil(len * provider_multiplier * complexity_multiplier)`. The
//! per-provider base multipliers approximate chars-per-token ratios; the
//! complexity multiplier bumps the estimate for dense code-like text.
//!
//! Degradation paths when a diff does not fit:
//!
//! - [`TokenBudget::filter_trivial_changes`] drops low-value added lines
//! - [`TokenBudget::compress_diff`] drops blanks, collapses block comments,
//!   and truncates with a marker once a budget is reached
//! - [`TokenBudget::enforce_per_file_cap`] keeps diff structure and changed
//!   lines first, then comments, then falls back to proportional truncation
//!
//! Estimates are memoized by content hash. The cache is instance-scoped;
//! concurrent pipeline runs must each own their own `TokenBudget`.

use crate::config::BudgetConfig;
use regex::Regex;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::LazyLock;

/// Default global token cap for a whole diff.
pub const DEFAULT_GLOBAL_CAP: usize = 8000;
/// Default per-file token cap.
pub const DEFAULT_PER_FILE_CAP: usize = 2000;

/// Marker appended when compression truncates a diff.
pub const TRUNCATION_MARKER: &str = "... [content truncated for token budget] ...";

static CODEY_TEXT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\+|-|@@)|\b(class|function|interface|namespace)\b").unwrap()
});

static DECLARATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(class|interface|trait|function|public|private|protected|namespace|use)\b")
        .unwrap()
});

static TRIVIAL_COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(//|#|/\*|\*)?\s*(TODO|FIXME|XXX)\b").unwrap());

static TRIVIAL_IMPORT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^use\s").unwrap());

static TRIVIAL_ANNOTATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/?\*+\s*)?@\w+").unwrap());

static BLOCK_COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*.*?\*/").unwrap());

/// What to do when the global cap would be exceeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowStrategy {
    /// Stop admitting chunks once the cap would be exceeded (default).
    #[default]
    Trim,
    /// Never stop; admit everything regardless of the cap.
    Keep,
}

impl OverflowStrategy {
    /// Parse a strategy label; anything unrecognized falls back to `Trim`.
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "keep" => Self::Keep,
            _ => Self::Trim,
        }
    }
}

/// Token estimator and budget enforcer for one pipeline run.
#[derive(Debug, Clone)]
pub struct TokenBudget {
    global_cap: usize,
    per_file_cap: usize,
    strategy: OverflowStrategy,
    provider: String,
    cache: HashMap<u64, usize>,
}

impl TokenBudget {
    /// Create a budget with explicit caps, strategy, and provider name.
    pub fn new(
        global_cap: usize,
        per_file_cap: usize,
        strategy: OverflowStrategy,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            global_cap,
            per_file_cap,
            strategy,
            provider: provider.into(),
            cache: HashMap::new(),
        }
    }

    /// Build a budget from configuration (defaults: 8000/2000/trim/openai).
    pub fn from_config(config: &BudgetConfig) -> Self {
        Self::new(
            config.diff_token_limit,
            config.per_file_token_cap,
            OverflowStrategy::from_label(&config.overflow_strategy),
            config.provider.clone(),
        )
    }

    /// Global token cap.
    pub fn global_cap(&self) -> usize {
        self.global_cap
    }

    /// Per-file token cap.
    pub fn per_file_cap(&self) -> usize {
        self.per_file_cap
    }

    /// Estimate the token cost of `text` for the configured provider.
    ///
    /// Memoized by content hash; identical text always yields the identical
    /// estimate within one instance.
    pub fn estimate_tokens(&mut self, text: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let key = hasher.finish();
        if let Some(&cached) = self.cache.get(&key) {
            return cached;
        }

        let estimate = (text.len() as f64
            * self.provider_multiplier()
            * Self::complexity_multiplier(text))
        .ceil() as usize;
        self.cache.insert(key, estimate);
        estimate
    }

    /// Drop all memoized estimates.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Chars-per-token approximation for the configured provider.
    fn provider_multiplier(&self) -> f64 {
        match self.provider.to_lowercase().as_str() {
            "anthropic" => 0.28,
            "gemini" => 0.32,
            "mock" => 0.25,
            // openai, ollama, and anything unrecognized
            _ => 0.30,
        }
    }

    /// Density-based complexity factor, 1.0 to 1.5.
    fn complexity_multiplier(text: &str) -> f64 {
        if text.is_empty() {
            return 1.0;
        }
        let mut multiplier: f64 = 1.0;

        if CODEY_TEXT_REGEX.is_match(text) {
            multiplier += 0.1;
        }

        let len = text.len() as f64;
        let punctuation = text
            .chars()
            .filter(|c| matches!(c, '{' | '}' | '(' | ')' | ';' | ',' | '[' | ']' | '<' | '>'))
            .count() as f64;
        if punctuation / len > 0.05 {
            multiplier += 0.1;
        }

        let whitespace = text.chars().filter(|c| c.is_whitespace()).count() as f64;
        if whitespace / len > 0.30 {
            multiplier += 0.05;
        }

        multiplier.min(1.5)
    }

    /// Whether admitting `incoming` tokens on top of `used` must stop the run.
    ///
    /// Only the `Trim` strategy ever stops; `Keep` admits everything.
    pub fn should_stop(&self, used: usize, incoming: usize) -> bool {
        used + incoming > self.global_cap && self.strategy == OverflowStrategy::Trim
    }

    /// Tokens left under the global cap after `used` have been spent.
    pub fn remaining_budget(&self, used: usize) -> usize {
        self.global_cap.saturating_sub(used)
    }

    /// Return `content` unchanged if it fits the per-file cap, otherwise a
    /// smart-truncated version of it.
    pub fn enforce_per_file_cap(&mut self, content: &str) -> String {
        if self.estimate_tokens(content) <= self.per_file_cap {
            return content.to_string();
        }
        self.smart_truncate(content)
    }

    /// Priority-ordered truncation: diff structure and changed lines always
    /// survive, comments are kept while they fit, then proportional
    /// character truncation as a last resort.
    fn smart_truncate(&mut self, content: &str) -> String {
        let lines: Vec<&str> = content.lines().collect();

        let mut result = lines
            .iter()
            .copied()
            .filter(|l| line_priority(l) >= 3)
            .collect::<Vec<_>>()
            .join("\n");

        for line in lines.iter().copied().filter(|l| line_priority(l) == 2) {
            let candidate = if result.is_empty() {
                line.to_string()
            } else {
                format!("{result}\n{line}")
            };
            if self.estimate_tokens(&candidate) > self.per_file_cap {
                break;
            }
            result = candidate;
        }

        let estimated = self.estimate_tokens(&result);
        if estimated > self.per_file_cap && estimated > 0 {
            let target = result.len() * self.per_file_cap / estimated;
            result = truncate_at_char_boundary(&result, target);
        }
        result
    }

    /// Compress a diff to roughly `max_tokens`: blank lines dropped, block
    /// comments on added lines collapsed, tail truncated with a marker.
    pub fn compress_diff(&mut self, diff: &str, max_tokens: usize) -> String {
        let mut kept: Vec<String> = Vec::new();
        let mut acc = String::new();

        for line in diff.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let line = if line.starts_with('+') && !line.starts_with("+++") {
                BLOCK_COMMENT_REGEX.replace_all(line, "/* ... */").into_owned()
            } else {
                line.to_string()
            };

            let candidate = if acc.is_empty() {
                line.clone()
            } else {
                format!("{acc}\n{line}")
            };
            if self.estimate_tokens(&candidate) > max_tokens {
                kept.push(TRUNCATION_MARKER.to_string());
                return kept.join("\n");
            }
            acc = candidate;
            kept.push(line);
        }
        kept.join("\n")
    }

    /// Drop low-value added lines: whitespace-only, TODO/FIXME/XXX comments,
    /// `use` imports, and DocBlock `@`-annotations. Everything else passes
    /// through in order, including deletions, context, and headers.
    pub fn filter_trivial_changes(diff: &str) -> String {
        let ends_with_newline = diff.ends_with('\n');
        let mut kept: Vec<&str> = Vec::new();

        for line in diff.lines() {
            if line.starts_with('+') && !line.starts_with("+++") {
                let content = line[1..].trim();
                let trivial = content.is_empty()
                    || TRIVIAL_COMMENT_REGEX.is_match(content)
                    || TRIVIAL_IMPORT_REGEX.is_match(content)
                    || TRIVIAL_ANNOTATION_REGEX.is_match(content);
                if trivial {
                    continue;
                }
            }
            kept.push(line);
        }

        let mut out = kept.join("\n");
        if ends_with_newline && !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

/// Truncation priority of one diff line. Higher survives longer.
fn line_priority(line: &str) -> u8 {
    if line.starts_with("diff --git")
        || line.starts_with("@@")
        || line.starts_with("+++")
        || line.starts_with("---")
        || line.starts_with("\\ No newline")
    {
        return 4;
    }
    if line.starts_with('+') || line.starts_with('-') || DECLARATION_REGEX.is_match(line) {
        return 3;
    }
    let trimmed = line.trim_start();
    if trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
        || trimmed.starts_with('#')
    {
        return 2;
    }
    if line.trim().is_empty() { 0 } else { 1 }
}

fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
