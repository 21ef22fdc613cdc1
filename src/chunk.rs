//! Chunk building: turn a multi-file diff into per-file review chunks that
//! fit the token budget.
//!
//! Files are processed strictly in encounter order and cumulative token
//! usage only grows, so the loop terminates: when a file would blow the
//! global cap the builder makes at most one compression attempt against the
//! remaining budget, then either admits the compressed block or stops
//! processing further files entirely (no partial inclusion).
//!
//! Semantic grouping, when enabled, classifies each chunk into a coarse
//! context and logs contiguous same-context runs; it never reorders or drops
//! chunks.

use crate::budget::TokenBudget;
use crate::diff::DiffProcessor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Minimum remaining budget worth spending a compression attempt on.
const COMPRESSION_FLOOR_TOKENS: usize = 100;

static CLASS_DEFINITION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(class|interface|trait|enum|struct)\s+\w").unwrap());

static METHOD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(function|fn|def)\s+\w").unwrap());

static VARIABLE_ASSIGNMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\$\w+|\b(let|const|var)\s+\w+)\s*=[^=]").unwrap());

static CONTROL_FLOW_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(if|for|foreach|while|switch|match)\b\s*[\s(]").unwrap());

static IMPORTS_NAMESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(use|import|require|namespace)\s+\w").unwrap());

static DOCUMENTATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)/\*\*|^\s*\*\s|^\+?\s*(//|#)\s").unwrap());

/// The unit of work handed to an AI provider: one file's diff plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewChunk {
    /// File path, `b/`-prefixed as it appears in the diff header.
    pub file: String,
    /// Target line of the file's first hunk, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    /// The (possibly compressed or truncated) unified diff text.
    pub unified_diff: String,
}

/// Coarse semantic context of a chunk, used only for grouping diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticContext {
    ClassDefinition,
    Method,
    VariableAssignment,
    ControlFlow,
    ImportsNamespace,
    Documentation,
    General,
}

impl SemanticContext {
    /// Classify lower-cased diff text, checking contexts in priority order.
    pub fn classify(diff_text: &str) -> Self {
        let lowered = diff_text.to_lowercase();
        if CLASS_DEFINITION_REGEX.is_match(&lowered) {
            Self::ClassDefinition
        } else if METHOD_REGEX.is_match(&lowered) {
            Self::Method
        } else if VARIABLE_ASSIGNMENT_REGEX.is_match(&lowered) {
            Self::VariableAssignment
        } else if CONTROL_FLOW_REGEX.is_match(&lowered) {
            Self::ControlFlow
        } else if IMPORTS_NAMESPACE_REGEX.is_match(&lowered) {
            Self::ImportsNamespace
        } else if DOCUMENTATION_REGEX.is_match(&lowered) {
            Self::Documentation
        } else {
            Self::General
        }
    }

    /// Stable name used in group diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ClassDefinition => "class_definition",
            Self::Method => "method",
            Self::VariableAssignment => "variable_assignment",
            Self::ControlFlow => "control_flow",
            Self::ImportsNamespace => "imports_namespace",
            Self::Documentation => "documentation",
            Self::General => "general",
        }
    }
}

/// Builds budgeted per-file chunks from a full diff.
#[derive(Debug)]
pub struct ChunkBuilder {
    budget: TokenBudget,
    processor: DiffProcessor,
    semantic_chunking: bool,
}

impl ChunkBuilder {
    /// Create a builder from its two collaborators.
    pub fn new(budget: TokenBudget, processor: DiffProcessor, semantic_chunking: bool) -> Self {
        Self {
            budget,
            processor,
            semantic_chunking,
        }
    }

    /// Build review chunks for `full_diff`, in file-encounter order.
    pub fn build_chunks(&mut self, full_diff: &str) -> Vec<ReviewChunk> {
        let filtered = TokenBudget::filter_trivial_changes(full_diff);
        let blocks = self.processor.extract_file_diffs(&filtered);

        let mut chunks = Vec::with_capacity(blocks.len());
        let mut used: usize = 0;

        for block in blocks {
            let start_line = DiffProcessor::extract_start_line(&block.diff);
            let mut content = block.diff;
            let mut estimate = self.budget.estimate_tokens(&content);

            if self.budget.should_stop(used, estimate) {
                let remaining = self.budget.remaining_budget(used);
                let mut admitted = false;
                if remaining > COMPRESSION_FLOOR_TOKENS {
                    let compressed = self.budget.compress_diff(&content, remaining);
                    let compressed_estimate = self.budget.estimate_tokens(&compressed);
                    if !self.budget.should_stop(used, compressed_estimate) {
                        tracing::debug!(
                            file = %block.path,
                            from = estimate,
                            to = compressed_estimate,
                            "compressed to fit remaining budget"
                        );
                        content = compressed;
                        estimate = compressed_estimate;
                        admitted = true;
                    }
                }
                if !admitted {
                    tracing::debug!(
                        file = %block.path,
                        used,
                        estimate,
                        "global token cap reached; dropping remaining files"
                    );
                    break;
                }
            }

            let content = self.budget.enforce_per_file_cap(&content);
            let estimate = self.budget.estimate_tokens(&content);

            chunks.push(ReviewChunk {
                file: block.path,
                start_line: (start_line > 0).then_some(start_line),
                unified_diff: content,
            });
            used += estimate;
        }

        if self.semantic_chunking {
            Self::flatten_semantic_groups(chunks)
        } else {
            chunks
        }
    }

    /// Group contiguous same-context chunks, log the grouping, and flatten
    /// back in the original order.
    fn flatten_semantic_groups(chunks: Vec<ReviewChunk>) -> Vec<ReviewChunk> {
        let mut groups: Vec<(SemanticContext, Vec<ReviewChunk>)> = Vec::new();
        for chunk in chunks {
            let context = SemanticContext::classify(&chunk.unified_diff);
            match groups.last_mut() {
                Some((current, members)) if *current == context => members.push(chunk),
                _ => groups.push((context, vec![chunk])),
            }
        }

        for (context, members) in &groups {
            tracing::debug!(
                context = context.name(),
                chunks = members.len(),
                "semantic group"
            );
        }

        groups.into_iter().flat_map(|(_, members)| members).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{OverflowStrategy, TRUNCATION_MARKER};

    fn file_block(path: &str, added: &[&str], start: u32) -> String {
        let mut s = format!(
            "diff --git a/{path} b/{path}\n--- a/{path}\n+++ b/{path}\n@@ -1,1 +{start},{} @@\n",
            added.len()
        );
        for line in added {
            s.push_str(&format!("+{line}\n"));
        }
        s
    }

    fn builder(global: usize, per_file: usize) -> ChunkBuilder {
        ChunkBuilder::new(
            TokenBudget::new(global, per_file, OverflowStrategy::Trim, "openai"),
            DiffProcessor::default(),
            false,
        )
    }

    // =========================================
    // Chunk construction
    // =========================================

    #[test]
    fn test_one_chunk_per_file_in_encounter_order() {
        let diff = format!(
            "{}{}",
            file_block("src/z.rs", &["let z = 1;"], 5),
            file_block("src/a.rs", &["let a = 2;"], 9)
        );
        let chunks = builder(10_000, 2_000).build_chunks(&diff);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].file, "b/src/z.rs");
        assert_eq!(chunks[1].file, "b/src/a.rs");
    }

    #[test]
    fn test_chunk_carries_first_hunk_start_line() {
        let diff = file_block("src/a.rs", &["let a = 2;"], 42);
        let chunks = builder(10_000, 2_000).build_chunks(&diff);
        assert_eq!(chunks[0].start_line, Some(42));
    }

    #[test]
    fn test_chunk_without_hunk_omits_start_line() {
        let diff = "diff --git a/x.bin b/x.bin\nBinary files differ\n";
        let chunks = builder(10_000, 2_000).build_chunks(diff);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, None);
    }

    #[test]
    fn test_chunk_invariant_diff_marker_present() {
        let diff = file_block("src/a.rs", &["let a = 2;"], 1);
        let chunks = builder(10_000, 2_000).build_chunks(&diff);
        for chunk in &chunks {
            assert!(!chunk.unified_diff.is_empty());
            assert!(
                chunk.unified_diff.contains("diff --git") || chunk.unified_diff.contains("@@")
            );
        }
    }

    #[test]
    fn test_trivial_changes_filtered_before_chunking() {
        let diff = file_block("src/a.php", &["use App\\Thing;", "real();"], 1);
        let chunks = builder(10_000, 2_000).build_chunks(&diff);
        assert!(!chunks[0].unified_diff.contains("use App"));
        assert!(chunks[0].unified_diff.contains("+real();"));
    }

    // =========================================
    // Budget behavior
    // =========================================

    #[test]
    fn test_files_after_budget_stop_are_omitted() {
        let big_line = "x".repeat(400);
        let diff = format!(
            "{}{}{}",
            file_block("a.rs", &[&big_line], 1),
            file_block("b.rs", &[&big_line], 1),
            file_block("c.rs", &[&big_line], 1)
        );
        // roughly one big file fits; remaining budget after it is too small
        // for compression to rescue the second
        let chunks = builder(200, 10_000).build_chunks(&diff);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].file, "b/a.rs");
    }

    #[test]
    fn test_compression_rescues_a_file_when_budget_allows() {
        let small = file_block("a.rs", &["let a = 1;"], 1);
        // a file dominated by collapsible block comments: compression shrinks
        // it under the remaining budget without needing the truncation marker
        let padding = "pad ".repeat(60);
        let big_lines: Vec<String> = (0..30)
            .map(|i| format!("call_{i}(); /* {padding} */"))
            .collect();
        let big_refs: Vec<&str> = big_lines.iter().map(|s| s.as_str()).collect();
        let big = file_block("b.rs", &big_refs, 1);

        let chunks = builder(400, 10_000).build_chunks(&format!("{small}{big}"));
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].unified_diff.contains("/* ... */"));
        assert!(!chunks[1].unified_diff.contains("pad pad"));
        assert!(!chunks[1].unified_diff.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_keep_strategy_admits_everything() {
        let big_line = "x".repeat(400);
        let diff = format!(
            "{}{}",
            file_block("a.rs", &[&big_line], 1),
            file_block("b.rs", &[&big_line], 1)
        );
        let mut builder = ChunkBuilder::new(
            TokenBudget::new(10, 10_000, OverflowStrategy::Keep, "openai"),
            DiffProcessor::default(),
            false,
        );
        assert_eq!(builder.build_chunks(&diff).len(), 2);
    }

    #[test]
    fn test_per_file_cap_applied_to_admitted_chunks() {
        let big_lines: Vec<String> = (0..80)
            .map(|i| format!("padding content for line number {i}"))
            .collect();
        let big_refs: Vec<&str> = big_lines.iter().map(|s| s.as_str()).collect();
        let diff = file_block("a.rs", &big_refs, 1);

        let mut b = builder(100_000, 50);
        let chunks = b.build_chunks(&diff);
        assert_eq!(chunks.len(), 1);
        // truncated to the cap, structure preserved
        assert!(chunks[0].unified_diff.contains("diff --git"));
        assert!(chunks[0].unified_diff.len() < diff.len());
    }

    #[test]
    fn test_empty_diff_yields_no_chunks() {
        assert!(builder(8000, 2000).build_chunks("").is_empty());
        assert!(builder(8000, 2000).build_chunks("not a diff at all\n").is_empty());
    }

    // =========================================
    // Semantic classification
    // =========================================

    #[test]
    fn test_classify_priority_order() {
        assert_eq!(
            SemanticContext::classify("+class Foo {\n+function bar() {}\n"),
            SemanticContext::ClassDefinition
        );
        assert_eq!(
            SemanticContext::classify("+function bar() { $x = 1; }"),
            SemanticContext::Method
        );
        assert_eq!(
            SemanticContext::classify("+$total = 12;"),
            SemanticContext::VariableAssignment
        );
        assert_eq!(
            SemanticContext::classify("+if (ready) { go(); }"),
            SemanticContext::ControlFlow
        );
        assert_eq!(
            SemanticContext::classify("+import collections"),
            SemanticContext::ImportsNamespace
        );
        assert_eq!(
            SemanticContext::classify("+// explains the thing\n"),
            SemanticContext::Documentation
        );
        assert_eq!(
            SemanticContext::classify("+plain text line"),
            SemanticContext::General
        );
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(
            SemanticContext::classify("+CLASS Foo {"),
            SemanticContext::ClassDefinition
        );
    }

    #[test]
    fn test_semantic_grouping_preserves_order_and_count() {
        let diff = format!(
            "{}{}{}",
            file_block("a.rs", &["class A {}"], 1),
            file_block("b.rs", &["class B {}"], 1),
            file_block("c.rs", &["if (x) { y(); }"], 1)
        );
        let mut grouped = ChunkBuilder::new(
            TokenBudget::new(10_000, 2_000, OverflowStrategy::Trim, "openai"),
            DiffProcessor::default(),
            true,
        );
        let mut plain = builder(10_000, 2_000);

        let with_groups = grouped.build_chunks(&diff);
        let without = plain.build_chunks(&diff);

        assert_eq!(with_groups, without);
    }
}
