//! Finding types shared by the rules engine, the AI provider boundary, and
//! the policy engine.
//!
//! ## Types
//!
//! - [`Severity`]: the closed rank vocabulary used for filtering
//! - [`Finding`]: a single identified issue with location and suggestion
//!
//! Findings carry their severity as an open string because AI providers use
//! vocabularies of their own (`"high"`, `"blocker"`, ...). Ranking always goes
//! through [`Severity::from_label`], which maps unknown labels to the lowest
//! rank rather than rejecting them.
//!
//! ## Example
//!
//! ```
//! use redline::findings::{Finding, Severity};
//!
//! let finding = Finding::new("no-var-dump", "Debug call left in code", "major", "src/Service.php")
//!     .with_lines(42, 42)
//!     .with_suggestion("Remove the var_dump call");
//!
//! assert_eq!(finding.severity_rank(), Severity::Major.rank());
//! assert_eq!(finding.location(), "src/Service.php:42-42");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed severity vocabulary used for rank comparisons.
///
/// Severities are ordered from least to most critical.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational observation; style notes and minor improvements.
    #[default]
    Info,
    /// Low-severity issue worth a look.
    Minor,
    /// Issue that should be addressed before merging.
    Major,
    /// Security vulnerability or correctness bug.
    Critical,
}

impl Severity {
    /// Ordinal rank used by the policy severity filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use redline::findings::Severity;
    ///
    /// assert_eq!(Severity::Info.rank(), 0);
    /// assert_eq!(Severity::Critical.rank(), 3);
    /// ```
    pub fn rank(&self) -> u8 {
        match self {
            Self::Info => 0,
            Self::Minor => 1,
            Self::Major => 2,
            Self::Critical => 3,
        }
    }

    /// Map an arbitrary severity label to the closed vocabulary.
    ///
    /// Matching is case-insensitive. Labels outside the vocabulary rank as
    /// [`Severity::Info`]; providers are free to invent labels without
    /// breaking the filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use redline::findings::Severity;
    ///
    /// assert_eq!(Severity::from_label("CRITICAL"), Severity::Critical);
    /// assert_eq!(Severity::from_label("blocker"), Severity::Info);
    /// ```
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "minor" => Self::Minor,
            "major" => Self::Major,
            "critical" => Self::Critical,
            _ => Self::Info,
        }
    }

    /// Check whether `label` is one of the four closed vocabulary values.
    ///
    /// Rule configurations must use the closed vocabulary; provider output
    /// need not.
    pub fn is_known_label(label: &str) -> bool {
        matches!(
            label.to_lowercase().as_str(),
            "info" | "minor" | "major" | "critical"
        )
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// A single review finding.
///
/// Produced by the rules engine or an AI provider; the policy engine may
/// rewrite `content` (redaction), relabel aggregated groups, and attaches the
/// `fingerprint`. Producers never set the fingerprint themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Identifier of the rule (or provider category) that raised this.
    pub rule_id: String,
    /// Short human-readable title.
    pub title: String,
    /// Severity label; open vocabulary, ranked via [`Severity::from_label`].
    pub severity: String,
    /// File the finding refers to (diff-relative path).
    pub file_path: String,
    /// First affected line in the post-change file (1-based).
    pub start_line: u32,
    /// Last affected line in the post-change file (1-based).
    pub end_line: u32,
    /// Why this matters.
    #[serde(default)]
    pub rationale: String,
    /// Suggested fix, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// The offending content (usually the added line).
    #[serde(default)]
    pub content: String,
    /// Stable dedup hash; set by the policy engine only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Number of collapsed members when this finding is an aggregate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregated_count: Option<usize>,
}

impl Finding {
    /// Create a new finding with empty rationale/content and no lines set.
    pub fn new(
        rule_id: impl Into<String>,
        title: impl Into<String>,
        severity: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            title: title.into(),
            severity: severity.into(),
            file_path: file_path.into(),
            start_line: 1,
            end_line: 1,
            rationale: String::new(),
            suggestion: None,
            content: String::new(),
            fingerprint: None,
            aggregated_count: None,
        }
    }

    /// Set the affected line span (1-based, inclusive).
    pub fn with_lines(mut self, start: u32, end: u32) -> Self {
        self.start_line = start;
        self.end_line = end;
        self
    }

    /// Set the rationale.
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// Set the suggested fix.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Set the offending content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Rank of this finding's severity label.
    pub fn severity_rank(&self) -> u8 {
        Severity::from_label(&self.severity).rank()
    }

    /// `file:start-end` location string.
    pub fn location(&self) -> String {
        format!("{}:{}-{}", self.file_path, self.start_line, self.end_line)
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({})",
            self.severity.to_uppercase(),
            self.rule_id,
            self.location()
        )
    }
}
