//! Finding normalization: consolidation, limits, severity filtering,
//! fingerprint deduplication, secret redaction, and the global comment cap.
//!
//! Stage order is load-bearing; later stages see the output of earlier
//! ones:
//!
//! 1. consolidation of similar findings (optional)
//! 2. per-file and per-severity output limits
//! 3. severity-rank filter, fingerprint dedup, redaction, global cap
//!
//! Fingerprints are SHA-1 over `file|start|end|rule|content` and are computed
//! before redaction rewrites the content, so redaction does not change a
//! finding's identity. The dedup set is owned by one `apply` call; concurrent
//! runs never share it.

use crate::config::PolicyConfig;
use crate::findings::{Finding, Severity};
use regex::Regex;
use sha1::{Digest, Sha1};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Per-severity limit used when `severity_limits` has no entry.
const UNLIMITED_SEVERITY: usize = 999;

/// Max distinct file paths spelled out on an aggregated finding.
const AGGREGATED_PATHS_SHOWN: usize = 3;

static SECRET_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(password|secret|api[_-]?key)(\s*[:=]\s*)([^"'\s]{4,})"#).unwrap()
});

/// Applies the configured output policy to a merged finding list.
#[derive(Debug, Clone)]
pub struct Policy {
    config: PolicyConfig,
}

impl Policy {
    /// Create a policy from its configuration.
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Run the full policy pipeline over `findings`.
    ///
    /// The output is a prefix-bounded (≤ `max_comments`), deduplicated,
    /// severity-filtered list; every emitted finding carries a fingerprint.
    pub fn apply(&self, findings: Vec<Finding>) -> Vec<Finding> {
        let input_count = findings.len();

        let findings = if self.config.consolidate_similar_findings {
            self.consolidate(findings)
        } else {
            findings
        };
        let findings = self.apply_output_limits(findings);
        let output = self.filter_dedup_redact(findings);

        tracing::debug!(
            input = input_count,
            output = output.len(),
            "policy applied"
        );
        output
    }

    /// Stage 1: collapse groups of similar findings into one aggregate each.
    ///
    /// Similarity signature: rule id, severity, and the first 20 characters
    /// of the title. Groups keep first-occurrence order; singleton groups
    /// pass through unchanged.
    fn consolidate(&self, findings: Vec<Finding>) -> Vec<Finding> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Finding>> = HashMap::new();

        for finding in findings {
            let title_prefix: String = finding.title.chars().take(20).collect();
            let signature = format!("{}|{}|{}", finding.rule_id, finding.severity, title_prefix);
            if !groups.contains_key(&signature) {
                order.push(signature.clone());
            }
            groups.entry(signature).or_default().push(finding);
        }

        order
            .into_iter()
            .map(|signature| {
                let mut members = groups.remove(&signature).expect("group exists");
                if members.len() == 1 {
                    return members.pop().expect("one member");
                }
                Self::aggregate(members)
            })
            .collect()
    }

    /// Collapse a multi-member group into a single aggregated finding.
    fn aggregate(members: Vec<Finding>) -> Finding {
        let count = members.len();
        let mut distinct_paths: Vec<&str> = Vec::new();
        for member in &members {
            if !distinct_paths.contains(&member.file_path.as_str()) {
                distinct_paths.push(&member.file_path);
            }
        }

        let mut file_path = distinct_paths
            .iter()
            .take(AGGREGATED_PATHS_SHOWN)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        if distinct_paths.len() > AGGREGATED_PATHS_SHOWN {
            file_path.push_str(&format!(
                " +{} more",
                distinct_paths.len() - AGGREGATED_PATHS_SHOWN
            ));
        }

        let first = members.into_iter().next().expect("non-empty group");
        Finding {
            title: format!("Aggregated: {}", first.title),
            file_path,
            rationale: format!("Found in {count} locations"),
            aggregated_count: Some(count),
            ..first
        }
    }

    /// Stage 2: enforce per-file and per-severity output limits in order.
    fn apply_output_limits(&self, findings: Vec<Finding>) -> Vec<Finding> {
        let mut per_file: HashMap<String, usize> = HashMap::new();
        let mut per_severity: HashMap<String, usize> = HashMap::new();
        let mut kept = Vec::with_capacity(findings.len());

        for finding in findings {
            let severity = finding.severity.to_lowercase();
            let file_count = per_file.get(&finding.file_path).copied().unwrap_or(0);
            let severity_count = per_severity.get(&severity).copied().unwrap_or(0);
            let severity_limit = self
                .config
                .severity_limits
                .get(&severity)
                .copied()
                .unwrap_or(UNLIMITED_SEVERITY);

            if file_count >= self.config.max_findings_per_file
                || severity_count >= severity_limit
            {
                continue;
            }
            per_file.insert(finding.file_path.clone(), file_count + 1);
            per_severity.insert(severity, severity_count + 1);
            kept.push(finding);
        }
        kept
    }

    /// Stage 3: severity filter, fingerprint dedup, redaction, global cap.
    fn filter_dedup_redact(&self, findings: Vec<Finding>) -> Vec<Finding> {
        let min_rank = Severity::from_label(&self.config.min_severity_to_comment).rank();
        let mut seen: HashSet<String> = HashSet::new();
        let mut output = Vec::new();

        for mut finding in findings {
            if finding.severity_rank() < min_rank {
                continue;
            }

            let fingerprint = Self::fingerprint(&finding);
            if !seen.insert(fingerprint.clone()) {
                continue;
            }

            if self.config.redact_secrets {
                finding.content = SECRET_REGEX
                    .replace_all(&finding.content, "${1}${2}***")
                    .into_owned();
            }
            finding.fingerprint = Some(fingerprint);
            output.push(finding);

            if output.len() >= self.config.max_comments {
                break;
            }
        }
        output
    }

    /// Stable SHA-1 identity of a finding, from pre-redaction fields.
    fn fingerprint(finding: &Finding) -> String {
        let mut hasher = Sha1::new();
        hasher.update(
            format!(
                "{}|{}|{}|{}|{}",
                finding.file_path,
                finding.start_line,
                finding.end_line,
                finding.rule_id,
                finding.content
            )
            .as_bytes(),
        );
        format!("{:x}", hasher.finalize())
    }
}
