//! Rendering of post-policy findings.
//!
//! All renderers are pure functions of the finding list; no I/O happens
//! here. The summary format is line-oriented and stable, suitable for
//! terminals and CI logs; the Markdown form is shaped like a PR review
//! comment body.

use crate::findings::Finding;
use anyhow::{Context, Result};
use clap::ValueEnum;

/// Output formats supported by the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON array of findings.
    Json,
    /// Line-oriented human summary.
    #[default]
    Summary,
    /// Markdown suitable for a PR comment.
    Markdown,
}

/// Render findings in the requested format.
pub fn render(findings: &[Finding], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(findings),
        OutputFormat::Summary => Ok(render_summary(findings)),
        OutputFormat::Markdown => Ok(render_markdown(findings)),
    }
}

/// Pretty-printed JSON array of findings.
pub fn render_json(findings: &[Finding]) -> Result<String> {
    let mut out =
        serde_json::to_string_pretty(findings).context("Failed to serialize findings")?;
    out.push('\n');
    Ok(out)
}

/// Line-oriented summary: a header, one block per finding.
///
/// The empty case is the literal `"No findings.\n"`.
pub fn render_summary(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "No findings.\n".to_string();
    }

    let mut out = format!("Findings ({}):\n", findings.len());
    for finding in findings {
        out.push_str(&format!("{finding}\n"));
        if !finding.rationale.is_empty() {
            out.push_str(&format!("  {}\n", finding.rationale));
        }
        if let Some(suggestion) = &finding.suggestion {
            out.push_str(&format!("  suggestion: {suggestion}\n"));
        }
    }
    out
}

/// Markdown rendering for PR comments: one section per finding with the
/// location as a code span and the suggestion as a block quote.
pub fn render_markdown(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "## Review findings\n\nNo findings.\n".to_string();
    }

    let mut out = format!("## Review findings ({})\n", findings.len());
    for finding in findings {
        out.push_str(&format!(
            "\n### {} `{}` — {}\n\n`{}`\n",
            severity_badge(&finding.severity),
            finding.rule_id,
            finding.title,
            finding.location()
        ));
        if !finding.rationale.is_empty() {
            out.push_str(&format!("\n{}\n", finding.rationale));
        }
        if let Some(suggestion) = &finding.suggestion {
            out.push_str(&format!("\n> Suggestion: {suggestion}\n"));
        }
    }
    out
}

fn severity_badge(severity: &str) -> String {
    format!("**{}**", severity.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Finding {
        Finding::new("no-echo", "Echo statement", "minor", "src/a.php")
            .with_lines(10, 10)
            .with_rationale("Raw output bypasses escaping")
            .with_suggestion("Use the template engine")
    }

    // =========================================
    // Summary
    // =========================================

    #[test]
    fn test_empty_summary_is_exact_literal() {
        assert_eq!(render_summary(&[]), "No findings.\n");
    }

    #[test]
    fn test_summary_header_and_finding_lines() {
        let out = render_summary(&[sample()]);
        assert!(out.starts_with("Findings (1):\n"));
        assert!(out.contains("[MINOR] no-echo (src/a.php:10-10)\n"));
        assert!(out.contains("  Raw output bypasses escaping\n"));
        assert!(out.contains("  suggestion: Use the template engine\n"));
    }

    #[test]
    fn test_summary_omits_empty_rationale_and_suggestion() {
        let bare = Finding::new("r", "t", "info", "f").with_lines(1, 1);
        let out = render_summary(&[bare]);
        assert_eq!(out, "Findings (1):\n[INFO] r (f:1-1)\n");
    }

    // =========================================
    // JSON
    // =========================================

    #[test]
    fn test_json_is_pretty_array_with_all_fields() {
        let mut finding = sample();
        finding.fingerprint = Some("abc123".to_string());
        let out = render_json(&[finding]).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["rule_id"], "no-echo");
        assert_eq!(parsed[0]["start_line"], 10);
        assert_eq!(parsed[0]["fingerprint"], "abc123");
        // pretty-printed, not compact
        assert!(out.contains("\n  "));
    }

    #[test]
    fn test_json_empty_is_empty_array() {
        assert_eq!(render_json(&[]).unwrap(), "[]\n");
    }

    // =========================================
    // Markdown
    // =========================================

    #[test]
    fn test_markdown_contains_location_and_suggestion() {
        let out = render_markdown(&[sample()]);
        assert!(out.starts_with("## Review findings (1)\n"));
        assert!(out.contains("**MINOR**"));
        assert!(out.contains("`src/a.php:10-10`"));
        assert!(out.contains("> Suggestion: Use the template engine"));
    }

    #[test]
    fn test_markdown_empty() {
        let out = render_markdown(&[]);
        assert!(out.contains("No findings."));
    }

    // =========================================
    // Dispatch
    // =========================================

    #[test]
    fn test_render_dispatches_by_format() {
        let findings = vec![sample()];
        assert!(render(&findings, OutputFormat::Json).unwrap().starts_with('['));
        assert!(
            render(&findings, OutputFormat::Summary)
                .unwrap()
                .starts_with("Findings")
        );
        assert!(
            render(&findings, OutputFormat::Markdown)
                .unwrap()
                .starts_with("## ")
        );
    }
}
