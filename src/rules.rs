//! Deterministic regex rules evaluated against added lines.
//!
//! Rules are immutable value objects built once from configuration. A rule
//! with an empty id or empty pattern, an uncompilable pattern, or a severity
//! outside the closed vocabulary fails construction; configuration errors
//! are fatal, not runtime conditions. Evaluation itself cannot fail; a
//! non-matching regex is a normal outcome.

use crate::config::RuleConfig;
use crate::diff::AddedLine;
use crate::errors::ConfigError;
use crate::findings::{Finding, Severity};
use crate::globs;
use regex::Regex;

/// One validated, compiled review rule.
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    applies_to: Vec<Regex>,
    applies_to_globs: Vec<String>,
    severity: Severity,
    rationale: String,
    pattern: Regex,
    suggestion: Option<String>,
    enabled: bool,
}

impl Rule {
    /// Build a rule from its configuration, validating invariants.
    pub fn from_config(config: &RuleConfig) -> Result<Self, ConfigError> {
        if config.id.trim().is_empty() {
            return Err(ConfigError::InvalidRule {
                id: "<unnamed>".to_string(),
                message: "rule id must not be empty".to_string(),
            });
        }
        if config.pattern.is_empty() {
            return Err(ConfigError::InvalidRule {
                id: config.id.clone(),
                message: "rule pattern must not be empty".to_string(),
            });
        }
        if !Severity::is_known_label(&config.severity) {
            return Err(ConfigError::InvalidRule {
                id: config.id.clone(),
                message: format!(
                    "unknown severity '{}' (expected info, minor, major, or critical)",
                    config.severity
                ),
            });
        }

        let pattern = Regex::new(&config.pattern).map_err(|source| ConfigError::BadPattern {
            pattern: config.pattern.clone(),
            source,
        })?;

        Ok(Self {
            id: config.id.clone(),
            applies_to: config.applies_to.iter().map(|g| globs::compile(g)).collect(),
            applies_to_globs: config.applies_to.clone(),
            severity: Severity::from_label(&config.severity),
            rationale: config.rationale.clone(),
            pattern,
            suggestion: config.suggestion.clone(),
            enabled: config.enabled,
        })
    }

    /// Rule identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Severity assigned to matches.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The applicability globs as configured.
    pub fn applies_to_globs(&self) -> &[String] {
        &self.applies_to_globs
    }

    /// Whether this rule participates in evaluation.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether this rule applies to `file_path`. An empty glob list matches
    /// everything.
    pub fn applies_to(&self, file_path: &str) -> bool {
        self.applies_to.is_empty() || self.applies_to.iter().any(|g| g.is_match(file_path))
    }

    /// Whether an added line's content matches the rule pattern.
    pub fn matches(&self, content: &str) -> bool {
        self.pattern.is_match(content)
    }
}

/// Evaluates the enabled rule set against a file's added lines.
#[derive(Debug, Clone, Default)]
pub struct RulesEngine {
    rules: Vec<Rule>,
}

impl RulesEngine {
    /// Build the engine from inline rule configurations.
    ///
    /// Every definition is validated, including disabled ones; disabled rules
    /// are then excluded from evaluation.
    pub fn from_config(configs: &[RuleConfig]) -> Result<Self, ConfigError> {
        let rules = configs
            .iter()
            .map(Rule::from_config)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(Rule::enabled)
            .collect();
        Ok(Self { rules })
    }

    /// The enabled rules, in configuration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate all applicable rules against one file's added lines.
    ///
    /// Findings come out in rule order, then line order within a rule.
    pub fn evaluate(&self, file_path: &str, added_lines: &[AddedLine]) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in &self.rules {
            if !rule.applies_to(file_path) {
                continue;
            }
            for added in added_lines {
                if rule.matches(&added.content) {
                    let mut finding =
                        Finding::new(&rule.id, &rule.id, rule.severity.to_string(), file_path)
                            .with_lines(added.line, added.line)
                            .with_rationale(&rule.rationale)
                            .with_content(&added.content);
                    if let Some(suggestion) = &rule.suggestion {
                        finding = finding.with_suggestion(suggestion);
                    }
                    findings.push(finding);
                }
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_config(id: &str, pattern: &str) -> RuleConfig {
        RuleConfig {
            id: id.to_string(),
            applies_to: Vec::new(),
            severity: "minor".to_string(),
            rationale: "test rationale".to_string(),
            pattern: pattern.to_string(),
            suggestion: None,
            enabled: true,
        }
    }

    fn added(line: u32, content: &str) -> AddedLine {
        AddedLine {
            line,
            content: content.to_string(),
        }
    }

    // =========================================
    // Rule construction
    // =========================================

    #[test]
    fn test_rule_empty_id_fails_construction() {
        let config = rule_config("  ", "x");
        assert!(matches!(
            Rule::from_config(&config),
            Err(ConfigError::InvalidRule { .. })
        ));
    }

    #[test]
    fn test_rule_empty_pattern_fails_construction() {
        let config = rule_config("r1", "");
        let err = Rule::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("pattern"));
    }

    #[test]
    fn test_rule_invalid_regex_fails_construction() {
        let config = rule_config("r1", "(unclosed");
        assert!(matches!(
            Rule::from_config(&config),
            Err(ConfigError::BadPattern { .. })
        ));
    }

    #[test]
    fn test_rule_unknown_severity_fails_construction() {
        let mut config = rule_config("r1", "x");
        config.severity = "blocker".to_string();
        let err = Rule::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("blocker"));
    }

    #[test]
    fn test_engine_validates_disabled_rules_but_skips_them() {
        let mut bad = rule_config("bad", "(unclosed");
        bad.enabled = false;
        assert!(RulesEngine::from_config(&[bad]).is_err());

        let mut disabled = rule_config("off", "x");
        disabled.enabled = false;
        let engine = RulesEngine::from_config(&[disabled]).unwrap();
        assert!(engine.rules().is_empty());
    }

    // =========================================
    // Applicability
    // =========================================

    #[test]
    fn test_empty_glob_list_matches_everything() {
        let rule = Rule::from_config(&rule_config("r1", "x")).unwrap();
        assert!(rule.applies_to("anything/at/all.txt"));
    }

    #[test]
    fn test_glob_applicability_is_anchored() {
        let mut config = rule_config("r1", "x");
        config.applies_to = vec!["src/*.rs".to_string()];
        let rule = Rule::from_config(&config).unwrap();

        assert!(rule.applies_to("src/lib.rs"));
        assert!(!rule.applies_to("other/src/lib.rs"));
        assert!(!rule.applies_to("src/nested/lib.rs"));
    }

    #[test]
    fn test_double_star_glob_crosses_directories() {
        let mut config = rule_config("r1", "x");
        config.applies_to = vec!["**/*.php".to_string()];
        let rule = Rule::from_config(&config).unwrap();

        assert!(rule.applies_to("index.php"));
        assert!(rule.applies_to("src/deep/File.php"));
        assert!(!rule.applies_to("src/File.rs"));
    }

    // =========================================
    // Evaluation
    // =========================================

    #[test]
    fn test_php_echo_end_to_end_scenario() {
        let mut config = rule_config("no-echo", r"(^|\s)echo\s");
        config.applies_to = vec!["**/*.php".to_string()];
        config.severity = "minor".to_string();
        let engine = RulesEngine::from_config(&[config]).unwrap();

        let findings = engine.evaluate("src/a.php", &[added(10, "echo \"hi\";")]);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].start_line, 10);
        assert_eq!(findings[0].end_line, 10);
        assert_eq!(findings[0].severity, "minor");
        assert_eq!(findings[0].rule_id, "no-echo");
        assert_eq!(findings[0].content, "echo \"hi\";");
    }

    #[test]
    fn test_rule_not_applied_to_non_matching_path() {
        let mut config = rule_config("no-echo", "echo");
        config.applies_to = vec!["**/*.php".to_string()];
        let engine = RulesEngine::from_config(&[config]).unwrap();

        assert!(engine.evaluate("src/a.rs", &[added(1, "echo hi")]).is_empty());
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let engine = RulesEngine::from_config(&[rule_config("r1", "eval")]).unwrap();
        assert_eq!(engine.evaluate("a.php", &[added(1, "eval(x)")]).len(), 1);
        assert!(engine.evaluate("a.php", &[added(1, "EVAL(x)")]).is_empty());
    }

    #[test]
    fn test_each_matching_line_yields_a_finding() {
        let engine = RulesEngine::from_config(&[rule_config("r1", "dbg")]).unwrap();
        let findings = engine.evaluate(
            "a.rs",
            &[added(3, "dbg!(x)"), added(5, "ok()"), added(9, "dbg!(y)")],
        );
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].start_line, 3);
        assert_eq!(findings[1].start_line, 9);
    }

    #[test]
    fn test_findings_carry_rule_metadata() {
        let mut config = rule_config("no-eval", "eval");
        config.suggestion = Some("never eval".to_string());
        config.severity = "critical".to_string();
        let engine = RulesEngine::from_config(&[config]).unwrap();

        let findings = engine.evaluate("a.php", &[added(7, "eval($x)")]);
        assert_eq!(findings[0].severity, "critical");
        assert_eq!(findings[0].rationale, "test rationale");
        assert_eq!(findings[0].suggestion.as_deref(), Some("never eval"));
        assert!(findings[0].fingerprint.is_none());
    }

    #[test]
    fn test_findings_in_rule_then_line_order() {
        let first = rule_config("first", "a");
        let second = rule_config("second", "b");
        let engine = RulesEngine::from_config(&[first, second]).unwrap();

        let findings = engine.evaluate("f", &[added(1, "ab"), added(2, "ab")]);
        let ids: Vec<_> = findings.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "first", "second", "second"]);
    }
}
