//! Configuration for redline, read from `redline.toml`.
//!
//! All sections are optional and default sensibly; a missing file yields the
//! default configuration. Validation is strict where it matters: malformed
//! rules fail loading immediately rather than surfacing mid-run.
//!
//! # Configuration File Format
//!
//! ```toml
//! exclude = ["*.md", "vendor", "composer.lock"]
//!
//! [budget]
//! diff_token_limit = 8000
//! per_file_token_cap = 2000
//! overflow_strategy = "trim"
//! provider = "openai"
//! enable_semantic_chunking = false
//!
//! [policy]
//! min_severity_to_comment = "info"
//! max_comments = 20
//! redact_secrets = true
//! consolidate_similar_findings = false
//! max_findings_per_file = 5
//!
//! [policy.severity_limits]
//! info = 10
//!
//! [[rules]]
//! id = "no-var-dump"
//! applies_to = ["**/*.php"]
//! severity = "major"
//! pattern = '(^|\s)var_dump\s*\('
//! rationale = "Debug output left in code"
//! suggestion = "Remove the var_dump call"
//! ```

use crate::errors::ConfigError;
use crate::rules::RulesEngine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Default config file name searched in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "redline.toml";

/// Token budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Global token cap for a whole diff.
    pub diff_token_limit: usize,
    /// Token cap for a single file's chunk.
    pub per_file_token_cap: usize,
    /// `trim` stops at the cap; `keep` admits everything.
    pub overflow_strategy: String,
    /// Provider name used for token estimation.
    pub provider: String,
    /// Group chunks by semantic context before the provider call.
    pub enable_semantic_chunking: bool,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            diff_token_limit: 8000,
            per_file_token_cap: 2000,
            overflow_strategy: "trim".to_string(),
            provider: "openai".to_string(),
            enable_semantic_chunking: false,
        }
    }
}

/// Output policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Findings below this severity rank are dropped.
    pub min_severity_to_comment: String,
    /// Hard cap on emitted findings.
    pub max_comments: usize,
    /// Mask secret values in finding content.
    pub redact_secrets: bool,
    /// Collapse similar findings into aggregates.
    pub consolidate_similar_findings: bool,
    /// Max findings emitted per file.
    pub max_findings_per_file: usize,
    /// Optional per-severity caps, keyed by lower-cased label.
    pub severity_limits: HashMap<String, usize>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_severity_to_comment: "info".to_string(),
            max_comments: 20,
            redact_secrets: false,
            consolidate_similar_findings: false,
            max_findings_per_file: 5,
            severity_limits: HashMap::new(),
        }
    }
}

/// One inline rule definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Rule identifier; must be non-empty.
    pub id: String,
    /// Applicability globs; empty means every file.
    #[serde(default)]
    pub applies_to: Vec<String>,
    /// Severity label from the closed vocabulary.
    #[serde(default = "default_rule_severity")]
    pub severity: String,
    /// Why matches matter.
    #[serde(default)]
    pub rationale: String,
    /// Regex body applied to each added line; must be non-empty.
    pub pattern: String,
    /// Suggested fix attached to matches.
    #[serde(default)]
    pub suggestion: Option<String>,
    /// Disabled rules are validated but never evaluated.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_rule_severity() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path exclusion patterns applied before chunking.
    pub exclude: Vec<String>,
    /// Token budget settings.
    pub budget: BudgetConfig,
    /// Output policy settings.
    pub policy: PolicyConfig,
    /// Inline rule definitions.
    pub rules: Vec<RuleConfig>,
}

impl Config {
    /// Load configuration from an explicit path.
    ///
    /// The file must exist and parse; rules are validated eagerly.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `redline.toml` from `dir` if present, defaults otherwise.
    pub fn load_or_default(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate construction-time invariants, failing on the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // rule invariants (non-empty id/pattern, compilable regex, known
        // severity) are checked by engine construction
        RulesEngine::from_config(&self.rules)?;
        Ok(())
    }

    /// A commented starter configuration for `config init`.
    pub fn starter_toml() -> &'static str {
        r#"# redline configuration

# Paths the reviewer never looks at. Three forms:
#   "vendor/"       directory prefix
#   "node_modules"  well-known directory name
#   "*.md"          glob over the full relative path
exclude = []

[budget]
diff_token_limit = 8000
per_file_token_cap = 2000
# "trim" stops adding files at the cap, "keep" reviews everything
overflow_strategy = "trim"
provider = "openai"
enable_semantic_chunking = false

[policy]
min_severity_to_comment = "info"
max_comments = 20
redact_secrets = true
consolidate_similar_findings = false
max_findings_per_file = 5

# [[rules]]
# id = "no-var-dump"
# applies_to = ["**/*.php"]
# severity = "major"
# pattern = '(^|\s)var_dump\s*\('
# rationale = "Debug output left in code"
# suggestion = "Remove the var_dump call"
"#
    }
}
