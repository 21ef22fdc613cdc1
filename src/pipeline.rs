//! The end-to-end review pipeline.
//!
//! One run takes a unified diff through four stages: chunk building under
//! the token budget, deterministic rule evaluation, the provider call, and
//! the output policy. Rules see the raw diff (exclusions and budget trimming
//! only gate what providers see); rule findings always precede provider
//! findings in the merged list.

use crate::budget::TokenBudget;
use crate::chunk::{ChunkBuilder, ReviewChunk};
use crate::config::Config;
use crate::diff::{DiffProcessor, parse_added_lines};
use crate::errors::PipelineError;
use crate::findings::Finding;
use crate::output::{self, OutputFormat};
use crate::policy::Policy;
use crate::provider::Provider;
use crate::rules::RulesEngine;
use std::path::Path;
use tracing::{debug, info};

/// Orchestrates one review run from diff text to rendered output.
pub struct Pipeline {
    config: Config,
    provider: Box<dyn Provider>,
    run_rules: bool,
    run_provider: bool,
}

impl Pipeline {
    /// Create a pipeline with both the rules and provider stages enabled.
    pub fn new(config: Config, provider: Box<dyn Provider>) -> Self {
        Self {
            config,
            provider,
            run_rules: true,
            run_provider: true,
        }
    }

    /// Enable or disable the deterministic rules stage.
    pub fn with_rules(mut self, enabled: bool) -> Self {
        self.run_rules = enabled;
        self
    }

    /// Enable or disable the provider stage.
    pub fn with_provider(mut self, enabled: bool) -> Self {
        self.run_provider = enabled;
        self
    }

    /// Review the diff at `path` and render the findings.
    pub fn run(&self, path: &Path, format: OutputFormat) -> Result<String, PipelineError> {
        let diff_text =
            std::fs::read_to_string(path).map_err(|source| PipelineError::DiffReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        self.run_on_text(&diff_text, format)
    }

    /// Review already-loaded diff text and render the findings.
    pub fn run_on_text(
        &self,
        diff_text: &str,
        format: OutputFormat,
    ) -> Result<String, PipelineError> {
        let findings = self.review(diff_text)?;
        Ok(output::render(&findings, format)?)
    }

    /// Review diff text and return the post-policy findings.
    pub fn review(&self, diff_text: &str) -> Result<Vec<Finding>, PipelineError> {
        let chunks = self.build_chunks(diff_text);
        debug!(chunks = chunks.len(), "Built review chunks");

        let mut findings = Vec::new();
        if self.run_rules {
            findings.extend(self.evaluate_rules(diff_text)?);
        }
        let rule_count = findings.len();

        if self.run_provider && !chunks.is_empty() {
            let provider_findings =
                self.provider
                    .review(&chunks)
                    .map_err(|source| PipelineError::ProviderFailed {
                        provider: self.provider.name().to_string(),
                        source,
                    })?;
            findings.extend(provider_findings);
        }

        let raw_count = findings.len();
        let emitted = Policy::new(self.config.policy.clone()).apply(findings);
        info!(
            chunks = chunks.len(),
            rule_findings = rule_count,
            provider_findings = raw_count - rule_count,
            emitted = emitted.len(),
            "Review run complete"
        );
        Ok(emitted)
    }

    /// Budgeted per-file chunks for the provider stage.
    fn build_chunks(&self, diff_text: &str) -> Vec<ReviewChunk> {
        let budget = TokenBudget::from_config(&self.config.budget);
        let processor = DiffProcessor::new(self.config.exclude.clone());
        let mut builder = ChunkBuilder::new(
            budget,
            processor,
            self.config.budget.enable_semantic_chunking,
        );
        builder.build_chunks(diff_text)
    }

    /// Evaluate configured rules against every added line of the raw diff.
    ///
    /// Exclusion patterns do not apply here; rules are cheap and local, so
    /// they see files the provider never will.
    fn evaluate_rules(&self, diff_text: &str) -> Result<Vec<Finding>, PipelineError> {
        let engine = RulesEngine::from_config(&self.config.rules)?;
        let mut findings = Vec::new();
        for file in parse_added_lines(diff_text) {
            findings.extend(engine.evaluate(&file.path, &file.lines));
        }
        Ok(findings)
    }
}
