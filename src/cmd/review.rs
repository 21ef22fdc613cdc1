//! Diff review command — `redline review`.

use anyhow::Result;
use redline::output::OutputFormat;
use redline::pipeline::Pipeline;
use redline::provider::MockProvider;
use std::path::Path;

/// Run the review pipeline over the diff at `diff_path` and print the result
/// to stdout.
pub fn cmd_review(
    config_path: Option<&Path>,
    diff_path: &Path,
    format: OutputFormat,
    rules_only: bool,
    no_rules: bool,
) -> Result<()> {
    let config = super::load_config(config_path)?;

    // TODO: wire a real provider adapter once one lands; mock keeps the
    // provider stage a no-op for now.
    let pipeline = Pipeline::new(config, Box::new(MockProvider::new()))
        .with_rules(!no_rules)
        .with_provider(!rules_only);

    let rendered = pipeline.run(diff_path, format)?;
    print!("{rendered}");
    Ok(())
}
