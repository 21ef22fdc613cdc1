//! Rule inspection commands — `redline rules`.

use anyhow::Result;
use redline::rules::RulesEngine;
use std::path::Path;

use crate::RulesCommands;

pub fn cmd_rules(config_path: Option<&Path>, command: Option<RulesCommands>) -> Result<()> {
    match command {
        None | Some(RulesCommands::List) => cmd_rules_list(config_path),
    }
}

/// List the enabled rules in configuration order.
fn cmd_rules_list(config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let engine = RulesEngine::from_config(&config.rules)?;

    if engine.rules().is_empty() {
        println!("No rules configured.");
        return Ok(());
    }

    println!("Rules ({}):", engine.rules().len());
    for rule in engine.rules() {
        let scope = if rule.applies_to_globs().is_empty() {
            "all files".to_string()
        } else {
            rule.applies_to_globs().join(", ")
        };
        println!("  {} [{}] {}", rule.id(), rule.severity(), scope);
    }
    Ok(())
}
