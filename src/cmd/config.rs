//! Configuration commands — `redline config`.

use anyhow::{Context, Result, bail};
use redline::config::{Config, DEFAULT_CONFIG_FILE};
use std::path::Path;

use crate::ConfigCommands;

pub fn cmd_config(config_path: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => cmd_config_show(config_path),
        Some(ConfigCommands::Validate) => cmd_config_validate(config_path),
        Some(ConfigCommands::Init) => cmd_config_init(),
    }
}

/// Print the effective configuration as TOML, after defaults are applied.
fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let rendered =
        toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
    print!("{rendered}");
    Ok(())
}

/// Load and validate, reporting what was found.
fn cmd_config_validate(config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    println!(
        "Configuration OK ({} rules, {} exclude patterns)",
        config.rules.len(),
        config.exclude.len()
    );
    Ok(())
}

/// Write a commented starter `redline.toml` in the working directory.
fn cmd_config_init() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        bail!("{DEFAULT_CONFIG_FILE} already exists, refusing to overwrite");
    }
    std::fs::write(path, Config::starter_toml())
        .with_context(|| format!("Failed to write {DEFAULT_CONFIG_FILE}"))?;
    println!("Wrote {DEFAULT_CONFIG_FILE}");
    Ok(())
}
