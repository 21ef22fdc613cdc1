//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `review` | `Review`         |
//! | `config` | `Config`         |
//! | `rules`  | `Rules`          |

pub mod config;
pub mod review;
pub mod rules;

pub use config::cmd_config;
pub use review::cmd_review;
pub use rules::cmd_rules;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration for a command run.
///
/// An explicit `--config` path must exist; otherwise `redline.toml` in the
/// working directory is used when present, defaults when not.
pub fn load_config(explicit: Option<&Path>) -> Result<redline::config::Config> {
    let config = match explicit {
        Some(path) => redline::config::Config::load(path)?,
        None => {
            let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
            redline::config::Config::load_or_default(&cwd)?
        }
    };
    Ok(config)
}
