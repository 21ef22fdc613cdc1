//! Typed error hierarchy for the review pipeline.
//!
//! Two top-level enums cover the two failure domains:
//! - `ConfigError` — construction-time configuration failures (fatal, fail fast)
//! - `PipelineError` — failures of a single pipeline run
//!
//! Empty or malformed diffs are deliberately not errors: they are valid
//! empty results.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Rule '{id}' is invalid: {message}")]
    InvalidRule { id: String, message: String },

    #[error("Rule pattern '{pattern}' failed to compile: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors raised by a single pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to read diff at {path}: {source}")]
    DiffReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Provider '{provider}' failed: {source}")]
    ProviderFailed {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
