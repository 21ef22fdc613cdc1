pub mod budget;
pub mod chunk;
pub mod config;
pub mod diff;
pub mod errors;
pub mod findings;
pub mod globs;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod provider;
pub mod rules;
