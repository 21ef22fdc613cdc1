//! Unified-diff ingestion: added-line parsing and per-file block splitting.

pub mod parser;
pub mod processor;

pub use parser::{AddedLine, FileAdditions, parse_added_lines};
pub use processor::{DiffProcessor, FileDiffBlock};
