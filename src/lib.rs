//! resub: recursive search-and-replace over trees of text files.
//!
//! A run resolves a file set (path roots, regex and glob filters, binary
//! exclusion), then drives one of six modes over it: list matching files,
//! print matching lines, preview substituted lines, show a unified diff,
//! review the changes as an editable patch, or rewrite files in place.
//! Exit status follows the grep convention: 0 when something matched, 1 when
//! nothing did, 2 on error.

pub mod capability;
pub mod cli;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod expression;
pub mod file_set;
pub mod logger;
pub mod patch;

pub use cli::{Mode, Parsed, RunConfig, parse_args};
pub use engine::{RunResult, run};
pub use error::{ResubError, Result};
pub use expression::{SubstitutionExpression, select_separator};
pub use file_set::FileSet;
