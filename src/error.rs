//! Error taxonomy for resub.
//!
//! Every failure the pipeline can surface maps to one variant here, and the
//! variant decides the process exit code: `NoMatch` is a normal outcome
//! (exit 1), everything else is a hard error (exit 2). Success paths derive
//! their exit code from `RunResult` instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResubError {
    /// Bad or missing command-line arguments. Aborts before any file I/O.
    #[error("{0}")]
    Usage(String),

    /// The search/substitution primitive rejected the regular expression.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A name filter is not a valid glob.
    #[error("invalid glob: {0}")]
    Glob(#[from] globset::Error),

    /// Traversal failed (unreadable root, permission error mid-walk).
    #[error("cannot walk path: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Reading or writing a candidate file failed. Non-UTF-8 content that
    /// slipped past the binary classifier lands here as well.
    #[error("failed to process '{path}': {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "no separator character is unused by the pattern and replacement; \
         pass one explicitly with --separator"
    )]
    NoSeparator,

    #[error("separator '{0}' occurs in the pattern or replacement")]
    SeparatorConflict(char),

    /// The configured interactive editor is missing or not executable.
    #[error("editor '{0}' not found or not executable")]
    Editor(String),

    /// The staged patch no longer applies to the working tree.
    #[error("patch does not apply: {0}")]
    Patch(String),

    /// Not a failure: the file set or the search yielded nothing.
    #[error("no files matched")]
    NoMatch,
}

impl ResubError {
    /// Process exit status for this error (see also `RunResult::exit_code`).
    pub fn exit_code(&self) -> i32 {
        match self {
            ResubError::NoMatch => 1,
            _ => 2,
        }
    }

    /// Convenience constructor for per-file I/O failures.
    pub fn file(path: &std::path::Path, source: io::Error) -> Self {
        ResubError::File {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResubError>;
