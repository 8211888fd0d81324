//! Narrow interfaces over the external text-processing primitives.
//!
//! The pipeline never implements regex matching, substitution, or diffing
//! itself; it drives these capabilities. Each one is a small trait with a
//! default implementation backed by the `regex` crate (matching and
//! substitution), a NUL-byte sniff (binary classification), or the `similar`
//! crate (unified diffs), and each can be swapped for a stub in tests.

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use similar::TextDiff;

use crate::error::{ResubError, Result};
use crate::expression::SubstitutionExpression;

/// Line-oriented text search over a single file.
pub trait TextSearch {
    /// Does any line of `path` match?
    fn file_matches(&self, path: &Path) -> Result<bool>;

    /// All matching lines of `path`, in file order.
    fn matching_lines(&self, path: &Path) -> Result<Vec<String>>;
}

/// Stream-editor style substitution over already-loaded content.
pub trait TextSubstitute {
    fn substitute<'a>(&self, content: &'a str) -> Cow<'a, str>;
}

/// Text-versus-binary classification, by the search primitive's convention.
pub trait BinaryClassify {
    fn is_binary(&self, path: &Path) -> Result<bool>;
}

/// Read a candidate file as UTF-8 text.
///
/// The binary classifier keeps NUL-bearing files out of the set before this
/// runs; anything still unreadable is a fatal per-file error.
pub fn read_file_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| ResubError::file(path, e))
}

/// Search backed by the `regex` crate.
pub struct RegexSearch {
    regex: Regex,
}

impl RegexSearch {
    pub fn compile(pattern: &str, ignore_case: bool) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()?;
        Ok(RegexSearch { regex })
    }
}

impl TextSearch for RegexSearch {
    fn file_matches(&self, path: &Path) -> Result<bool> {
        let content = read_file_text(path)?;
        Ok(content.lines().any(|line| self.regex.is_match(line)))
    }

    fn matching_lines(&self, path: &Path) -> Result<Vec<String>> {
        let content = read_file_text(path)?;
        Ok(content
            .lines()
            .filter(|line| self.regex.is_match(line))
            .map(str::to_string)
            .collect())
    }
}

/// Substitution backed by the `regex` crate.
///
/// The pattern and template come straight out of a `SubstitutionExpression`;
/// the global flag means `replace_all`, and the template's `$n`/`${name}`
/// references pass through to the regex engine verbatim.
pub struct RegexSubstitute {
    regex: Regex,
    template: String,
}

impl RegexSubstitute {
    pub fn from_expression(expr: &SubstitutionExpression) -> Result<Self> {
        let regex = RegexBuilder::new(&expr.pattern)
            .case_insensitive(expr.case_insensitive())
            .build()?;
        Ok(RegexSubstitute {
            regex,
            template: expr.template.clone(),
        })
    }
}

impl TextSubstitute for RegexSubstitute {
    fn substitute<'a>(&self, content: &'a str) -> Cow<'a, str> {
        self.regex.replace_all(content, self.template.as_str())
    }
}

/// How much of a file the classifier sniffs, mirroring the grep convention
/// of judging the leading buffer only.
const BINARY_SNIFF_LEN: usize = 8192;

/// A file is binary when its leading bytes contain NUL.
pub struct NulByteClassifier;

impl BinaryClassify for NulByteClassifier {
    fn is_binary(&self, path: &Path) -> Result<bool> {
        let mut file = File::open(path).map_err(|e| ResubError::file(path, e))?;
        let mut buf = vec![0u8; BINARY_SNIFF_LEN];
        let mut filled = 0;
        while filled < buf.len() {
            let n = file
                .read(&mut buf[filled..])
                .map_err(|e| ResubError::file(path, e))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(buf[..filled].contains(&0))
    }
}

/// Unified diff between two versions of one file, labeled by its path.
/// Three lines of context, the same shape `patch(1)` consumes.
pub fn unified_diff(old: &str, new: &str, path: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(path, path)
        .to_string()
}
