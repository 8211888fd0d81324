//! File set resolution: path roots plus filters in, concrete file list out.
//!
//! Name globs work on bare directory-entry names during traversal (the
//! exclude glob also prunes whole directories; the include glob only gates
//! files). Path regexes run afterwards against the full relative paths with
//! any leading "./" stripped. Binary files are dropped last. An empty result
//! is `NoMatch`, distinct from an I/O failure.

use std::collections::HashSet;
use std::path::Path;

use globset::{Glob, GlobMatcher};
use regex::Regex;
use walkdir::WalkDir;

use crate::capability::BinaryClassify;
use crate::cli::RunConfig;
use crate::error::{ResubError, Result};

/// Ordered, deduplicated list of relative file paths. Built once per
/// invocation and immutable afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileSet {
    paths: Vec<String>,
}

impl FileSet {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// The four optional include/exclude filters, compiled once.
pub struct PathFilters {
    include_name: Option<GlobMatcher>,
    exclude_name: Option<GlobMatcher>,
    include_path: Option<Regex>,
    exclude_path: Option<Regex>,
}

impl PathFilters {
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let compile_glob = |src: &Option<String>| -> Result<Option<GlobMatcher>> {
            match src {
                Some(g) => Ok(Some(Glob::new(g)?.compile_matcher())),
                None => Ok(None),
            }
        };
        let compile_regex = |src: &Option<String>| -> Result<Option<Regex>> {
            match src {
                Some(r) => Ok(Some(Regex::new(r)?)),
                None => Ok(None),
            }
        };
        Ok(PathFilters {
            include_name: compile_glob(&config.include_name)?,
            exclude_name: compile_glob(&config.exclude_name)?,
            include_path: compile_regex(&config.include_path)?,
            exclude_path: compile_regex(&config.exclude_path)?,
        })
    }

    /// File entries pass when the include glob matches (or is unset) and the
    /// exclude glob does not.
    fn keep_file_name(&self, name: &str) -> bool {
        if let Some(include) = &self.include_name {
            if !include.is_match(name) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_name {
            if exclude.is_match(name) {
                return false;
            }
        }
        true
    }

    /// Directories are only pruned by the exclude glob; the include glob
    /// gates files, not traversal.
    fn descend_dir(&self, name: &str) -> bool {
        match &self.exclude_name {
            Some(exclude) => !exclude.is_match(name),
            None => true,
        }
    }

    fn has_path_filters(&self) -> bool {
        self.include_path.is_some() || self.exclude_path.is_some()
    }

    /// Full-path pass over the stripped relative path.
    fn keep_path(&self, path: &str) -> bool {
        if let Some(include) = &self.include_path {
            if !include.is_match(path) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_path {
            if exclude.is_match(path) {
                return false;
            }
        }
        true
    }
}

/// A root that is neither "." nor absolute nor already explicitly relative
/// gets a "./" prefix internally; the prefix is stripped again from every
/// collected path, so output is uniform across spellings.
fn normalize_root(root: &str) -> String {
    if root == "." || root.starts_with('/') || root.starts_with("./") {
        root.to_string()
    } else {
        format!("./{root}")
    }
}

/// Walk the roots and produce the final file set.
pub fn resolve(
    roots: &[String],
    filters: &PathFilters,
    classify: &dyn BinaryClassify,
) -> Result<FileSet> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut collected: Vec<String> = Vec::new();

    for root in roots {
        let root = normalize_root(root);
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.file_type().is_dir() {
                    let name = entry.file_name().to_string_lossy();
                    filters.descend_dir(&name)
                } else {
                    true
                }
            });

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !filters.keep_file_name(&name) {
                continue;
            }
            let path = entry.path().to_string_lossy();
            let path = path.strip_prefix("./").unwrap_or(&path).to_string();
            if seen.insert(path.clone()) {
                collected.push(path);
            }
        }
    }

    // Skipped entirely when no path regex was given; output is identical
    // either way.
    if filters.has_path_filters() {
        collected.retain(|p| filters.keep_path(p));
    }

    let mut paths = Vec::with_capacity(collected.len());
    for path in collected {
        if !classify.is_binary(Path::new(&path))? {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(ResubError::NoMatch);
    }
    tracing::debug!(files = paths.len(), "resolved file set");
    Ok(FileSet { paths })
}
