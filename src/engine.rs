//! The mode engine: drives the collaborators over the resolved file set.
//!
//! One state per run, selected up front from `RunConfig.mode`; the engine
//! walks the file set strictly sequentially and aggregates the outcome into
//! a `RunResult`. List and Search never touch the substitution machinery;
//! the replace modes build the substitution expression once and reuse it for
//! every file.

use std::path::Path;

use colored::Colorize;

use crate::capability::{
    NulByteClassifier, RegexSearch, RegexSubstitute, TextSearch, TextSubstitute, read_file_text,
    unified_diff,
};
use crate::cli::{Mode, RunConfig};
use crate::config::Config;
use crate::editor;
use crate::error::Result;
use crate::expression::{SubstitutionExpression, select_separator};
use crate::file_set::{self, FileSet, PathFilters};
use crate::patch::{self, PatchBuffer};

/// Aggregated outcome of a run, mapped onto the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub matched_any: bool,
    pub files_changed: usize,
}

impl RunResult {
    fn matched(matched_any: bool) -> Self {
        RunResult {
            matched_any,
            files_changed: 0,
        }
    }

    /// 0 when at least one file/match was found, 1 otherwise. Errors map to
    /// 2 via `ResubError::exit_code` instead.
    pub fn exit_code(&self) -> i32 {
        if self.matched_any { 0 } else { 1 }
    }
}

/// Execute one run to completion.
pub fn run(config: &RunConfig, app: &Config) -> Result<RunResult> {
    // A bad pattern must surface before any file I/O or mutation.
    let search = RegexSearch::compile(&config.pattern, config.ignore_case)?;
    let filters = PathFilters::from_config(config)?;
    let files = file_set::resolve(&config.roots, &filters, &NulByteClassifier)?;

    match config.mode {
        Mode::List => run_list(&files, &search),
        Mode::Search => run_search(config, &files, &search),
        mode => {
            let template = config.template.as_deref().unwrap_or_default();
            let separator = select_separator(&config.pattern, template, config.separator)?;
            let expr =
                SubstitutionExpression::build(&config.pattern, template, separator, config.ignore_case);
            tracing::debug!(expression = %expr.render(), "substitution expression");
            let subst = RegexSubstitute::from_expression(&expr)?;

            // With --quiet, the non-mutating replace modes and the editor
            // staging are unobservable; the run collapses to a probe with
            // the same exit code the full run would produce. ReplacePrint
            // matches on lines; Diff and Editor match only when the
            // substitution actually changes content, since an identity
            // replacement produces no diff.
            if config.quiet {
                match mode {
                    Mode::ReplacePrint => return quiet_match_probe(&files, &search),
                    Mode::Diff | Mode::Editor => return quiet_change_probe(&files, &subst),
                    _ => {}
                }
            }

            match mode {
                Mode::ReplacePrint => run_replace_print(config, &files, &search, &subst),
                Mode::Diff => run_diff(app, &files, &subst),
                Mode::Editor => run_editor(config, app, &files, &subst),
                Mode::Update => run_update(config, &files, &subst),
                Mode::List | Mode::Search => unreachable!(),
            }
        }
    }
}

/// Whether output lines carry a `path:` prefix. Forced off by the flag;
/// otherwise on, except when the single named root is itself a plain file.
fn show_filenames(config: &RunConfig) -> bool {
    if let Some(forced) = config.with_filename {
        return forced;
    }
    !(config.roots.len() == 1 && Path::new(&config.roots[0]).is_file())
}

/// Line-match probe backing the quiet short-circuit for ReplacePrint:
/// stops at the first file with a matching line, produces no output.
fn quiet_match_probe(files: &FileSet, search: &dyn TextSearch) -> Result<RunResult> {
    for path in files.iter() {
        if search.file_matches(Path::new(path))? {
            return Ok(RunResult::matched(true));
        }
    }
    Ok(RunResult::matched(false))
}

/// Content-change probe backing the quiet short-circuit for Diff and
/// Editor: stops at the first file the substitution would rewrite. A file
/// whose matches are replaced by themselves does not count, mirroring the
/// full run where such a file yields no diff.
fn quiet_change_probe(files: &FileSet, subst: &dyn TextSubstitute) -> Result<RunResult> {
    for path in files.iter() {
        let content = read_file_text(Path::new(path))?;
        if subst.substitute(&content).as_ref() != content.as_str() {
            return Ok(RunResult::matched(true));
        }
    }
    Ok(RunResult::matched(false))
}

fn run_list(files: &FileSet, search: &dyn TextSearch) -> Result<RunResult> {
    let mut matched_any = false;
    for path in files.iter() {
        if search.file_matches(Path::new(path))? {
            println!("{path}");
            matched_any = true;
        }
    }
    Ok(RunResult::matched(matched_any))
}

fn run_search(config: &RunConfig, files: &FileSet, search: &dyn TextSearch) -> Result<RunResult> {
    let prefix = show_filenames(config);
    let mut matched_any = false;
    for path in files.iter() {
        for line in search.matching_lines(Path::new(path))? {
            if prefix {
                println!("{path}:{line}");
            } else {
                println!("{line}");
            }
            matched_any = true;
        }
    }
    Ok(RunResult::matched(matched_any))
}

/// Print what matching lines would look like after substitution. Never
/// mutates anything.
fn run_replace_print(
    config: &RunConfig,
    files: &FileSet,
    search: &dyn TextSearch,
    subst: &dyn TextSubstitute,
) -> Result<RunResult> {
    let prefix = show_filenames(config);
    let mut matched_any = false;
    for path in files.iter() {
        for line in search.matching_lines(Path::new(path))? {
            let transformed = subst.substitute(&line);
            if prefix {
                println!("{path}:{transformed}");
            } else {
                println!("{transformed}");
            }
            matched_any = true;
        }
    }
    Ok(RunResult::matched(matched_any))
}

fn run_diff(app: &Config, files: &FileSet, subst: &dyn TextSubstitute) -> Result<RunResult> {
    let use_color = should_use_color(app);
    let mut matched_any = false;
    for path in files.iter() {
        let content = read_file_text(Path::new(path))?;
        let transformed = subst.substitute(&content);
        if transformed.as_ref() != content.as_str() {
            let diff = unified_diff(&content, &transformed, path);
            if use_color {
                print!("{}", colorize_diff(&diff));
            } else {
                print!("{diff}");
            }
            matched_any = true;
        }
    }
    Ok(RunResult::matched(matched_any))
}

/// Stage every pending change into one patch buffer, hand it to the
/// reviewer's editor, and apply whatever survives the review. A cleared
/// buffer or a failing editor aborts without touching the tree. The buffer
/// itself is removed on every exit path when it drops.
fn run_editor(
    config: &RunConfig,
    app: &Config,
    files: &FileSet,
    subst: &dyn TextSubstitute,
) -> Result<RunResult> {
    // Resolve the editor before doing any staging work; a missing editor is
    // an operational error, not something to discover after review prep.
    let editor_program = editor::resolve_editor(app.editor.program.as_deref())?;

    let mut buffer = PatchBuffer::create()?;
    let mut staged = 0usize;
    for path in files.iter() {
        let content = read_file_text(Path::new(path))?;
        let transformed = subst.substitute(&content);
        if transformed.as_ref() != content.as_str() {
            buffer.append(&unified_diff(&content, &transformed, path))?;
            staged += 1;
        }
    }

    if staged == 0 {
        if !config.quiet {
            eprintln!("resub: no matches");
        }
        return Ok(RunResult::matched(false));
    }

    let accepted = editor::review(&editor_program, buffer.path())?;
    let reviewed = buffer.read_back()?;

    if !accepted || patch::is_cleared(&reviewed) {
        if !config.quiet {
            eprintln!("Patch aborted");
        }
        return Ok(RunResult::matched(false));
    }

    let files_changed = patch::apply_patch(&reviewed, Path::new("."))?;
    if !config.quiet {
        println!("{files_changed} file(s) updated");
    }
    Ok(RunResult {
        matched_any: true,
        files_changed,
    })
}

fn run_update(config: &RunConfig, files: &FileSet, subst: &dyn TextSubstitute) -> Result<RunResult> {
    let mut files_changed = 0usize;
    for path in files.iter() {
        let path = Path::new(path);
        let content = read_file_text(path)?;
        let transformed = subst.substitute(&content);
        if transformed.as_ref() != content.as_str() {
            patch::write_atomic(path, &transformed)?;
            files_changed += 1;
        }
    }
    if !config.quiet {
        println!("{files_changed} file(s) updated");
    }
    Ok(RunResult {
        matched_any: files_changed > 0,
        files_changed,
    })
}

/// Auto-detect whether diff output should use colors: the config override
/// wins, NO_COLOR is honored, otherwise color on terminals only.
fn should_use_color(app: &Config) -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if let Some(forced) = app.output.color {
        return forced;
    }
    atty::is(atty::Stream::Stdout)
}

fn colorize_diff(diff: &str) -> String {
    let mut output = String::with_capacity(diff.len());
    for line in diff.lines() {
        if line.starts_with("---") || line.starts_with("+++") {
            output.push_str(&format!("{}\n", line.bold()));
        } else if line.starts_with("@@") {
            output.push_str(&format!("{}\n", line.cyan()));
        } else if line.starts_with('+') {
            output.push_str(&format!("{}\n", line.green()));
        } else if line.starts_with('-') {
            output.push_str(&format!("{}\n", line.red()));
        } else {
            output.push_str(line);
            output.push('\n');
        }
    }
    output
}
