//! Command-line option parser.
//!
//! resub supports short-option contraction: a token like `-fXxl` expands to
//! `-f -X -x -l`, and every value-taking option among them consumes the next
//! unconsumed positional argument in left-to-right order. That rule is not
//! expressible with a declarative parser, so parsing is done by hand in two
//! phases: phase one splits the raw arguments into an ordered list of atomic
//! options and a positional-value queue; phase two processes atomic options
//! uniformly, popping zero or one queue entries each.

use std::collections::VecDeque;
use std::fmt;

use crate::error::{ResubError, Result};

pub const USAGE: &str = "\
Usage: resub [OPTIONS] [--] PATTERN [REPLACEMENT]

Recursively search text files for PATTERN and optionally rewrite matches
with REPLACEMENT. Without REPLACEMENT, matching lines are printed; with
REPLACEMENT, transformed lines are printed unless a mode option asks for a
diff preview, an editable patch, or an in-place update.

Modes (the last one given wins):
  -l, --list                list files with at least one match
  -d, --diff                print a unified diff of the pending changes
  -e, --editor              stage the changes as a patch, review it in your
                            editor, then apply it (clear the buffer to abort)
  -u, --update              rewrite the files in place

File selection:
  -p, --path PATH           root to search (repeatable; default '.')
  -f, --file REGEX          only paths matching REGEX
  -x, --exclude REGEX       skip paths matching REGEX
  -F, --filename GLOB       only file names matching GLOB
  -X, --exclude-name GLOB   skip names matching GLOB (also prunes directories)

Behavior:
  -i, --ignore-case         case-insensitive matching and substitution
  -q, --quiet               suppress informational diagnostics
  -h, --without-filename    never prefix output lines with the file name
  -s, --separator CHAR      delimiter for the substitution expression
      --help                print this help and exit

Short options contract: `resub -fXxl A B C` is `--file A --exclude-name B
--exclude C --list`. A bare `--` ends option parsing.

The pattern and replacement dialects are the Rust regex crate's
(`$1`/`${name}` refer to capture groups in replacements).

Exit status: 0 when something matched, 1 when nothing matched, 2 on error.
";

pub const USAGE_HINT: &str = "try 'resub --help' for more information";

/// Top-level behavior of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    List,
    Search,
    ReplacePrint,
    Diff,
    Editor,
    Update,
}

impl Mode {
    /// Modes that carry a replacement template.
    pub fn requires_template(self) -> bool {
        matches!(
            self,
            Mode::ReplacePrint | Mode::Diff | Mode::Editor | Mode::Update
        )
    }

    /// Modes that rewrite files on disk.
    pub fn mutates(self) -> bool {
        matches!(self, Mode::Editor | Mode::Update)
    }
}

/// Immutable configuration resolved once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub mode: Mode,
    pub pattern: String,
    pub template: Option<String>,
    pub roots: Vec<String>,
    pub include_path: Option<String>,
    pub exclude_path: Option<String>,
    pub include_name: Option<String>,
    pub exclude_name: Option<String>,
    pub ignore_case: bool,
    pub quiet: bool,
    /// `None` is auto: on unless the single named root is a plain file.
    pub with_filename: Option<bool>,
    pub separator: Option<char>,
}

#[derive(Debug)]
pub enum Parsed {
    /// `--help` was given; print usage and exit 0 without further processing.
    Help,
    Run(RunConfig),
}

/// One atomic option after contraction expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opt {
    Diff,
    Editor,
    List,
    Update,
    Path,
    File,
    Exclude,
    Filename,
    ExcludeName,
    IgnoreCase,
    Quiet,
    WithoutFilename,
    Separator,
    Help,
}

impl Opt {
    fn from_long(name: &str) -> Option<Opt> {
        Some(match name {
            "diff" => Opt::Diff,
            "editor" => Opt::Editor,
            "list" => Opt::List,
            "update" => Opt::Update,
            "path" => Opt::Path,
            "file" => Opt::File,
            "exclude" => Opt::Exclude,
            "filename" => Opt::Filename,
            "exclude-name" => Opt::ExcludeName,
            "ignore-case" => Opt::IgnoreCase,
            "quiet" => Opt::Quiet,
            "without-filename" => Opt::WithoutFilename,
            "separator" => Opt::Separator,
            "help" => Opt::Help,
            _ => return None,
        })
    }

    fn from_short(c: char) -> Option<Opt> {
        Some(match c {
            'd' => Opt::Diff,
            'e' => Opt::Editor,
            'l' => Opt::List,
            'u' => Opt::Update,
            'p' => Opt::Path,
            'f' => Opt::File,
            'x' => Opt::Exclude,
            'F' => Opt::Filename,
            'X' => Opt::ExcludeName,
            'i' => Opt::IgnoreCase,
            'q' => Opt::Quiet,
            'h' => Opt::WithoutFilename,
            's' => Opt::Separator,
            _ => return None,
        })
    }

    fn takes_value(self) -> bool {
        matches!(
            self,
            Opt::Path
                | Opt::File
                | Opt::Exclude
                | Opt::Filename
                | Opt::ExcludeName
                | Opt::Separator
        )
    }
}

impl fmt::Display for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opt::Diff => "--diff",
            Opt::Editor => "--editor",
            Opt::List => "--list",
            Opt::Update => "--update",
            Opt::Path => "--path",
            Opt::File => "--file",
            Opt::Exclude => "--exclude",
            Opt::Filename => "--filename",
            Opt::ExcludeName => "--exclude-name",
            Opt::IgnoreCase => "--ignore-case",
            Opt::Quiet => "--quiet",
            Opt::WithoutFilename => "--without-filename",
            Opt::Separator => "--separator",
            Opt::Help => "--help",
        };
        f.write_str(name)
    }
}

fn usage_err(msg: impl Into<String>) -> ResubError {
    ResubError::Usage(msg.into())
}

/// Parse the raw argument list (without the program name).
pub fn parse_args<I>(args: I) -> Result<Parsed>
where
    I: IntoIterator<Item = String>,
{
    // Phase one: expand tokens into atomic options and a positional queue.
    let mut opts: Vec<Opt> = Vec::new();
    let mut values: VecDeque<String> = VecDeque::new();
    let mut opts_done = false;

    for arg in args {
        if opts_done {
            values.push_back(arg);
            continue;
        }
        if arg == "--" {
            opts_done = true;
        } else if let Some(name) = arg.strip_prefix("--") {
            let opt = Opt::from_long(name)
                .ok_or_else(|| usage_err(format!("unknown option '--{name}'")))?;
            opts.push(opt);
        } else if arg.len() > 1 && arg.starts_with('-') {
            for c in arg.chars().skip(1) {
                let opt = Opt::from_short(c)
                    .ok_or_else(|| usage_err(format!("unknown option '-{c}'")))?;
                opts.push(opt);
            }
        } else {
            values.push_back(arg);
        }
    }

    // --help short-circuits everything, even an otherwise broken line.
    if opts.contains(&Opt::Help) {
        return Ok(Parsed::Help);
    }

    // Phase two: process atomic options uniformly, each consuming zero or
    // one entries from the front of the positional queue.
    let mut mode_flags: Vec<Mode> = Vec::new();
    let mut roots: Vec<String> = Vec::new();
    let mut include_path = None;
    let mut exclude_path = None;
    let mut include_name = None;
    let mut exclude_name = None;
    let mut ignore_case = false;
    let mut quiet = false;
    let mut with_filename: Option<bool> = None;
    let mut separator: Option<char> = None;

    for opt in opts {
        let value = if opt.takes_value() {
            Some(
                values
                    .pop_front()
                    .ok_or_else(|| usage_err(format!("option '{opt}' requires a value")))?,
            )
        } else {
            None
        };
        match opt {
            Opt::Diff => mode_flags.push(Mode::Diff),
            Opt::Editor => mode_flags.push(Mode::Editor),
            Opt::List => mode_flags.push(Mode::List),
            Opt::Update => mode_flags.push(Mode::Update),
            Opt::Path => roots.push(value.unwrap()),
            Opt::File => include_path = value,
            Opt::Exclude => exclude_path = value,
            Opt::Filename => include_name = value,
            Opt::ExcludeName => exclude_name = value,
            Opt::IgnoreCase => ignore_case = true,
            Opt::Quiet => quiet = true,
            Opt::WithoutFilename => with_filename = Some(false),
            Opt::Separator => {
                let v = value.unwrap();
                let mut chars = v.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => separator = Some(c),
                    _ => {
                        return Err(usage_err(format!(
                            "option '--separator' takes a single character, got '{v}'"
                        )));
                    }
                }
            }
            // Handled before the loop.
            Opt::Help => unreachable!(),
        }
    }

    if values.len() > 2 {
        return Err(usage_err("too many arguments"));
    }
    let pattern = values.pop_front();
    let template = values.pop_front();

    let mode = resolve_mode(&mode_flags, template.is_some());

    let pattern = match pattern {
        Some(p) => p,
        // List mode without a pattern lists every file with any line at all.
        None if mode == Mode::List => String::new(),
        None => return Err(usage_err("missing PATTERN")),
    };

    if mode.requires_template() && template.is_none() {
        let flag = match mode {
            Mode::Diff => "--diff",
            Mode::Editor => "--editor",
            Mode::Update => "--update",
            _ => "replacement modes",
        };
        return Err(usage_err(format!("REPLACEMENT is required for {flag}")));
    }
    if !mode.requires_template() && template.is_some() {
        return Err(usage_err("too many arguments"));
    }

    if roots.is_empty() {
        roots.push(".".to_string());
    }

    Ok(Parsed::Run(RunConfig {
        mode,
        pattern,
        template,
        roots,
        include_path,
        exclude_path,
        include_name,
        exclude_name,
        ignore_case,
        quiet,
        with_filename,
        separator,
    }))
}

/// Resolve the run mode from the explicit mode flags and the presence of a
/// replacement template. All mode decisions live here; call sites never
/// re-derive the mode from scattered conditionals. When several mode flags
/// are given the last one wins.
fn resolve_mode(mode_flags: &[Mode], has_template: bool) -> Mode {
    match mode_flags.last() {
        Some(&mode) => mode,
        None if has_template => Mode::ReplacePrint,
        None => Mode::Search,
    }
}
