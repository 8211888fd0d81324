//! Patch staging and application for the editor-review workflow.
//!
//! The patch buffer is a uniquely named temporary file owned by a single
//! invocation. Dropping the buffer deletes the file, covering the normal
//! return, every early error return, and unwinds; creation also registers
//! the path so the interrupt handler can remove it when SIGINT/SIGTERM
//! arrives while the run is blocked in the external editor (see
//! [`remove_active_buffer`]). Only SIGKILL can leak it. Application parses
//! the (possibly hand-edited) unified diff back and replays the hunks
//! against the working tree, so a reviewer can drop whole files or
//! individual hunks before applying.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use crate::error::{ResubError, Result};

/// Path of the buffer currently staged for review, if any. One invocation
/// stages at most one buffer; the interrupt handler reads this because
/// drop-based cleanup does not run on signal termination.
static ACTIVE_BUFFER: Mutex<Option<PathBuf>> = Mutex::new(None);

fn active_buffer() -> std::sync::MutexGuard<'static, Option<PathBuf>> {
    // A poisoned lock only means a panicking thread held it; the PathBuf
    // inside is still valid.
    ACTIVE_BUFFER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Remove the staged buffer, if one exists. Called from the interrupt
/// handler on the way out; every other exit path is covered by drop.
pub fn remove_active_buffer() {
    if let Some(path) = active_buffer().take() {
        let _ = fs::remove_file(path);
    }
}

/// Ephemeral staged unified-diff content awaiting review.
pub struct PatchBuffer {
    file: NamedTempFile,
}

impl PatchBuffer {
    pub fn create() -> Result<Self> {
        let file = Builder::new()
            .prefix("resub-")
            .suffix(".patch")
            .tempfile()?;
        *active_buffer() = Some(file.path().to_path_buf());
        Ok(PatchBuffer { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn append(&mut self, diff: &str) -> Result<()> {
        self.file.write_all(diff.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    /// Re-read the buffer from its path; the editor may have rewritten the
    /// file rather than updating it in place.
    pub fn read_back(&self) -> Result<String> {
        fs::read_to_string(self.path()).map_err(|e| ResubError::file(self.path(), e))
    }
}

impl Drop for PatchBuffer {
    fn drop(&mut self) {
        // Deregister before the inner temp file deletes itself, so a late
        // interrupt cannot race against a path that no longer exists.
        let mut active = active_buffer();
        if active.as_deref() == Some(self.file.path()) {
            *active = None;
        }
    }
}

/// A whitespace-only buffer is the reviewer's explicit abort signal.
pub fn is_cleared(content: &str) -> bool {
    content.trim().is_empty()
}

#[derive(Debug)]
enum HunkLine {
    Context(String),
    Remove(String),
    Add(String),
}

#[derive(Debug)]
struct Hunk {
    /// 1-based line number in the original file.
    old_start: usize,
    lines: Vec<HunkLine>,
}

#[derive(Debug)]
struct FilePatch {
    path: String,
    hunks: Vec<Hunk>,
}

/// Strip the `a/`/`b/` prefixes git-style headers carry; our own diffs use
/// bare paths but a reviewer may paste from elsewhere.
fn strip_header_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

fn parse_hunk_header(line: &str) -> Option<usize> {
    // "@@ -12,3 +12,4 @@" (counts may be absent or stale after hand edits;
    // only the original start line anchors application)
    let rest = line.strip_prefix("@@ -")?;
    let end = rest.find(|c: char| c == ',' || c == ' ')?;
    rest[..end].parse().ok()
}

fn parse_patch(text: &str) -> Result<Vec<FilePatch>> {
    let mut patches: Vec<FilePatch> = Vec::new();
    let mut lines = text.lines().peekable();

    while let Some(raw) = lines.next() {
        // A file header is a "---" line immediately followed by a "+++"
        // line; a removed line that happens to start with "-- " does not
        // qualify and falls through to hunk content below.
        if let Some(path) = raw.strip_prefix("--- ") {
            if lines.peek().is_some_and(|next| next.starts_with("+++ ")) {
                lines.next();
                patches.push(FilePatch {
                    path: strip_header_prefix(path.trim_end()).to_string(),
                    hunks: Vec::new(),
                });
                continue;
            }
        }
        if raw.starts_with("@@") {
            let old_start = parse_hunk_header(raw)
                .ok_or_else(|| ResubError::Patch(format!("bad hunk header '{raw}'")))?;
            let current = patches
                .last_mut()
                .ok_or_else(|| ResubError::Patch("hunk before any file header".to_string()))?;
            current.hunks.push(Hunk {
                old_start,
                lines: Vec::new(),
            });
            continue;
        }
        if let Some(hunk) = patches.last_mut().and_then(|p| p.hunks.last_mut()) {
            if let Some(content) = raw.strip_prefix('+') {
                hunk.lines.push(HunkLine::Add(content.to_string()));
            } else if let Some(content) = raw.strip_prefix('-') {
                hunk.lines.push(HunkLine::Remove(content.to_string()));
            } else if let Some(content) = raw.strip_prefix(' ') {
                hunk.lines.push(HunkLine::Context(content.to_string()));
            } else if raw.is_empty() {
                // Editors strip trailing whitespace; a bare line inside a
                // hunk is an empty context line.
                hunk.lines.push(HunkLine::Context(String::new()));
            } else if raw.starts_with('\\') {
                // "\ No newline at end of file"
                continue;
            }
            // Anything else is inter-file noise; ignore it.
        }
    }

    patches.retain(|p| !p.hunks.is_empty());
    Ok(patches)
}

/// Apply one file's hunks to its current content.
fn apply_file_patch(patch: &FilePatch, content: &str) -> Result<String> {
    let had_newline = content.ends_with('\n');
    let lines: Vec<&str> = content.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut cursor = 0usize; // next unconsumed original line, 0-based

    let mut hunks: Vec<&Hunk> = patch.hunks.iter().collect();
    hunks.sort_by_key(|h| h.old_start);

    for hunk in hunks {
        let start = hunk.old_start.saturating_sub(1);
        if start < cursor {
            return Err(ResubError::Patch(format!(
                "{}: overlapping hunks at line {}",
                patch.path, hunk.old_start
            )));
        }
        if start > lines.len() {
            return Err(ResubError::Patch(format!(
                "{}: hunk starts past end of file (line {})",
                patch.path, hunk.old_start
            )));
        }
        out.extend(lines[cursor..start].iter().map(|s| s.to_string()));
        cursor = start;

        for hunk_line in &hunk.lines {
            match hunk_line {
                HunkLine::Context(expected) | HunkLine::Remove(expected) => {
                    let found = lines.get(cursor).ok_or_else(|| {
                        ResubError::Patch(format!(
                            "{}: hunk runs past end of file",
                            patch.path
                        ))
                    })?;
                    if found != expected {
                        return Err(ResubError::Patch(format!(
                            "{}: expected '{}' at line {}, found '{}'",
                            patch.path,
                            expected,
                            cursor + 1,
                            found
                        )));
                    }
                    if matches!(hunk_line, HunkLine::Context(_)) {
                        out.push((*found).to_string());
                    }
                    cursor += 1;
                }
                HunkLine::Add(added) => out.push(added.clone()),
            }
        }
    }

    out.extend(lines[cursor..].iter().map(|s| s.to_string()));
    let mut result = out.join("\n");
    if had_newline && !result.is_empty() {
        result.push('\n');
    }
    Ok(result)
}

/// Apply a unified diff against the tree rooted at `base`.
///
/// Returns the number of files rewritten. Any hunk that no longer matches
/// aborts the whole run; files already applied stay applied (the same
/// behavior an external patch run would have).
pub fn apply_patch(text: &str, base: &Path) -> Result<usize> {
    let patches = parse_patch(text)?;
    let mut changed = 0usize;

    for patch in &patches {
        let target = base.join(&patch.path);
        let content =
            fs::read_to_string(&target).map_err(|e| ResubError::file(&target, e))?;
        let updated = apply_file_patch(patch, &content)?;
        if updated != content {
            write_atomic(&target, &updated)?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Atomic in-place rewrite: write to a temp file in the target's directory,
/// carry the original permissions over, then rename into place. Used by
/// Update mode and by patch application.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let parent = parent.unwrap_or_else(|| Path::new("."));
    let mut temp =
        NamedTempFile::new_in(parent).map_err(|e| ResubError::file(path, e))?;
    temp.write_all(content.as_bytes())
        .map_err(|e| ResubError::file(path, e))?;
    temp.flush().map_err(|e| ResubError::file(path, e))?;
    if let Ok(metadata) = fs::metadata(path) {
        let _ = fs::set_permissions(temp.path(), metadata.permissions());
    }
    temp.persist(path)
        .map_err(|e| ResubError::file(path, e.error))?;
    Ok(())
}
