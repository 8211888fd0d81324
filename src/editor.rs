//! Interactive editor resolution and invocation.
//!
//! Editor mode blocks until the external editor process terminates; that is
//! the one deliberate suspension point in an otherwise sequential run.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{ResubError, Result};

/// Resolve the reviewer's editor: the configured program first, then
/// `$VISUAL`, then `$EDITOR`, then plain `vi`. The winner must resolve to an
/// executable, otherwise the run fails before any staging work happens.
pub fn resolve_editor(configured: Option<&str>) -> Result<PathBuf> {
    let name = configured
        .map(str::to_string)
        .or_else(|| std::env::var("VISUAL").ok().filter(|v| !v.is_empty()))
        .or_else(|| std::env::var("EDITOR").ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "vi".to_string());

    which::which(&name).map_err(|_| ResubError::Editor(name))
}

/// Open `buffer` in the editor and wait. Returns whether the editor exited
/// successfully; a failing exit is the reviewer's abort.
pub fn review(editor: &Path, buffer: &Path) -> Result<bool> {
    tracing::debug!(editor = %editor.display(), "launching editor");
    let status = Command::new(editor).arg(buffer).status()?;
    Ok(status.success())
}
