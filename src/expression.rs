//! Separator selection and substitution-expression assembly.
//!
//! The substitution expression is delimited text (`s/pattern/template/flags`)
//! and is only unambiguous when the delimiter appears in neither the pattern
//! nor the template. Selection scans a fixed, priority-ordered candidate list
//! so the same inputs always pick the same delimiter.

use crate::error::{ResubError, Result};

/// Candidate delimiters in priority order: forward slash first, then an
/// intentionally generous fallback sequence of punctuation.
pub const SEPARATOR_CANDIDATES: &[char] = &[
    '/', ',', ';', ':', '|', '%', '#', '@', '!', '=', '+', '~', '^', '&', '?', '_',
];

/// Pick a delimiter absent from both `pattern` and `template`.
///
/// An explicit override must itself be absent from both, otherwise the call
/// fails with `SeparatorConflict`. Without an override the first qualifying
/// candidate wins; exhausting the whole list is `NoSeparator`, which tells
/// the user to supply one with `--separator`.
pub fn select_separator(pattern: &str, template: &str, overridden: Option<char>) -> Result<char> {
    if let Some(c) = overridden {
        if pattern.contains(c) || template.contains(c) {
            return Err(ResubError::SeparatorConflict(c));
        }
        return Ok(c);
    }
    SEPARATOR_CANDIDATES
        .iter()
        .copied()
        .find(|&c| !pattern.contains(c) && !template.contains(c))
        .ok_or(ResubError::NoSeparator)
}

/// A fully assembled substitution expression.
///
/// Invariant: `separator` occurs in neither `pattern` nor `template`; the
/// strings pass through verbatim, so delimiter choice is the only escaping
/// concern. Built once per run and reused for every file in the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionExpression {
    pub separator: char,
    pub pattern: String,
    pub template: String,
    pub flags: String,
}

impl SubstitutionExpression {
    /// Assemble the expression. The global flag is always carried;
    /// case-insensitivity is appended on request.
    pub fn build(pattern: &str, template: &str, separator: char, ignore_case: bool) -> Self {
        debug_assert!(!pattern.contains(separator) && !template.contains(separator));
        let mut flags = String::from("g");
        if ignore_case {
            flags.push('i');
        }
        SubstitutionExpression {
            separator,
            pattern: pattern.to_string(),
            template: template.to_string(),
            flags,
        }
    }

    pub fn case_insensitive(&self) -> bool {
        self.flags.contains('i')
    }

    /// The delimited `s<sep>pattern<sep>template<sep>flags` form, used in
    /// diagnostics and debug logs.
    pub fn render(&self) -> String {
        let s = self.separator;
        format!("s{s}{p}{s}{t}{s}{f}", p = self.pattern, t = self.template, f = self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_is_preferred() {
        assert_eq!(select_separator("foo", "bar", None).unwrap(), '/');
    }

    #[test]
    fn test_skips_occupied_candidates() {
        assert_eq!(select_separator("a/b", "c", None).unwrap(), ',');
        assert_eq!(select_separator("a/b", "c,d", None).unwrap(), ';');
    }

    #[test]
    fn test_template_occupies_too() {
        assert_eq!(select_separator("a", "x/y", None).unwrap(), ',');
    }

    #[test]
    fn test_override_is_honored() {
        assert_eq!(select_separator("a/b", "c", Some('%')).unwrap(), '%');
    }

    #[test]
    fn test_override_conflict() {
        assert!(matches!(
            select_separator("a%b", "c", Some('%')),
            Err(ResubError::SeparatorConflict('%'))
        ));
        assert!(matches!(
            select_separator("a", "c%d", Some('%')),
            Err(ResubError::SeparatorConflict('%'))
        ));
    }

    #[test]
    fn test_exhaustion_asks_for_override() {
        let everything: String = SEPARATOR_CANDIDATES.iter().collect();
        assert!(matches!(
            select_separator(&everything, "", None),
            Err(ResubError::NoSeparator)
        ));
    }

    #[test]
    fn test_expression_flags() {
        let expr = SubstitutionExpression::build("foo", "bar", '/', false);
        assert_eq!(expr.flags, "g");
        assert!(!expr.case_insensitive());
        let expr = SubstitutionExpression::build("foo", "bar", '/', true);
        assert_eq!(expr.flags, "gi");
        assert!(expr.case_insensitive());
    }

    #[test]
    fn test_render_round_trips_on_separator() {
        let expr = SubstitutionExpression::build("fo,o", "b,ar", '/', true);
        assert_eq!(expr.render(), "s/fo,o/b,ar/gi");
        // The invariant makes a naive split unambiguous.
        let rendered = expr.render();
        let parts: Vec<&str> = rendered[1..].split('/').collect();
        assert_eq!(parts, vec!["", "fo,o", "b,ar", "gi"]);
    }
}
