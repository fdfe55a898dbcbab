//! Mapping directive parsing.
//!
//! A directive is one line of the map input: `<sourcePattern> -> <targetBranchPattern>`.
//! The line splits on the first `->`; both sides are trimmed. Directives with
//! wildcards in the source are expanded against the filesystem before
//! syncing, concrete ones map a single directory to a single branch.

use serde::Serialize;

use crate::errors::DirectiveError;
use crate::expand;

/// A parsed mapping directive, still pattern-shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Directory path or glob pattern, relative to the workspace root.
    pub source_pattern: String,
    /// Target branch name, with one substitution site per source wildcard.
    pub target_pattern: String,
}

/// A fully resolved mapping: one directory, one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcreteMapping {
    pub source_dir: String,
    pub target_branch: String,
}

impl Directive {
    /// Parse a single map line.
    ///
    /// Splits on the first `->` only, so a target containing `->` is kept
    /// intact. A missing separator is reported as an empty target, matching
    /// the empty-side checks. Wildcard directives are validated for capture
    /// parity here, before any filesystem work happens: a target that
    /// consumes more captures than the source can provide is rejected.
    pub fn parse(line: &str) -> Result<Self, DirectiveError> {
        let (source, target) = match line.split_once("->") {
            Some((source, target)) => (source.trim(), target.trim()),
            None => (line.trim(), ""),
        };

        if source.is_empty() {
            return Err(DirectiveError::EmptySource {
                line: line.to_string(),
            });
        }
        if target.is_empty() {
            return Err(DirectiveError::EmptyTarget {
                line: line.to_string(),
            });
        }

        let directive = Self {
            source_pattern: source.to_string(),
            target_pattern: target.to_string(),
        };

        if directive.has_wildcards() {
            let available = expand::count_source_captures(&directive.source_pattern);
            let required = expand::count_target_sites(&directive.target_pattern);
            if required > available {
                return Err(DirectiveError::CaptureMismatch {
                    line: line.to_string(),
                    available,
                    required,
                });
            }
        }

        Ok(directive)
    }

    /// Whether the source pattern needs filesystem expansion.
    pub fn has_wildcards(&self) -> bool {
        self.source_pattern.contains('*')
    }

    /// Treat this directive as already concrete. Only meaningful when
    /// [`has_wildcards`](Self::has_wildcards) is false.
    pub fn into_concrete(self) -> ConcreteMapping {
        ConcreteMapping {
            source_dir: self.source_pattern,
            target_branch: self.target_pattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let directive = Directive::parse("/docs -> site/docs").unwrap();
        assert_eq!(directive.source_pattern, "/docs");
        assert_eq!(directive.target_pattern, "site/docs");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let directive = Directive::parse("   /a   ->   sync/a   ").unwrap();
        assert_eq!(directive.source_pattern, "/a");
        assert_eq!(directive.target_pattern, "sync/a");
    }

    #[test]
    fn test_parse_splits_on_first_separator_only() {
        let directive = Directive::parse("/a -> b -> c").unwrap();
        assert_eq!(directive.source_pattern, "/a");
        assert_eq!(directive.target_pattern, "b -> c");
    }

    #[test]
    fn test_parse_missing_separator() {
        let err = Directive::parse("/just-a-path").unwrap_err();
        assert!(matches!(err, DirectiveError::EmptyTarget { .. }));
    }

    #[test]
    fn test_parse_empty_source() {
        let err = Directive::parse("-> sync/root").unwrap_err();
        assert!(matches!(err, DirectiveError::EmptySource { .. }));
    }

    #[test]
    fn test_parse_empty_target() {
        let err = Directive::parse("/a ->").unwrap_err();
        assert!(matches!(err, DirectiveError::EmptyTarget { .. }));
    }

    #[test]
    fn test_parse_blank_line() {
        let err = Directive::parse("").unwrap_err();
        assert!(matches!(err, DirectiveError::EmptySource { .. }));
    }

    #[test]
    fn test_wildcard_detection() {
        assert!(Directive::parse("/a/* -> /x/*").unwrap().has_wildcards());
        assert!(Directive::parse("/a/** -> /x/**").unwrap().has_wildcards());
        assert!(!Directive::parse("/a -> /x").unwrap().has_wildcards());
    }

    #[test]
    fn test_capture_parity_rejects_undersupply() {
        let err = Directive::parse("/a/* -> /x/*/*").unwrap_err();
        match err {
            DirectiveError::CaptureMismatch {
                available,
                required,
                ..
            } => {
                assert_eq!(available, 1);
                assert_eq!(required, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_capture_parity_accepts_equal_counts() {
        let directive = Directive::parse("/a/*/b/** -> /x/*/**").unwrap();
        assert_eq!(directive.source_pattern, "/a/*/b/**");
    }

    #[test]
    fn test_capture_parity_allows_surplus_captures() {
        // Unused source captures are fine; only target undersupply is fatal.
        assert!(Directive::parse("/a/*/* -> /x/*").is_ok());
    }

    #[test]
    fn test_into_concrete() {
        let mapping = Directive::parse("/ -> sync/root").unwrap().into_concrete();
        assert_eq!(mapping.source_dir, "/");
        assert_eq!(mapping.target_branch, "sync/root");
    }
}
