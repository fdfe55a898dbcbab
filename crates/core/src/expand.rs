//! Glob pattern expansion over the filesystem.
//!
//! Turns a wildcard mapping directive into concrete `<dir> -> <branch>`
//! lines:
//!
//! 1. Compile the source pattern into an anchored regex with one capture
//!    group per wildcard.
//! 2. Walk the directory tree under the pattern's literal prefix.
//! 3. For each matching directory, substitute the captured values into the
//!    target pattern, positionally.
//!
//! Pattern grammar on the source side: `*` matches exactly one path
//! segment, `**` followed by `/` matches zero or more whole segments
//! (consuming the trailing separator), `**` anywhere else matches any
//! character run. Everything else is literal.
//!
//! Candidate directories are rendered with both a leading and a trailing
//! slash (`/a/b/`) and patterns are normalized the same way, so `/a/**`
//! matches the directory `a` itself as well as everything below it.

use std::path::{Path, PathBuf};

use regex_lite::Regex;
use tracing::debug;

use crate::directive::Directive;
use crate::errors::ExpandError;

// ---------------------------------------------------------------------------
// Pattern compilation
// ---------------------------------------------------------------------------

/// A compiled source pattern.
pub struct PatternMatcher {
    regex: Regex,
    capture_count: usize,
    literal_prefix: PathBuf,
}

impl PatternMatcher {
    /// Compile a source pattern into its matching regex.
    pub fn compile(pattern: &str) -> Result<Self, ExpandError> {
        let normalized = normalize_pattern(pattern);
        let (expr, capture_count) = translate(&normalized);
        let regex = Regex::new(&expr).map_err(|e| ExpandError::InvalidPattern {
            pattern: pattern.to_string(),
            detail: e.to_string(),
        })?;
        let literal_prefix = literal_prefix(&normalized);
        debug!(pattern = %normalized, regex = %expr, "compiled glob pattern");
        Ok(Self {
            regex,
            capture_count,
            literal_prefix,
        })
    }

    /// Match a candidate rendered as `/{rel}/`. Returns one entry per
    /// wildcard in pattern order; a `**/` that matched zero segments yields
    /// `None`.
    pub fn matches(&self, candidate: &str) -> Option<Vec<Option<String>>> {
        let caps = self.regex.captures(candidate)?;
        Some(
            (1..=self.capture_count)
                .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                .collect(),
        )
    }

    /// Number of capture groups the pattern provides.
    pub fn capture_count(&self) -> usize {
        self.capture_count
    }

    /// Wildcard-free leading segments, relative to the walk root. The
    /// directory walk starts here instead of scanning the whole tree.
    pub fn literal_prefix(&self) -> &Path {
        &self.literal_prefix
    }
}

/// Normalize a pattern to have exactly one leading and one trailing slash,
/// mirroring how candidates are rendered.
fn normalize_pattern(pattern: &str) -> String {
    let mut normalized = String::new();
    if !pattern.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(pattern);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Translate a normalized pattern into an anchored regex, one pass, one
/// capture group per wildcard:
///
/// - `**/` → `(?:(.*)/)?` (zero or more whole segments)
/// - `**`  → `(.*)`
/// - `*`   → `([^/]+)` (exactly one segment)
///
/// Returns the regex source and the capture group count.
fn translate(normalized: &str) -> (String, usize) {
    let mut expr = String::from("^");
    let mut captures = 0;
    let mut chars = normalized.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    expr.push_str("(?:(.*)/)?");
                } else {
                    expr.push_str("(.*)");
                }
            } else {
                expr.push_str("([^/]+)");
            }
            captures += 1;
        } else {
            push_escaped(&mut expr, c);
        }
    }
    expr.push('$');
    (expr, captures)
}

fn push_escaped(expr: &mut String, c: char) {
    if matches!(
        c,
        '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '?' | '\\'
    ) {
        expr.push('\\');
    }
    expr.push(c);
}

/// The fully literal leading segments of a normalized pattern: everything
/// before the first segment containing a wildcard.
fn literal_prefix(normalized: &str) -> PathBuf {
    let literal = match normalized.find('*') {
        Some(idx) => &normalized[..idx],
        None => normalized,
    };
    // Drop any partial segment after the last separator.
    let prefix = match literal.rfind('/') {
        Some(idx) => &literal[..=idx],
        None => "",
    };
    prefix.split('/').filter(|s| !s.is_empty()).collect()
}

// ---------------------------------------------------------------------------
// Capture accounting
// ---------------------------------------------------------------------------

/// Capture groups a source pattern provides, counted exactly as
/// [`translate`] emits them.
pub(crate) fn count_source_captures(pattern: &str) -> usize {
    translate(&normalize_pattern(pattern)).1
}

/// Substitution sites in a target pattern: each maximal run of `*` within a
/// `/`-separated segment is one site.
pub(crate) fn count_target_sites(target: &str) -> usize {
    target
        .split('/')
        .map(|segment| {
            let mut sites = 0;
            let mut in_run = false;
            for c in segment.chars() {
                if c == '*' {
                    if !in_run {
                        sites += 1;
                        in_run = true;
                    }
                } else {
                    in_run = false;
                }
            }
            sites
        })
        .sum()
}

/// Substitute positional captures into a target pattern.
///
/// Each substitution site consumes the next capture in order; a capture of
/// `None` (a `**/` that matched zero segments) and a missing capture both
/// substitute as the empty string. Literal segments pass through untouched.
pub fn substitute(target: &str, captures: &[Option<String>]) -> String {
    let mut next = 0;
    let segments: Vec<String> = target
        .split('/')
        .map(|segment| {
            if !segment.contains('*') {
                return segment.to_string();
            }
            let mut out = String::new();
            let mut chars = segment.chars().peekable();
            while let Some(c) = chars.next() {
                if c == '*' {
                    while chars.peek() == Some(&'*') {
                        chars.next();
                    }
                    if let Some(Some(value)) = captures.get(next) {
                        out.push_str(value);
                    }
                    next += 1;
                } else {
                    out.push(c);
                }
            }
            out
        })
        .collect();
    segments.join("/")
}

// ---------------------------------------------------------------------------
// Filesystem expansion
// ---------------------------------------------------------------------------

/// Expands wildcard directives against a workspace root.
pub struct GlobExpander {
    root: PathBuf,
}

impl GlobExpander {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Expand a wildcard directive into concrete map lines, one
    /// `/{rel} -> {branch}` per matching directory, in sorted pre-order
    /// (parents before children). The workspace root itself is never a
    /// candidate. A missing literal prefix yields no matches.
    pub fn expand(&self, directive: &Directive) -> Result<Vec<String>, ExpandError> {
        let matcher = PatternMatcher::compile(&directive.source_pattern)?;
        let start = self.root.join(matcher.literal_prefix());
        if !start.is_dir() {
            debug!(
                prefix = %start.display(),
                "literal prefix is not a directory, no matches"
            );
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        collect_dirs(&start, &mut dirs)?;

        let mut lines = Vec::new();
        for dir in dirs {
            if dir == self.root {
                continue;
            }
            let rel = match dir.strip_prefix(&self.root) {
                Ok(rel) => rel.to_string_lossy().into_owned(),
                Err(_) => continue,
            };
            let candidate = format!("/{}/", rel);
            if let Some(captures) = matcher.matches(&candidate) {
                let branch = substitute(&directive.target_pattern, &captures);
                lines.push(format!("/{} -> {}", rel, branch));
            }
        }
        debug!(
            pattern = %directive.source_pattern,
            count = lines.len(),
            "expanded glob directive"
        );
        Ok(lines)
    }
}

/// Collect `dir` and every directory below it, children sorted by name,
/// parents before children. `.git` directories are never descended into and
/// symlinks are not followed.
fn collect_dirs(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    out.push(dir.to_path_buf());
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        // file_type() does not follow symlinks.
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if entry.file_name() == ".git" {
            continue;
        }
        collect_dirs(&entry.path(), out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn directive(line: &str) -> Directive {
        Directive::parse(line).unwrap()
    }

    // -------------------------------------------------------------------
    // Matcher tests
    // -------------------------------------------------------------------

    #[test]
    fn test_star_matches_single_segment() {
        let matcher = PatternMatcher::compile("/a/*").unwrap();
        assert_eq!(
            matcher.matches("/a/b/"),
            Some(vec![Some("b".to_string())])
        );
        assert_eq!(matcher.matches("/a/b/c/"), None);
        assert_eq!(matcher.matches("/b/x/"), None);
    }

    #[test]
    fn test_double_star_matches_zero_or_more_segments() {
        let matcher = PatternMatcher::compile("/a/**/nested").unwrap();
        assert_eq!(matcher.matches("/a/nested/"), Some(vec![None]));
        assert_eq!(
            matcher.matches("/a/p/nested/"),
            Some(vec![Some("p".to_string())])
        );
        assert_eq!(
            matcher.matches("/a/p/q/nested/"),
            Some(vec![Some("p/q".to_string())])
        );
    }

    #[test]
    fn test_trailing_double_star_matches_base_dir() {
        let matcher = PatternMatcher::compile("/a/**").unwrap();
        assert_eq!(matcher.matches("/a/"), Some(vec![None]));
        assert_eq!(
            matcher.matches("/a/x/y/"),
            Some(vec![Some("x/y".to_string())])
        );
    }

    #[test]
    fn test_match_is_anchored() {
        let matcher = PatternMatcher::compile("/a/*").unwrap();
        assert_eq!(matcher.matches("/prefix/a/b/"), None);
    }

    #[test]
    fn test_literal_regex_chars_escaped() {
        let matcher = PatternMatcher::compile("/a.b/*").unwrap();
        assert!(matcher.matches("/a.b/x/").is_some());
        assert_eq!(matcher.matches("/aXb/x/"), None);
    }

    #[test]
    fn test_pattern_without_leading_slash_normalized() {
        let matcher = PatternMatcher::compile("a/*").unwrap();
        assert!(matcher.matches("/a/b/").is_some());
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(
            PatternMatcher::compile("/a/b/*").unwrap().literal_prefix(),
            Path::new("a/b")
        );
        assert_eq!(
            PatternMatcher::compile("/a/**/n").unwrap().literal_prefix(),
            Path::new("a")
        );
        assert_eq!(
            PatternMatcher::compile("/*").unwrap().literal_prefix(),
            Path::new("")
        );
        // A partial literal segment before the wildcard is not part of the
        // prefix.
        assert_eq!(
            PatternMatcher::compile("/a/b*/c").unwrap().literal_prefix(),
            Path::new("a")
        );
    }

    #[test]
    fn test_capture_count() {
        assert_eq!(PatternMatcher::compile("/a/*").unwrap().capture_count(), 1);
        assert_eq!(
            PatternMatcher::compile("/a/**/n/*").unwrap().capture_count(),
            2
        );
        assert_eq!(PatternMatcher::compile("/a").unwrap().capture_count(), 0);
    }

    // -------------------------------------------------------------------
    // Substitution tests
    // -------------------------------------------------------------------

    #[test]
    fn test_substitute_single_site() {
        assert_eq!(substitute("/x/*", &[Some("b".to_string())]), "/x/b");
    }

    #[test]
    fn test_substitute_sites_consume_captures_in_order() {
        assert_eq!(
            substitute(
                "/x/*/y/*",
                &[Some("1".to_string()), Some("2".to_string())]
            ),
            "/x/1/y/2"
        );
    }

    #[test]
    fn test_substitute_multiple_runs_in_one_segment() {
        assert_eq!(
            substitute("/x/*-*", &[Some("a".to_string()), Some("b".to_string())]),
            "/x/a-b"
        );
    }

    #[test]
    fn test_substitute_star_run_is_one_site() {
        assert_eq!(
            substitute("/y/**", &[Some("p/q".to_string())]),
            "/y/p/q"
        );
    }

    #[test]
    fn test_substitute_none_capture_is_empty() {
        assert_eq!(substitute("/y/**", &[None]), "/y/");
    }

    #[test]
    fn test_substitute_missing_capture_is_empty() {
        assert_eq!(substitute("/x/*", &[]), "/x/");
    }

    #[test]
    fn test_count_target_sites() {
        assert_eq!(count_target_sites("/x/*/*"), 2);
        assert_eq!(count_target_sites("/x/**"), 1);
        assert_eq!(count_target_sites("/x/a*b*c"), 2);
        assert_eq!(count_target_sites("/x/plain"), 0);
    }

    #[test]
    fn test_count_source_captures() {
        assert_eq!(count_source_captures("/a/*"), 1);
        assert_eq!(count_source_captures("/a/**/n"), 1);
        assert_eq!(count_source_captures("/a/**"), 1);
        assert_eq!(count_source_captures("/a"), 0);
    }

    // -------------------------------------------------------------------
    // Expansion tests
    // -------------------------------------------------------------------

    #[test]
    fn test_star_expansion_lists_matching_dirs() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("a/b")).unwrap();
        fs::create_dir_all(temp.path().join("a/c")).unwrap();

        let expander = GlobExpander::new(temp.path());
        let lines = expander.expand(&directive("/a/* -> /x/*")).unwrap();
        assert_eq!(lines, vec!["/a/b -> /x/b", "/a/c -> /x/c"]);
    }

    #[test]
    fn test_double_star_expansion() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("a/p/nested")).unwrap();
        fs::create_dir_all(temp.path().join("a/p/q/nested")).unwrap();

        let expander = GlobExpander::new(temp.path());
        let lines = expander.expand(&directive("/a/**/nested -> /y/**")).unwrap();
        assert_eq!(
            lines,
            vec!["/a/p/nested -> /y/p", "/a/p/q/nested -> /y/p/q"]
        );
    }

    #[test]
    fn test_double_star_zero_segments() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("a/nested")).unwrap();

        let expander = GlobExpander::new(temp.path());
        let lines = expander.expand(&directive("/a/**/nested -> /y/**")).unwrap();
        assert_eq!(lines, vec!["/a/nested -> /y/"]);
    }

    #[test]
    fn test_expansion_order_is_sorted_preorder() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("a/z")).unwrap();
        fs::create_dir_all(temp.path().join("a/m/k")).unwrap();

        let expander = GlobExpander::new(temp.path());
        let lines = expander.expand(&directive("/a/** -> t/**")).unwrap();
        assert_eq!(
            lines,
            vec![
                "/a -> t/",
                "/a/m -> t/m",
                "/a/m/k -> t/m/k",
                "/a/z -> t/z",
            ]
        );
    }

    #[test]
    fn test_root_is_never_a_candidate() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("sub")).unwrap();

        let expander = GlobExpander::new(temp.path());
        let lines = expander.expand(&directive("/** -> b/**")).unwrap();
        assert_eq!(lines, vec!["/sub -> b/sub"]);
    }

    #[test]
    fn test_git_dirs_are_skipped() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("a/.git/refs")).unwrap();
        fs::create_dir_all(temp.path().join("a/b")).unwrap();

        let expander = GlobExpander::new(temp.path());
        let lines = expander.expand(&directive("/a/* -> /x/*")).unwrap();
        assert_eq!(lines, vec!["/a/b -> /x/b"]);

        let lines = expander.expand(&directive("/** -> m/**")).unwrap();
        assert_eq!(lines, vec!["/a -> m/a", "/a/b -> m/a/b"]);
    }

    #[test]
    fn test_missing_literal_prefix_yields_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let expander = GlobExpander::new(temp.path());
        let lines = expander.expand(&directive("/nope/* -> /x/*")).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_files_are_not_candidates() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("a")).unwrap();
        fs::write(temp.path().join("a/file.txt"), "content").unwrap();

        let expander = GlobExpander::new(temp.path());
        let lines = expander.expand(&directive("/a/* -> /x/*")).unwrap();
        assert!(lines.is_empty());
    }
}
