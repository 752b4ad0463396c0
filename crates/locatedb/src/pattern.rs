//! Pattern translation and matching.
//!
//! User patterns contain literal text plus `*` (zero or more characters) and
//! `?` (exactly one character). Translation produces a storage-agnostic
//! [`SearchPredicate`] built from an explicit token sequence, so the store
//! can compile it into whatever lookup primitive it supports.
//!
//! Two deliberate semantics, applied uniformly across case modes:
//!
//! - A pattern containing a wildcard is anchored: the whole target field
//!   (basename or full path) must match it.
//! - A pattern with no wildcards at all is a substring query against the
//!   target field. The empty pattern is the degenerate substring that
//!   matches every record.

use memchr::memmem;

use crate::error::Result;
use crate::types::PathRecord;

// ---------------------------------------------------------------------------
// Pattern input
// ---------------------------------------------------------------------------

/// A raw user search pattern plus its flags.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub text: String,
    pub case_sensitive: bool,
    pub basename_only: bool,
}

impl Pattern {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            case_sensitive: true,
            basename_only: false,
        }
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn basename_only(mut self, yes: bool) -> Self {
        self.basename_only = yes;
        self
    }
}

// ---------------------------------------------------------------------------
// Token AST
// ---------------------------------------------------------------------------

/// One element of a tokenized pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternToken {
    /// A run of literal characters.
    Literal(String),
    /// `?` - exactly one character.
    AnyChar,
    /// `*` - zero or more characters. Consecutive stars collapse into one.
    AnySequence,
}

/// Which record field the predicate is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    FullPath,
    Basename,
}

/// Flattened glob element used by the backtracking matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GlobAtom {
    Lit(char),
    One,
    Many,
}

// ---------------------------------------------------------------------------
// SearchPredicate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum MatchKind {
    /// No wildcards: substring search against the target field.
    Substring(String),
    /// Wildcards present: anchored match over the whole target field.
    Glob {
        tokens: Vec<PatternToken>,
        atoms: Vec<GlobAtom>,
    },
}

/// The normalized, storage-agnostic form of a [`Pattern`].
#[derive(Debug, Clone)]
pub struct SearchPredicate {
    field: MatchField,
    case_sensitive: bool,
    kind: MatchKind,
}

impl SearchPredicate {
    /// Translates a pattern into a predicate.
    ///
    /// Translation is total for the two-wildcard grammar; the `Result` is
    /// reserved for future grammar extensions that can fail.
    pub fn translate(pattern: &Pattern) -> Result<Self> {
        let text = if pattern.case_sensitive {
            pattern.text.clone()
        } else {
            pattern.text.to_lowercase()
        };

        let field = if pattern.basename_only {
            MatchField::Basename
        } else {
            MatchField::FullPath
        };

        let kind = if text.contains('*') || text.contains('?') {
            let tokens = tokenize(&text);
            let atoms = flatten(&tokens);
            MatchKind::Glob { tokens, atoms }
        } else {
            MatchKind::Substring(text)
        };

        Ok(Self {
            field,
            case_sensitive: pattern.case_sensitive,
            kind,
        })
    }

    pub fn field(&self) -> MatchField {
        self.field
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// The token sequence for a wildcard predicate, empty for substring mode.
    pub fn tokens(&self) -> &[PatternToken] {
        match &self.kind {
            MatchKind::Glob { tokens, .. } => tokens,
            MatchKind::Substring(_) => &[],
        }
    }

    /// Literal text runs every match must contain. The store uses these to
    /// narrow the candidate set before full evaluation.
    pub fn required_literals(&self) -> Vec<&str> {
        match &self.kind {
            MatchKind::Substring(value) => {
                if value.is_empty() {
                    Vec::new()
                } else {
                    vec![value.as_str()]
                }
            }
            MatchKind::Glob { tokens, .. } => tokens
                .iter()
                .filter_map(|token| match token {
                    PatternToken::Literal(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Evaluates the predicate against one record.
    pub fn matches(&self, record: &PathRecord) -> bool {
        let target = match self.field {
            MatchField::FullPath => record.full_path.as_str(),
            MatchField::Basename => record.basename.as_str(),
        };
        self.matches_str(target)
    }

    /// Evaluates the predicate against a raw target string.
    pub fn matches_str(&self, target: &str) -> bool {
        if self.case_sensitive {
            self.matches_folded(target)
        } else {
            self.matches_folded(&target.to_lowercase())
        }
    }

    fn matches_folded(&self, target: &str) -> bool {
        match &self.kind {
            MatchKind::Substring(needle) => {
                memmem::find(target.as_bytes(), needle.as_bytes()).is_some()
            }
            MatchKind::Glob { atoms, .. } => glob_match(atoms, target),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenization
// ---------------------------------------------------------------------------

/// Splits pattern text into literal runs and wildcard tokens.
/// Consecutive `*` collapse into a single `AnySequence`.
fn tokenize(text: &str) -> Vec<PatternToken> {
    let mut tokens = Vec::new();
    let mut literal = String::new();

    for ch in text.chars() {
        match ch {
            '*' => {
                if !literal.is_empty() {
                    tokens.push(PatternToken::Literal(std::mem::take(&mut literal)));
                }
                if tokens.last() != Some(&PatternToken::AnySequence) {
                    tokens.push(PatternToken::AnySequence);
                }
            }
            '?' => {
                if !literal.is_empty() {
                    tokens.push(PatternToken::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(PatternToken::AnyChar);
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        tokens.push(PatternToken::Literal(literal));
    }

    tokens
}

fn flatten(tokens: &[PatternToken]) -> Vec<GlobAtom> {
    let mut atoms = Vec::new();
    for token in tokens {
        match token {
            PatternToken::Literal(text) => atoms.extend(text.chars().map(GlobAtom::Lit)),
            PatternToken::AnyChar => atoms.push(GlobAtom::One),
            PatternToken::AnySequence => atoms.push(GlobAtom::Many),
        }
    }
    atoms
}

// ---------------------------------------------------------------------------
// Glob matching
// ---------------------------------------------------------------------------

/// Matches an atom sequence against a candidate, anchored at both ends.
/// Iterative two-pointer scan with backtracking to the most recent star.
fn glob_match(atoms: &[GlobAtom], candidate: &str) -> bool {
    let chars = candidate.chars().collect::<Vec<_>>();

    let mut atom_index = 0usize;
    let mut char_index = 0usize;
    let mut star_index: Option<usize> = None;
    let mut star_char_index = 0usize;

    while char_index < chars.len() {
        if atom_index < atoms.len() {
            match atoms[atom_index] {
                GlobAtom::One => {
                    atom_index += 1;
                    char_index += 1;
                    continue;
                }
                GlobAtom::Lit(expected) if expected == chars[char_index] => {
                    atom_index += 1;
                    char_index += 1;
                    continue;
                }
                GlobAtom::Many => {
                    star_index = Some(atom_index);
                    atom_index += 1;
                    star_char_index = char_index;
                    continue;
                }
                GlobAtom::Lit(_) => {}
            }
        }

        if let Some(last_star_index) = star_index {
            atom_index = last_star_index + 1;
            star_char_index += 1;
            char_index = star_char_index;
            continue;
        }

        return false;
    }

    while atom_index < atoms.len() && atoms[atom_index] == GlobAtom::Many {
        atom_index += 1;
    }

    atom_index == atoms.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordKind;

    fn record(path: &str) -> PathRecord {
        let basename = path.rsplit('/').next().unwrap_or(path).to_string();
        PathRecord {
            full_path: path.to_string(),
            basename,
            depth: 1,
            kind: RecordKind::File,
            size_bytes: 0,
            modified_at: None,
        }
    }

    fn predicate(text: &str, case_sensitive: bool, basename_only: bool) -> SearchPredicate {
        SearchPredicate::translate(
            &Pattern::new(text)
                .case_sensitive(case_sensitive)
                .basename_only(basename_only),
        )
        .unwrap()
    }

    #[test]
    fn tokenize_collapses_star_runs() {
        assert_eq!(
            tokenize("a**b?"),
            vec![
                PatternToken::Literal("a".to_string()),
                PatternToken::AnySequence,
                PatternToken::Literal("b".to_string()),
                PatternToken::AnyChar,
            ]
        );
    }

    #[test]
    fn no_wildcards_is_substring() {
        let p = predicate("myfile", true, false);
        assert!(p.matches(&record("/home/user/myfile.txt")));
        assert!(p.matches(&record("/opt/old-myfile")));
        assert!(!p.matches(&record("/home/user/other.txt")));
    }

    #[test]
    fn empty_pattern_matches_everything() {
        let p = predicate("", true, false);
        assert!(p.matches(&record("/anything/at/all")));
    }

    #[test]
    fn question_mark_is_exactly_one_char() {
        let p = predicate("a?c", true, true);
        assert!(p.matches(&record("/d/abc")));
        assert!(p.matches(&record("/d/axc")));
        assert!(!p.matches(&record("/d/ac")));
        assert!(!p.matches(&record("/d/abbc")));
    }

    #[test]
    fn wildcard_patterns_are_anchored() {
        // "*.txt" must match the whole basename, not a substring of it.
        let p = predicate("*.txt", true, true);
        assert!(p.matches(&record("/d/notes.txt")));
        assert!(!p.matches(&record("/d/notes.txt.bak")));
    }

    #[test]
    fn lone_star_matches_everything() {
        let p = predicate("*", true, false);
        assert!(p.matches(&record("/")));
        assert!(p.matches(&record("/a/b/c")));
    }

    #[test]
    fn trailing_star_after_literal() {
        let p = predicate("report*", true, true);
        assert!(p.matches(&record("/d/report")));
        assert!(p.matches(&record("/d/report-2024.pdf")));
        assert!(!p.matches(&record("/d/old-report")));
    }

    #[test]
    fn case_insensitive_substring() {
        let p = predicate("File", false, true);
        assert!(p.matches(&record("/d/file.txt")));
        assert!(p.matches(&record("/d/MyFILES")));
    }

    #[test]
    fn case_insensitive_glob() {
        let p = predicate("*.TXT", false, true);
        assert!(p.matches(&record("/d/readme.txt")));
        assert!(!p.matches(&record("/d/readme.md")));
    }

    #[test]
    fn case_sensitive_by_default() {
        let p = predicate("File", true, true);
        assert!(!p.matches(&record("/d/file.txt")));
    }

    #[test]
    fn basename_only_ignores_directories_in_path() {
        let p = predicate("src", true, true);
        assert!(!p.matches(&record("/home/src/main.c")));
        assert!(p.matches(&record("/home/other/src")));
    }

    #[test]
    fn full_path_mode_matches_directory_components() {
        let p = predicate("src", true, false);
        assert!(p.matches(&record("/home/src/main.c")));
    }

    #[test]
    fn required_literals_from_glob() {
        let p = predicate("lib*.so.?", true, false);
        assert_eq!(p.required_literals(), vec!["lib", ".so."]);
    }

    #[test]
    fn backtracking_across_repeated_prefixes() {
        let p = predicate("*ab*abc", true, false);
        assert!(p.matches(&record("abxabyababc")));
        assert!(!p.matches(&record("abxabyabab")));
    }
}
