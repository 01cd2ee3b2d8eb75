//! Ignore rule matchers
//!
//! A matcher is either a gitignore-style pattern (matched against a file's
//! relative path) or an arbitrary predicate over the file descriptor.

use std::fmt;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::{SitemillError, SitemillResult};
use crate::sources::{FilePredicate, SourceFile};

/// Pattern or predicate deciding whether a source file is suppressed.
pub enum Matcher {
    Pattern(Gitignore),
    Predicate(FilePredicate),
}

impl Matcher {
    /// Compile a gitignore-style pattern ("*.tmp", "drafts/", "!keep.md").
    pub fn pattern(pattern: &str) -> SitemillResult<Self> {
        let mut builder = GitignoreBuilder::new("");
        builder
            .add_line(None, pattern)
            .map_err(|e| SitemillError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        let matcher = builder.build().map_err(|e| SitemillError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::Pattern(matcher))
    }

    /// Wrap an arbitrary predicate.
    pub fn predicate(f: impl Fn(&SourceFile) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Box::new(f))
    }

    /// Whether the file matches (and should therefore be suppressed).
    pub fn matches(&self, file: &SourceFile) -> bool {
        match self {
            Self::Pattern(gitignore) => gitignore
                .matched_path_or_any_parents(&file.relative_path, false)
                .is_ignore(),
            Self::Predicate(f) => f(file),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(g) => write!(f, "Matcher::Pattern({} globs)", g.len()),
            Self::Predicate(_) => write!(f, "Matcher::Predicate(..)"),
        }
    }
}
