//! Glob patterns for namespace file filtering.
//!
//! Supported syntax: `*` (within one segment), `**` (any number of segments),
//! `?` (one character within a segment). Paths and patterns are compared
//! without their leading `/`.

use regex::Regex;

use super::errors::{StorageError, StorageResult};

#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> StorageResult<Self> {
        let trimmed = pattern.trim_start_matches('/');
        let mut expr = String::from("^");
        let chars: Vec<char> = trimmed.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '*' if chars.get(i + 1) == Some(&'*') => {
                    if chars.get(i + 2) == Some(&'/') {
                        expr.push_str("(?:.*/)?");
                        i += 3;
                    } else {
                        expr.push_str(".*");
                        i += 2;
                    }
                }
                '*' => {
                    expr.push_str("[^/]*");
                    i += 1;
                }
                '?' => {
                    expr.push_str("[^/]");
                    i += 1;
                }
                c => {
                    expr.push_str(&regex::escape(&c.to_string()));
                    i += 1;
                }
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| {
            StorageError::invalid_reference(format!("invalid glob pattern '{pattern}': {e}"))
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path.trim_start_matches('/'))
    }
}

/// Include / exclude filter. Empty includes match everything; excludes win.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    includes: Vec<GlobPattern>,
    excludes: Vec<GlobPattern>,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(includes: &[S], excludes: &[S]) -> StorageResult<Self> {
        let compile = |patterns: &[S]| {
            patterns
                .iter()
                .map(|p| GlobPattern::new(p.as_ref()))
                .collect::<StorageResult<Vec<_>>>()
        };
        Ok(Self {
            includes: compile(includes)?,
            excludes: compile(excludes)?,
        })
    }

    pub fn accepts(&self, path: &str) -> bool {
        let included = self.includes.is_empty() || self.includes.iter().any(|p| p.matches(path));
        included && !self.excludes.iter().any(|p| p.matches(path))
    }
}
