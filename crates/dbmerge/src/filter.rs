//! Glob-style entity name filtering.
//!
//! The differ consults a [`NameFilter`] before touching an entity: tokens
//! for excluded names are silently withheld, never reported as errors.
//! Patterns use `*` (any run of characters) and `?` (one character) and
//! match case-insensitively against the full name.

use crate::error::Result;
use regex::{Regex, RegexBuilder};

/// An include/exclude predicate over entity names.
///
/// With no include patterns every name is a candidate; exclude patterns
/// always win over includes.
#[derive(Debug, Default)]
pub struct NameFilter {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
}

impl NameFilter {
    /// A filter that includes everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an include pattern; once any include exists, only matching
    /// names pass.
    pub fn include(mut self, pattern: &str) -> Result<Self> {
        self.includes.push(compile_glob(pattern)?);
        Ok(self)
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        self.excludes.push(compile_glob(pattern)?);
        Ok(self)
    }

    /// Whether tokens referencing `name` may be produced.
    pub fn is_included(&self, name: &str) -> bool {
        if self.excludes.iter().any(|re| re.is_match(name)) {
            return false;
        }
        self.includes.is_empty() || self.includes.iter().any(|re| re.is_match(name))
    }
}

/// Translate a glob pattern into an anchored, case-insensitive regex.
fn compile_glob(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Ok(RegexBuilder::new(&expr).case_insensitive(true).build()?)
}
