//! Ordered exclusion rules applied during file collection.

use regex::Regex;

use crate::error::{Result, ShipperError};

/// A compiled set of exclusion patterns.
///
/// Patterns are regular expressions evaluated against the path a file
/// would have inside the archive, never against absolute filesystem
/// paths. Exclusion is a union over the rules, so their order cannot
/// change the outcome; evaluation still short-circuits on the first
/// matching rule.
#[derive(Debug, Default)]
pub struct IgnoreRuleSet {
    rules: Vec<Regex>,
}

impl IgnoreRuleSet {
    /// Compile a list of pattern strings.
    ///
    /// An invalid pattern is a configuration error, reported before any
    /// collection work starts.
    pub fn compile(patterns: &[String]) -> Result<Self> {
        let mut rules = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let rule = Regex::new(pattern).map_err(|e| {
                ShipperError::Configuration(format!("invalid ignore pattern `{pattern}`: {e}"))
            })?;
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    /// Whether a candidate archive-relative path is excluded.
    ///
    /// A rule matches when it matches the full relative path or any
    /// single component of it, so anchored basename-style patterns like
    /// `^\.[^.].*` catch hidden files at any depth.
    pub fn is_ignored(&self, archive_path: &str) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        self.rules.iter().any(|rule| {
            rule.is_match(archive_path) || archive_path.split('/').any(|part| rule.is_match(part))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}
