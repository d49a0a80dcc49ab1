//! Scope filtering: which locations are eligible as candidates
//!
//! The search/ignore pattern pair is compiled once at startup into an
//! explicit set of match rules, so the per-sample check is a handful of
//! allocation-free string comparisons. Ignore rules are evaluated first
//! and always override a search match; no match at all means out of scope.

use crate::domain::Location;

/// A single compiled scope pattern.
///
/// Patterns are matched against container names only, never lines.
/// A leading `*` compiles to a substring rule; everything else is a
/// prefix rule (the common "package" form, e.g. `com.example`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchRule {
    Prefix(String),
    Contains(String),
}

impl MatchRule {
    /// Compile a raw pattern string into a rule.
    #[must_use]
    pub fn compile(pattern: &str) -> Self {
        match pattern.strip_prefix('*') {
            Some(rest) => MatchRule::Contains(rest.to_string()),
            None => MatchRule::Prefix(pattern.to_string()),
        }
    }

    /// Check a container name against this rule.
    #[must_use]
    pub fn matches(&self, container: &str) -> bool {
        match self {
            MatchRule::Prefix(p) => container.starts_with(p.as_str()),
            MatchRule::Contains(s) => container.contains(s.as_str()),
        }
    }
}

/// Compiled search/ignore scope, read-only after startup.
#[derive(Debug, Clone, Default)]
pub struct ScopeFilter {
    search: Vec<MatchRule>,
    ignore: Vec<MatchRule>,
}

impl ScopeFilter {
    /// Compile raw pattern lists into a filter.
    #[must_use]
    pub fn new<S: AsRef<str>>(search_patterns: &[S], ignore_patterns: &[S]) -> Self {
        Self {
            search: search_patterns.iter().map(|p| MatchRule::compile(p.as_ref())).collect(),
            ignore: ignore_patterns.iter().map(|p| MatchRule::compile(p.as_ref())).collect(),
        }
    }

    /// True if any search pattern was configured.
    #[must_use]
    pub fn has_search_patterns(&self) -> bool {
        !self.search.is_empty()
    }

    /// Scope membership test, called on every resolved sample frame.
    ///
    /// Fixed evaluation order: ignore rules first (an ignore match always
    /// excludes), then search rules. No pattern match defaults to false.
    #[must_use]
    pub fn in_scope(&self, location: &Location) -> bool {
        let container = location.container.as_str();
        if self.ignore.iter().any(|r| r.matches(container)) {
            return false;
        }
        self.search.iter().any(|r| r.matches(container))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(container: &str) -> Location {
        Location::new(container, 1)
    }

    #[test]
    fn test_prefix_match() {
        let filter = ScopeFilter::new(&["com.example"], &[]);
        assert!(filter.in_scope(&loc("com.example.Main")));
        assert!(!filter.in_scope(&loc("org.other.Main")));
    }

    #[test]
    fn test_contains_match() {
        let filter = ScopeFilter::new(&["*pipeline"], &[]);
        assert!(filter.in_scope(&loc("myapp::pipeline::stage")));
        assert!(!filter.in_scope(&loc("myapp::io::reader")));
    }

    #[test]
    fn test_no_match_defaults_out_of_scope() {
        let filter = ScopeFilter::new(&["com.example"], &[]);
        assert!(!filter.in_scope(&loc("com.exam")));
    }

    #[test]
    fn test_ignore_overrides_search() {
        // A location matching both a search and an ignore pattern is excluded
        let filter = ScopeFilter::new(&["com.example"], &["com.example.generated"]);
        assert!(filter.in_scope(&loc("com.example.Main")));
        assert!(!filter.in_scope(&loc("com.example.generated.Stub")));
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let filter = ScopeFilter::default();
        assert!(!filter.in_scope(&loc("anything")));
    }
}
