//! Glob-matched response header rules.

use glob::{MatchOptions, Pattern, PatternError};
use serde::Deserialize;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Header rule as read from `http-headers.yaml`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct HeaderRuleDefinition {
    pub expression: String,
    #[serde(default)]
    pub headers: Vec<String>,
}

/// One `Name: Value` header line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderLine {
    pub name: String,
    pub value: String,
}

impl HeaderLine {
    /// Split a line on its first colon, trimming both sides.
    ///
    /// Returns `None` for lines without a colon or with an empty name.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let (name, value) = line.split_once(':')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_owned(),
            value: value.trim().to_owned(),
        })
    }
}

/// Headers to add to responses whose lookup key matches a glob expression.
#[derive(Clone, Debug)]
pub struct HeaderRule {
    pattern: Pattern,
    headers: Vec<HeaderLine>,
}

impl HeaderRule {
    /// Compile a rule. The expression is lower-cased.
    pub fn new(expression: &str, headers: Vec<HeaderLine>) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: Pattern::new(&expression.trim().to_lowercase())?,
            headers,
        })
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn headers(&self) -> &[HeaderLine] {
        &self.headers
    }

    /// Whether the rule applies to a lookup key (no leading slash).
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.pattern.matches_with(key, MATCH_OPTIONS)
    }
}

/// Ordered list of header rules. Every matching rule contributes.
#[derive(Clone, Debug, Default)]
pub struct HeaderRules {
    rules: Vec<HeaderRule>,
}

impl HeaderRules {
    #[must_use]
    pub fn new(rules: Vec<HeaderRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Header lines from every rule matching `key`, in rule order.
    pub fn matching<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a HeaderLine> {
        self.rules
            .iter()
            .filter(move |rule| rule.matches(key))
            .flat_map(HeaderRule::headers)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rule(expression: &str, lines: &[&str]) -> HeaderRule {
        let headers = lines.iter().filter_map(|l| HeaderLine::parse(l)).collect();
        HeaderRule::new(expression, headers).unwrap()
    }

    #[test]
    fn test_parse_header_line() {
        assert_eq!(
            HeaderLine::parse(" Cache-Control :  max-age=60, public "),
            Some(HeaderLine {
                name: "Cache-Control".to_owned(),
                value: "max-age=60, public".to_owned(),
            })
        );
        assert_eq!(
            HeaderLine::parse("Link: <https://example.com>; rel=preload")
                .map(|h| h.value),
            Some("<https://example.com>; rel=preload".to_owned())
        );
        assert_eq!(HeaderLine::parse("no colon"), None);
        assert_eq!(HeaderLine::parse(": value"), None);
    }

    #[test]
    fn test_recursive_wildcard_matches_deep_paths() {
        let rule = rule("docs/**", &["X-Robots-Tag: noindex"]);

        assert!(rule.matches("docs/api/v1"));
        assert!(rule.matches("docs/intro"));
        assert!(!rule.matches("blog/post-1"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let rule = rule("blog/*", &["X-A: 1"]);

        assert!(rule.matches("blog/post-1"));
        assert!(!rule.matches("blog/2024/post"));
    }

    #[test]
    fn test_expression_case_insensitive() {
        let rule = rule("Docs/**", &["X-A: 1"]);

        assert_eq!(rule.expression(), "docs/**");
        assert!(rule.matches("docs/API"));
    }

    #[test]
    fn test_all_matching_rules_contribute() {
        let rules = HeaderRules::new(vec![
            rule("**", &["X-Frame-Options: DENY"]),
            rule("docs/**", &["X-Robots-Tag: noindex", "Cache-Control: no-store"]),
            rule("blog/**", &["X-Blog: 1"]),
        ]);

        let names: Vec<_> = rules.matching("docs/api").map(|h| h.name.as_str()).collect();

        assert_eq!(names, ["X-Frame-Options", "X-Robots-Tag", "Cache-Control"]);
    }
}
