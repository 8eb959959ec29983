use faultline_core::{BaseError, ErrorCategory};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&BaseError) -> bool + Send + Sync>;

/// Declarative description of the errors a strategy applies to
#[derive(Clone)]
pub enum MatchRule {
    Any,
    Categories(HashSet<ErrorCategory>),
    Codes(HashSet<String>),
    CodePattern(Regex),
    AllOf(Vec<MatchRule>),
    AnyOf(Vec<MatchRule>),
    /// Escape hatch for conditions that depend on error details
    Custom(Predicate),
}

impl MatchRule {
    pub fn category(category: ErrorCategory) -> Self {
        MatchRule::Categories(HashSet::from([category]))
    }

    pub fn categories(categories: impl IntoIterator<Item = ErrorCategory>) -> Self {
        MatchRule::Categories(categories.into_iter().collect())
    }

    pub fn code(code: impl Into<String>) -> Self {
        MatchRule::Codes(HashSet::from([code.into()]))
    }

    pub fn codes<S: Into<String>>(codes: impl IntoIterator<Item = S>) -> Self {
        MatchRule::Codes(codes.into_iter().map(Into::into).collect())
    }

    pub fn code_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(MatchRule::CodePattern(Regex::new(pattern)?))
    }

    pub fn custom(predicate: impl Fn(&BaseError) -> bool + Send + Sync + 'static) -> Self {
        MatchRule::Custom(Arc::new(predicate))
    }

    pub fn matches(&self, error: &BaseError) -> bool {
        match self {
            MatchRule::Any => true,
            MatchRule::Categories(categories) => categories.contains(&error.category()),
            MatchRule::Codes(codes) => codes.contains(error.code()),
            MatchRule::CodePattern(pattern) => pattern.is_match(error.code()),
            MatchRule::AllOf(rules) => rules.iter().all(|rule| rule.matches(error)),
            MatchRule::AnyOf(rules) => rules.iter().any(|rule| rule.matches(error)),
            MatchRule::Custom(predicate) => predicate(error),
        }
    }
}

impl fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRule::Any => f.write_str("Any"),
            MatchRule::Categories(c) => f.debug_tuple("Categories").field(c).finish(),
            MatchRule::Codes(c) => f.debug_tuple("Codes").field(c).finish(),
            MatchRule::CodePattern(p) => f.debug_tuple("CodePattern").field(&p.as_str()).finish(),
            MatchRule::AllOf(r) => f.debug_tuple("AllOf").field(r).finish(),
            MatchRule::AnyOf(r) => f.debug_tuple("AnyOf").field(r).finish(),
            MatchRule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
