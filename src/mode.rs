//! Match modes for domain entries.

use std::fmt;

/// Mode describes how a rule value participates in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Match the domain and all of its subdomains
    #[default]
    Include,
    /// Match the exact host only
    IncludeExact,
    /// Remove a previously included value
    Exclude,
    /// Match any URL containing the keyword
    Keyword,
    /// Match a regular expression
    Regexp,
}

impl Mode {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Include => "INCLUDE",
            Mode::IncludeExact => "INCLUDE_EXACT",
            Mode::Exclude => "EXCLUDE",
            Mode::Keyword => "KEYWORD",
            Mode::Regexp => "REGEXP",
        }
    }

    /// Whether this mode removes entries instead of adding them.
    pub fn is_exclusion(self) -> bool {
        self == Mode::Exclude
    }

    /// Whether values in this mode are host names that get normalized.
    pub fn is_domain(self) -> bool {
        matches!(self, Mode::Include | Mode::IncludeExact | Mode::Exclude)
    }

    /// The value space this mode's values live in.
    pub fn kind(self) -> RuleKind {
        match self {
            Mode::Include | Mode::IncludeExact | Mode::Exclude => RuleKind::Domain,
            Mode::Keyword => RuleKind::Keyword,
            Mode::Regexp => RuleKind::Regexp,
        }
    }
}

/// Value space of a rule. Values of different kinds never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Host names (include, exact, exclude)
    Domain,
    /// Substring keywords
    Keyword,
    /// Regular expressions
    Regexp,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rule value tagged with its match mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainEntry {
    /// Normalized domain, keyword, or regular expression
    pub value: String,
    /// How the value is matched
    pub mode: Mode,
}

impl DomainEntry {
    /// Create a new entry.
    pub fn new(value: impl Into<String>, mode: Mode) -> Self {
        Self {
            value: value.into(),
            mode,
        }
    }

    /// Shorthand for an [`Mode::Include`] entry.
    pub fn include(value: impl Into<String>) -> Self {
        Self::new(value, Mode::Include)
    }

    /// Shorthand for an [`Mode::IncludeExact`] entry.
    pub fn exact(value: impl Into<String>) -> Self {
        Self::new(value, Mode::IncludeExact)
    }

    /// Shorthand for an [`Mode::Exclude`] entry.
    pub fn exclude(value: impl Into<String>) -> Self {
        Self::new(value, Mode::Exclude)
    }
}
