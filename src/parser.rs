//! Geosite rule list parser.
//!
//! The source format is one rule per line:
//!
//! ```text
//! # comment
//! google.com                 # subdomain-inclusive
//! full:www.google.com        # exact host
//! keyword:google             # substring
//! regexp:^ads\d+\.google\.   # regular expression
//! include:google-ads         # pull in another list
//! exclude:mail.google.com    # drop a previously included domain
//! youtube.com @ads           # attributes are ignored
//! ```
//!
//! Line prefixes are classified by an ordered table, first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseWarning;
use crate::mode::{DomainEntry, Mode};

/// Leading URL scheme, e.g. `https://`.
static SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w+.-]+://").unwrap());

/// Markers that start a full-line comment.
const COMMENT_MARKERS: &[&str] = &["#", "//", "!"];

/// Characters that start an inline comment or attribute list.
const TRAILER_MARKERS: &[char] = &['#', '@'];

/// Keyword starts that ABP would read as a comment, anchor, regex, or
/// exception rule instead of a substring match.
const KEYWORD_RESERVED_STARTS: &[&str] = &["!", "|", "/", "@@"];

/// What a classified line turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Include,
    Entry(Mode),
}

/// Ordered prefix table. Unprefixed lines are plain includes.
const PREFIX_RULES: &[(&str, LineKind)] = &[
    ("include:", LineKind::Include),
    ("regexp:", LineKind::Entry(Mode::Regexp)),
    ("keyword:", LineKind::Entry(Mode::Keyword)),
    ("full:", LineKind::Entry(Mode::IncludeExact)),
    ("domain:", LineKind::Entry(Mode::Include)),
    ("exclude:", LineKind::Entry(Mode::Exclude)),
    ("-", LineKind::Entry(Mode::Exclude)),
];

/// A meaningful line of a rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A rule value with its mode
    Entry(DomainEntry),
    /// `include:<name>` directive
    Include(String),
}

/// Result of parsing one rule list.
#[derive(Debug, Clone, Default)]
pub struct ParsedList {
    /// Entries and directives in file order
    pub lines: Vec<Line>,
    /// Lines that were skipped as malformed
    pub warnings: Vec<ParseWarning>,
}

impl ParsedList {
    /// Iterate over the entries, skipping directives.
    pub fn entries(&self) -> impl Iterator<Item = &DomainEntry> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry(entry) => Some(entry),
            Line::Include(_) => None,
        })
    }

    /// Iterate over the names of included lists.
    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Include(name) => Some(name.as_str()),
            Line::Entry(_) => None,
        })
    }
}

/// Geosite text format parser.
pub struct RuleParser;

impl RuleParser {
    /// Parse rule text into entries and directives.
    pub fn parse_lines(text: &str) -> ParsedList {
        let mut parsed = ParsedList::default();

        for (idx, raw) in text.lines().enumerate() {
            match parse_line(raw) {
                Ok(Some(line)) => parsed.lines.push(line),
                Ok(None) => {}
                Err(reason) => {
                    let warning = ParseWarning {
                        line: idx + 1,
                        text: raw.trim().to_string(),
                        reason,
                    };
                    log::warn!("skipping {}", warning);
                    parsed.warnings.push(warning);
                }
            }
        }

        parsed
    }

    /// Parse rule text into entries only, ignoring `include:` directives.
    pub fn parse(text: &str) -> Vec<DomainEntry> {
        Self::parse_lines(text)
            .lines
            .into_iter()
            .filter_map(|line| match line {
                Line::Entry(entry) => Some(entry),
                Line::Include(_) => None,
            })
            .collect()
    }
}

/// Parse rule text into entries. See [`RuleParser::parse`].
pub fn parse(text: &str) -> Vec<DomainEntry> {
    RuleParser::parse(text)
}

/// Parse one line. `Ok(None)` means blank or comment.
fn parse_line(raw: &str) -> Result<Option<Line>, &'static str> {
    let line = raw.trim();
    if line.is_empty() || COMMENT_MARKERS.iter().any(|m| line.starts_with(m)) {
        return Ok(None);
    }

    let line = match line.find(TRAILER_MARKERS) {
        Some(idx) => line[..idx].trim_end(),
        None => line,
    };
    if line.is_empty() {
        return Ok(None);
    }

    let (kind, value) = classify(line);
    let value = value.trim();
    if value.is_empty() {
        return Err("missing value");
    }

    match kind {
        LineKind::Include => {
            let name = value.split_whitespace().next().unwrap_or(value);
            Ok(Some(Line::Include(name.to_string())))
        }
        LineKind::Entry(Mode::Regexp) => Ok(Some(Line::Entry(DomainEntry::new(value, Mode::Regexp)))),
        LineKind::Entry(Mode::Keyword) => {
            if value.contains(char::is_whitespace) {
                return Err("keyword contains whitespace");
            }
            if KEYWORD_RESERVED_STARTS.iter().any(|p| value.starts_with(p)) {
                return Err("keyword starts with ABP syntax");
            }
            Ok(Some(Line::Entry(DomainEntry::new(
                value.to_lowercase(),
                Mode::Keyword,
            ))))
        }
        LineKind::Entry(mode) => match normalize_domain(value) {
            Some(domain) => Ok(Some(Line::Entry(DomainEntry::new(domain, mode)))),
            None => Err("not a valid domain"),
        },
    }
}

/// Split a line into its kind and the text after the prefix.
fn classify(line: &str) -> (LineKind, &str) {
    for (prefix, kind) in PREFIX_RULES {
        let matches = line
            .get(..prefix.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(prefix));
        if matches {
            return (*kind, &line[prefix.len()..]);
        }
    }
    (LineKind::Entry(Mode::Include), line)
}

/// Reduce a domain-ish value to a bare, lowercase host name.
///
/// Strips scheme, path, port, a leading `*.`, and surrounding dots.
/// Returns `None` if nothing valid remains.
pub fn normalize_domain(value: &str) -> Option<String> {
    let lower = value.trim().to_lowercase();
    let mut host = SCHEME.find(&lower).map_or(lower.as_str(), |m| &lower[m.end()..]);

    host = host.split('/').next().unwrap_or_default();
    host = host.split(':').next().unwrap_or_default();
    host = host.strip_prefix("*.").unwrap_or(host);
    host = host.trim_start_matches('.').trim_end_matches('.');

    if is_valid_host(host) {
        Some(host.to_string())
    } else {
        None
    }
}

fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && !host.contains("..")
        && host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}
