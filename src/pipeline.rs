//! The conversion pipeline: fetch, parse, aggregate, format, write.

use ahash::AHashSet;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::time::SystemTime;

use crate::aggregate::{aggregate, AggregateSet};
use crate::config::Config;
use crate::error::{ParseWarning, Result};
use crate::fetch::RuleSource;
use crate::format::format_all;
use crate::mode::DomainEntry;
use crate::parser::{Line, RuleParser};
use crate::writer::{self, OutputDocument};

/// Separators between identifiers on the command line.
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\s]+").unwrap());

/// Pipeline progress, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Fetching,
    Parsing,
    Aggregating,
    Formatting,
    Writing,
    Done,
}

impl Stage {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Fetching => "fetching",
            Stage::Parsing => "parsing",
            Stage::Aggregating => "aggregating",
            Stage::Formatting => "formatting",
            Stage::Writing => "writing",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Split command-line arguments into identifiers.
///
/// `["gfw", "google,openai"]` becomes `["gfw", "google", "openai"]`.
pub fn parse_identifiers<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    let joined = args.iter().map(|a| a.as_ref()).collect::<Vec<_>>().join(" ");
    SEPARATORS
        .split(&joined)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Identifiers to convert: the requested ones, or the configured defaults.
pub fn resolve_identifiers<S: AsRef<str>>(args: &[S], config: &Config) -> Vec<String> {
    let identifiers = parse_identifiers(args);
    if identifiers.is_empty() {
        config.default_identifiers.clone()
    } else {
        identifiers
    }
}

/// What one requested list contributed.
#[derive(Debug, Clone, Default)]
pub struct ListReport {
    /// Requested identifier
    pub identifier: String,
    /// Where the list came from
    pub location: String,
    /// Entries after include expansion
    pub entries: usize,
    /// Lists pulled in through `include:`, in expansion order
    pub includes: Vec<String>,
    /// Skipped lines across the list and its includes
    pub warnings: Vec<ParseWarning>,
}

/// Result of a conversion run.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Identifiers in processing order
    pub identifiers: Vec<String>,
    /// Per-list details
    pub lists: Vec<ListReport>,
    /// Surviving values and modes
    pub aggregate: AggregateSet,
    /// Rendered output
    pub document: OutputDocument,
}

impl Conversion {
    /// Number of surviving rule values.
    pub fn rule_count(&self) -> usize {
        self.aggregate.len()
    }

    /// Total skipped lines across all lists.
    pub fn warning_count(&self) -> usize {
        self.lists.iter().map(|l| l.warnings.len()).sum()
    }
}

/// Drives a conversion against a rule source.
pub struct Pipeline<'a, S: RuleSource + ?Sized> {
    source: &'a S,
    stage: Stage,
}

impl<'a, S: RuleSource + ?Sized> Pipeline<'a, S> {
    /// Create a pipeline reading from `source`.
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            stage: Stage::Idle,
        }
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage) {
        if self.stage != stage {
            log::debug!("pipeline: {} -> {}", self.stage, stage);
            self.stage = stage;
        }
    }

    /// Fetch and parse one list, expanding its includes in place.
    pub fn collect(&mut self, identifier: &str) -> Result<(Vec<DomainEntry>, ListReport)> {
        let mut report = ListReport {
            identifier: identifier.to_string(),
            location: self.source.location(identifier),
            ..ListReport::default()
        };
        let mut entries = Vec::new();
        let mut visited = AHashSet::new();

        self.expand(identifier, identifier, &mut visited, &mut entries, &mut report)?;
        report.entries = entries.len();
        Ok((entries, report))
    }

    /// Expand `identifier` in place. Includes are fetched relative to `root`.
    fn expand(
        &mut self,
        root: &str,
        identifier: &str,
        visited: &mut AHashSet<String>,
        entries: &mut Vec<DomainEntry>,
        report: &mut ListReport,
    ) -> Result<()> {
        if !visited.insert(identifier.to_string()) {
            log::debug!("{} already expanded, skipping", identifier);
            return Ok(());
        }

        self.enter(Stage::Fetching);
        let text = if identifier == root {
            self.source.fetch(identifier)?
        } else {
            self.source.fetch_include(root, identifier)?
        };

        self.enter(Stage::Parsing);
        let parsed = RuleParser::parse_lines(&text);
        report.warnings.extend(parsed.warnings);

        for line in parsed.lines {
            match line {
                Line::Entry(entry) => entries.push(entry),
                Line::Include(name) => {
                    log::debug!("{} includes {}", identifier, name);
                    report.includes.push(name.clone());
                    self.expand(root, &name, visited, entries, report)?;
                }
            }
        }

        Ok(())
    }

    /// Fetch every list, then aggregate and format. Nothing is written.
    ///
    /// Fails on the first list that cannot be fetched.
    pub fn convert(&mut self, identifiers: &[String]) -> Result<Conversion> {
        let mut lists = Vec::with_capacity(identifiers.len());
        let mut reports = Vec::with_capacity(identifiers.len());

        for identifier in identifiers {
            log::info!("Processing: {}", identifier);
            let (entries, report) = self.collect(identifier)?;
            log::info!(
                "{} -> {} (Rules: {})",
                identifier,
                report.location,
                report.entries
            );
            lists.push(entries);
            reports.push(report);
        }

        self.enter(Stage::Aggregating);
        let set = aggregate(&lists);

        self.enter(Stage::Formatting);
        let lines = format_all(&set);
        let document = OutputDocument::new(identifiers, lines, set.len(), SystemTime::now());

        Ok(Conversion {
            identifiers: identifiers.to_vec(),
            lists: reports,
            aggregate: set,
            document,
        })
    }

    /// Convert and write the result to `destination`.
    pub fn run(&mut self, identifiers: &[String], destination: &Path) -> Result<Conversion> {
        let conversion = self.convert(identifiers)?;

        self.enter(Stage::Writing);
        writer::write(&conversion.document, destination)?;

        self.enter(Stage::Done);
        Ok(conversion)
    }
}

/// Convert the requested lists (or the configured defaults) and write
/// them to `destination`.
pub fn run<S, A>(args: &[A], config: &Config, source: &S, destination: &Path) -> Result<Conversion>
where
    S: RuleSource + ?Sized,
    A: AsRef<str>,
{
    let identifiers = resolve_identifiers(args, config);
    Pipeline::new(source).run(&identifiers, destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fetch::StaticSource;
    use crate::mode::{Mode, RuleKind};

    #[test]
    fn test_parse_identifiers() {
        assert_eq!(
            parse_identifiers(&["gfw", "google,openai", " apple-cn , ,"]),
            vec!["gfw", "google", "openai", "apple-cn"]
        );
        assert!(parse_identifiers::<&str>(&[]).is_empty());
        assert!(parse_identifiers(&[",", "  "]).is_empty());
    }

    #[test]
    fn test_resolve_identifiers_defaults() {
        let config = Config::default();
        let none: [&str; 0] = [];
        assert_eq!(resolve_identifiers(&none, &config), config.default_identifiers);
        assert_eq!(resolve_identifiers(&["gfw"], &config), vec!["gfw"]);
    }

    #[test]
    fn test_collect_expands_includes_in_place() {
        let source = StaticSource::new()
            .with("root", "a.com\ninclude:child\nexclude:b.com\n")
            .with("child", "b.com\nfull:c.com\n");

        let mut pipeline = Pipeline::new(&source);
        let (entries, report) = pipeline.collect("root").unwrap();

        assert_eq!(
            entries,
            vec![
                DomainEntry::include("a.com"),
                DomainEntry::include("b.com"),
                DomainEntry::exact("c.com"),
                DomainEntry::exclude("b.com"),
            ]
        );
        assert_eq!(report.includes, vec!["child"]);
        assert_eq!(report.entries, 4);
    }

    #[test]
    fn test_include_cycle_terminates() {
        let source = StaticSource::new()
            .with("a", "a.com\ninclude:b\n")
            .with("b", "b.com\ninclude:a\ninclude:b\n");

        let mut pipeline = Pipeline::new(&source);
        let (entries, _) = pipeline.collect("a").unwrap();
        assert_eq!(entries.len(), 2);
    }

    /// Records which root each include was fetched under.
    struct RootRecorder {
        inner: StaticSource,
        calls: std::cell::RefCell<Vec<(String, String)>>,
    }

    impl RuleSource for RootRecorder {
        fn fetch(&self, identifier: &str) -> Result<String> {
            self.calls
                .borrow_mut()
                .push((identifier.to_string(), identifier.to_string()));
            self.inner.fetch(identifier)
        }

        fn fetch_include(&self, root: &str, name: &str) -> Result<String> {
            self.calls
                .borrow_mut()
                .push((root.to_string(), name.to_string()));
            self.inner.fetch(name)
        }
    }

    #[test]
    fn test_nested_includes_resolve_against_root() {
        let source = RootRecorder {
            inner: StaticSource::new()
                .with("microsoft", "microsoft.com\ninclude:win-update\n")
                .with("win-update", "update.microsoft.com\ninclude:win-extra\n")
                .with("win-extra", "extra.microsoft.com\n"),
            calls: Default::default(),
        };

        let mut pipeline = Pipeline::new(&source);
        let (entries, _) = pipeline.collect("microsoft").unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(
            *source.calls.borrow(),
            vec![
                ("microsoft".to_string(), "microsoft".to_string()),
                ("microsoft".to_string(), "win-update".to_string()),
                ("microsoft".to_string(), "win-extra".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_include_fails() {
        let source = StaticSource::new().with("root", "a.com\ninclude:ghost\n");
        let mut pipeline = Pipeline::new(&source);

        match pipeline.collect("root") {
            Err(Error::Fetch { identifier, .. }) => assert_eq!(identifier, "ghost"),
            other => panic!("expected fetch error, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_stages_and_counts() {
        let source = StaticSource::new()
            .with("one", "x.com\nbad..domain\n")
            .with("two", "x.com\nkeyword:ads\n");

        let mut pipeline = Pipeline::new(&source);
        assert_eq!(pipeline.stage(), Stage::Idle);

        let ids = vec!["one".to_string(), "two".to_string()];
        let conversion = pipeline.convert(&ids).unwrap();

        assert_eq!(pipeline.stage(), Stage::Formatting);
        assert_eq!(conversion.rule_count(), 2);
        assert_eq!(conversion.warning_count(), 1);
        assert_eq!(
            conversion.aggregate.get_rule(RuleKind::Keyword, "ads"),
            Some(Mode::Keyword)
        );
        assert_eq!(conversion.document.lines, vec!["||x.com^", "ads"]);
    }
}
