//! Geosite2ABP - convert Geosite domain lists into AutoProxy rule files.
//!
//! Geosite lists (the v2fly `domain-list-community` data files and
//! Loyalsoldier's pre-built release lists) group domains by tag, such as
//! `gfw` or `google`. This crate downloads one or more of them and merges
//! them into a single deduplicated list. It writes that list in the
//! AdBlock Plus / AutoProxy syntax understood by proxy switchers and
//! ad blockers.
//!
//! # Quick Start
//!
//! ```ignore
//! use geosite2abp::{pipeline, Config, HttpSource};
//! use std::path::Path;
//!
//! let config = Config::default();
//! let source = HttpSource::new(config.clone())?;
//!
//! let conversion = pipeline::run(&["gfw", "google"], &config, &source, Path::new("out.txt"))?;
//! println!("{} rules", conversion.rule_count());
//! ```
//!
//! # Rule Syntax
//!
//! | Geosite line          | Output                                   |
//! |-----------------------|------------------------------------------|
//! | `example.com`         | `\|\|example.com^`                       |
//! | `full:example.com`    | `\|http://example.com/`, `\|https://example.com/` |
//! | `keyword:example`     | `example`                                |
//! | `regexp:\Aad\d+\.`    | `/^ad\d+\./`                             |
//! | `include:other`       | contents of `other`, expanded in place   |
//! | `exclude:example.com` | removes `example.com` from the output    |
//!
//! # Pipeline
//!
//! 1. Fetch each list through a [`RuleSource`]
//! 2. Parse it with [`RuleParser`], expanding `include:` directives
//! 3. Fold all lists, in request order, into an [`AggregateSet`]
//! 4. Format the survivors and write them atomically

mod error;
mod mode;

pub mod aggregate;
pub mod config;
pub mod fetch;
pub mod format;
pub mod parser;
pub mod pipeline;
pub mod writer;

// Re-export core types
pub use error::{Error, ParseWarning, Result};
pub use mode::{DomainEntry, Mode, RuleKind};

pub use aggregate::{aggregate, AggregateSet};
pub use config::Config;
pub use fetch::{HttpSource, RuleSource, StaticSource};
pub use format::{convert_go_regex, format, format_all};
pub use parser::{parse, Line, ParsedList, RuleParser};
pub use pipeline::{Conversion, ListReport, Pipeline, Stage};
pub use writer::{write, OutputDocument};
