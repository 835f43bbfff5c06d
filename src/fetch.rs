//! Rule list sources.
//!
//! A [`RuleSource`] turns a rule-list identifier into raw text. The
//! production source is [`HttpSource`], which downloads lists from the
//! v2fly community repository or Loyalsoldier's release files. The
//! in-memory [`StaticSource`] serves the same contract offline.

use ahash::AHashMap;
use reqwest::blocking::Client;

use crate::config::Config;
use crate::error::{Error, Result};

/// Something that can produce the raw text of a rule list.
pub trait RuleSource {
    /// Fetch the raw text for `identifier`.
    ///
    /// Fails with [`Error::Fetch`] on transport failure, non-success
    /// status, or an empty body.
    fn fetch(&self, identifier: &str) -> Result<String>;

    /// Fetch a list named by an `include:` directive inside `root`'s tree.
    ///
    /// Sources with a single namespace ignore `root`.
    fn fetch_include(&self, root: &str, name: &str) -> Result<String> {
        let _ = root;
        self.fetch(name)
    }

    /// Human-readable location of a list, for log messages.
    fn location(&self, identifier: &str) -> String {
        identifier.to_string()
    }
}

/// Reject identifiers that cannot name a list.
fn check_identifier(identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        return Err(Error::InvalidIdentifier(identifier.to_string()));
    }
    Ok(())
}

/// An empty body means the list does not exist or is unusable.
fn require_body(identifier: &str, text: String) -> Result<String> {
    if text.trim().is_empty() {
        return Err(Error::fetch(identifier, "empty response body"));
    }
    Ok(text)
}

/// Downloads rule lists over HTTP(S).
///
/// # Example
///
/// ```ignore
/// use geosite2abp::{Config, HttpSource, RuleSource};
///
/// let source = HttpSource::new(Config::default())?;
/// let text = source.fetch("google")?;
/// ```
pub struct HttpSource {
    client: Client,
    config: Config,
}

impl HttpSource {
    /// Create a source with a client built from the config's timeout.
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("geosite2abp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// Create a source with a caller-supplied client.
    pub fn with_client(config: Config, client: Client) -> Self {
        Self { client, config }
    }

    /// Get the configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn get(&self, identifier: &str, url: &str) -> Result<String> {
        log::debug!("GET {}", url);

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                Error::fetch(
                    identifier,
                    format!("timed out after {}s ({})", self.config.timeout_secs, url),
                )
            } else {
                Error::fetch(identifier, format!("request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(identifier, format!("HTTP {} from {}", status, url)));
        }

        let body = response
            .bytes()
            .map_err(|e| Error::fetch(identifier, format!("failed to read response: {}", e)))?;

        require_body(identifier, String::from_utf8_lossy(&body).into_owned())
    }
}

impl RuleSource for HttpSource {
    fn fetch(&self, identifier: &str) -> Result<String> {
        check_identifier(identifier)?;
        self.get(identifier, &self.config.url_for(identifier))
    }

    fn fetch_include(&self, root: &str, name: &str) -> Result<String> {
        check_identifier(name)?;
        self.get(name, &self.config.url_for_include(root, name))
    }

    fn location(&self, identifier: &str) -> String {
        self.config.url_for(identifier)
    }
}

/// Serves rule lists from memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    lists: AHashMap<String, String>,
}

impl StaticSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a list and return the source, for chaining.
    pub fn with(mut self, identifier: &str, text: &str) -> Self {
        self.insert(identifier, text);
        self
    }

    /// Add or replace a list.
    pub fn insert(&mut self, identifier: &str, text: &str) {
        self.lists.insert(identifier.to_string(), text.to_string());
    }

    /// Number of lists held.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Whether no lists are held.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

impl RuleSource for StaticSource {
    fn fetch(&self, identifier: &str) -> Result<String> {
        check_identifier(identifier)?;
        let text = self
            .lists
            .get(identifier)
            .cloned()
            .ok_or_else(|| Error::fetch(identifier, "unknown rule list"))?;
        require_body(identifier, text)
    }

    fn location(&self, identifier: &str) -> String {
        format!("memory:{}", identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_source_fetch() {
        let source = StaticSource::new().with("gfw", "google.com\n");
        assert_eq!(source.fetch("gfw").unwrap(), "google.com\n");
        assert_eq!(source.len(), 1);
        assert_eq!(source.location("gfw"), "memory:gfw");
    }

    #[test]
    fn test_static_source_unknown() {
        let source = StaticSource::new();
        match source.fetch("nope") {
            Err(Error::Fetch { identifier, .. }) => assert_eq!(identifier, "nope"),
            other => panic!("expected fetch error, got {:?}", other),
        }
    }

    #[test]
    fn test_static_source_empty_body() {
        let source = StaticSource::new().with("blank", "  \n\n");
        assert!(matches!(source.fetch("blank"), Err(Error::Fetch { .. })));
    }

    #[test]
    fn test_empty_identifier_rejected() {
        let source = StaticSource::new().with("", "a.com");
        assert!(matches!(source.fetch(""), Err(Error::InvalidIdentifier(_))));

        let http = HttpSource::new(Config::default()).unwrap();
        assert!(matches!(http.fetch(" "), Err(Error::InvalidIdentifier(_))));
    }

    #[test]
    fn test_http_source_location() {
        let http = HttpSource::new(Config::default()).unwrap();
        assert!(http.location("gfw").ends_with("/release/gfw.txt"));
        assert!(http.location("openai").ends_with("/data/openai"));
    }
}
