//! Run configuration: URL templates, defaults, and limits.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Placeholder replaced by the identifier in URL templates.
pub const PLACEHOLDER: &str = "{it}";

/// v2fly community data directory.
pub const COMMUNITY_URL: &str =
    "https://raw.githubusercontent.com/v2fly/domain-list-community/master/data/{it}";

/// Loyalsoldier pre-built release files.
pub const RELEASE_URL: &str =
    "https://raw.githubusercontent.com/Loyalsoldier/v2ray-rules-dat/release/{it}.txt";

/// Lists published as release files rather than community data.
pub const RELEASE_LISTS: &[&str] = &[
    "gfw",
    "china-list",
    "apple-cn",
    "google-cn",
    "win-spy",
    "win-update",
    "win-extra",
];

/// Lists converted when no identifier is given.
pub const DEFAULT_IDENTIFIERS: &[&str] = &[
    "gfw",
    "gfwfire",
    "google",
    "microsoft",
    "openai",
    "category-scholar-!cn",
    "category-scholar-cn",
];

/// Default output path.
pub const DEFAULT_OUTPUT: &str = "test.txt";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Configuration for a conversion run.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides:
///
/// ```json
/// { "timeout_secs": 30, "default_identifiers": ["gfw", "netflix"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL template for community lists
    pub community_url: String,
    /// URL template for release lists
    pub release_url: String,
    /// Identifiers served by `release_url`
    pub release_lists: Vec<String>,
    /// Identifiers used when none are requested
    pub default_identifiers: Vec<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Output path
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            community_url: COMMUNITY_URL.to_string(),
            release_url: RELEASE_URL.to_string(),
            release_lists: RELEASE_LISTS.iter().map(|s| s.to_string()).collect(),
            default_identifiers: DEFAULT_IDENTIFIERS.iter().map(|s| s.to_string()).collect(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that templates carry the placeholder and limits are sane.
    pub fn validate(&self) -> Result<()> {
        for (name, template) in [
            ("community_url", &self.community_url),
            ("release_url", &self.release_url),
        ] {
            if !template.contains(PLACEHOLDER) {
                return Err(Error::Config(format!(
                    "{} must contain {}: {}",
                    name, PLACEHOLDER, template
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL template a requested identifier is served from.
    fn template_for(&self, identifier: &str) -> &str {
        if self.release_lists.iter().any(|l| l == identifier) {
            &self.release_url
        } else {
            &self.community_url
        }
    }

    /// Resolve the download URL for an identifier.
    pub fn url_for(&self, identifier: &str) -> String {
        self.template_for(identifier).replace(PLACEHOLDER, identifier)
    }

    /// Resolve the URL of a list included from within `root`.
    ///
    /// Includes are looked up next to their root, so a community list
    /// including `win-update` gets the community file, not the release one.
    pub fn url_for_include(&self, root: &str, name: &str) -> String {
        self.template_for(root).replace(PLACEHOLDER, name)
    }
}
