//! `sitewatch.toml`: the file layer of the configuration.
//!
//! Looked up at `.sitewatch/sitewatch.toml` in the project directory, then at
//! `<config_dir>/sitewatch/sitewatch.toml`. Every field has a default, so an
//! empty or missing file is valid.
//!
//! ```toml
//! [feed]
//! url = "wss://feed.example.com/ws"
//! history = 50
//!
//! [feed.reconnect]
//! strategy = "fixed"        # fixed | exponential
//! delay_ms = 5000
//! max_delay_ms = 60000
//! max_attempts = 0          # 0 = retry forever
//!
//! [api]
//! base_url = "https://api.example.com/api/v1"
//! property_search_url = "https://api.example.com/api/property/find"
//! timeout_secs = 15
//!
//! [ui]
//! mode = "full"             # full | minimal | json
//! refresh_ms = 1000
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ConfigError;
use crate::feed::{ExponentialBackoff, FixedDelay, Limited, ReconnectPolicy};
use crate::ui::UiMode;

/// Feed endpoint used when nothing is configured.
pub const DEV_FEED_URL: &str = "ws://localhost:9500/ws";
/// REST base used when nothing is configured.
pub const DEV_API_URL: &str = "http://localhost:9500/api/v1";

pub const ENV_FEED_URL: &str = "SITEWATCH_FEED_URL";
pub const ENV_API_URL: &str = "SITEWATCH_API_URL";
pub const ENV_PROPERTY_URL: &str = "SITEWATCH_PROPERTY_URL";

pub const CONFIG_DIR_NAME: &str = ".sitewatch";
pub const CONFIG_FILE_NAME: &str = "sitewatch.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectStrategy {
    #[default]
    Fixed,
    Exponential,
}

impl std::fmt::Display for ReconnectStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconnectStrategy::Fixed => write!(f, "fixed"),
            ReconnectStrategy::Exponential => write!(f, "exponential"),
        }
    }
}

/// `[feed.reconnect]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectSection {
    #[serde(default)]
    pub strategy: ReconnectStrategy,
    /// Fixed delay, or the base delay for exponential backoff.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Ceiling for exponential backoff. Ignored by `fixed`.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Consecutive failures before giving up. 0 retries forever.
    #[serde(default)]
    pub max_attempts: u32,
}

fn default_delay_ms() -> u64 {
    5000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            strategy: ReconnectStrategy::default(),
            delay_ms: default_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: 0,
        }
    }
}

impl ReconnectSection {
    /// Build the policy the subscriber will use.
    pub fn build_policy(&self) -> Arc<dyn ReconnectPolicy> {
        let delay = Duration::from_millis(self.delay_ms);
        match (self.strategy, self.max_attempts) {
            (ReconnectStrategy::Fixed, 0) => Arc::new(FixedDelay::new(delay)),
            (ReconnectStrategy::Fixed, n) => Arc::new(Limited::new(FixedDelay::new(delay), n)),
            (ReconnectStrategy::Exponential, n) => {
                let backoff =
                    ExponentialBackoff::new(delay, Duration::from_millis(self.max_delay_ms));
                if n == 0 {
                    Arc::new(backoff)
                } else {
                    Arc::new(Limited::new(backoff, n))
                }
            }
        }
    }
}

/// `[feed]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Rows kept per dashboard table.
    #[serde(default = "default_history")]
    pub history: usize,
    #[serde(default)]
    pub reconnect: ReconnectSection,
}

fn default_history() -> usize {
    sitewatch_common::DEFAULT_HISTORY
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            url: None,
            history: default_history(),
            reconnect: ReconnectSection::default(),
        }
    }
}

/// `[api]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_search_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: None,
            property_search_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `[ui]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSection {
    #[serde(default)]
    pub mode: UiMode,
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
}

fn default_refresh_ms() -> u64 {
    1000
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            mode: UiMode::default(),
            refresh_ms: default_refresh_ms(),
        }
    }
}

/// The complete sitewatch.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitewatchToml {
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub ui: UiSection,
}

impl SitewatchToml {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from the first existing candidate location, or defaults.
    pub fn load_or_default(project_dir: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match locate_config(project_dir) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        let content = toml::to_string_pretty(self).map_err(|e| {
            write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, content).map_err(write_err)
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(url) = &self.feed.url
            && let Err(e) = validate_feed_url("feed.url", url)
        {
            warnings.push(e.to_string());
        }
        if let Some(url) = &self.api.base_url
            && let Err(e) = validate_http_url("api.base_url", url)
        {
            warnings.push(e.to_string());
        }
        if let Some(url) = &self.api.property_search_url
            && let Err(e) = validate_http_url("api.property_search_url", url)
        {
            warnings.push(e.to_string());
        }

        if self.feed.history == 0 {
            warnings.push("feed.history is 0: dashboard tables will stay empty".to_string());
        }
        if self.feed.reconnect.delay_ms == 0 {
            warnings.push("feed.reconnect.delay_ms is 0: reconnects will spin".to_string());
        }
        if self.feed.reconnect.strategy == ReconnectStrategy::Exponential
            && self.feed.reconnect.max_delay_ms < self.feed.reconnect.delay_ms
        {
            warnings.push(format!(
                "feed.reconnect.max_delay_ms ({}) is below delay_ms ({})",
                self.feed.reconnect.max_delay_ms, self.feed.reconnect.delay_ms
            ));
        }
        if self.api.timeout_secs == 0 {
            warnings.push("api.timeout_secs is 0: every request will time out".to_string());
        }
        if self.ui.refresh_ms < 100 {
            warnings.push(format!(
                "ui.refresh_ms ({}) is very low; expect flicker",
                self.ui.refresh_ms
            ));
        }

        warnings
    }
}

/// Project-local config path, whether or not it exists.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// User-level config path under the platform config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sitewatch").join(CONFIG_FILE_NAME))
}

/// First existing config file: project-local, then user-level.
pub fn locate_config(project_dir: &Path) -> Option<PathBuf> {
    std::iter::once(project_config_path(project_dir))
        .chain(user_config_path())
        .find(|path| path.is_file())
}

pub fn validate_feed_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    validate_url(key, value, &["ws", "wss"])
}

pub fn validate_http_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    validate_url(key, value, &["http", "https"])
}

fn validate_url(key: &'static str, value: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        key,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(format!("scheme must be {}", schemes.join(" or "))));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let toml = SitewatchToml::parse("").unwrap();
        assert_eq!(toml.feed.url, None);
        assert_eq!(toml.feed.history, 50);
        assert_eq!(toml.feed.reconnect.strategy, ReconnectStrategy::Fixed);
        assert_eq!(toml.feed.reconnect.delay_ms, 5000);
        assert_eq!(toml.feed.reconnect.max_attempts, 0);
        assert_eq!(toml.api.timeout_secs, 15);
        assert_eq!(toml.ui.mode, UiMode::Full);
        assert_eq!(toml.ui.refresh_ms, 1000);
    }

    #[test]
    fn test_parse_full_file() {
        let content = r#"
[feed]
url = "wss://feed.example.com/ws"
history = 20

[feed.reconnect]
strategy = "exponential"
delay_ms = 1000
max_delay_ms = 30000
max_attempts = 8

[api]
base_url = "https://api.example.com/api/v1"
property_search_url = "https://api.example.com/api/property/find"
timeout_secs = 5

[ui]
mode = "json"
refresh_ms = 250
"#;
        let toml = SitewatchToml::parse(content).unwrap();
        assert_eq!(toml.feed.url.as_deref(), Some("wss://feed.example.com/ws"));
        assert_eq!(toml.feed.history, 20);
        assert_eq!(toml.feed.reconnect.strategy, ReconnectStrategy::Exponential);
        assert_eq!(toml.feed.reconnect.max_attempts, 8);
        assert_eq!(toml.api.timeout_secs, 5);
        assert_eq!(toml.ui.mode, UiMode::Json);
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn test_parse_rejects_unknown_strategy() {
        let err = SitewatchToml::parse("[feed.reconnect]\nstrategy = \"jitter\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_default_policy_is_fixed_five_seconds_forever() {
        let policy = ReconnectSection::default().build_policy();
        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(5000)));
        assert_eq!(policy.next_delay(1_000), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_policy_with_max_attempts_gives_up() {
        let section = ReconnectSection {
            strategy: ReconnectStrategy::Exponential,
            delay_ms: 100,
            max_delay_ms: 250,
            max_attempts: 3,
        };
        let policy = section.build_policy();
        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(3), Some(Duration::from_millis(250)));
        assert_eq!(policy.next_delay(4), None);
    }

    #[test]
    fn test_validate_flags_wrong_schemes() {
        let mut toml = SitewatchToml::default();
        toml.feed.url = Some("http://feed.example.com/ws".to_string());
        toml.api.base_url = Some("ws://api.example.com".to_string());

        let warnings = toml.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("feed.url"));
        assert!(warnings[1].contains("api.base_url"));
    }

    #[test]
    fn test_validate_flags_bad_numbers() {
        let mut toml = SitewatchToml::default();
        toml.feed.history = 0;
        toml.feed.reconnect.delay_ms = 0;
        toml.api.timeout_secs = 0;
        assert_eq!(toml.validate().len(), 3);
    }

    #[test]
    fn test_validate_url_helpers() {
        assert!(validate_feed_url("feed.url", "wss://x.example.com/ws").is_ok());
        assert!(validate_feed_url("feed.url", "not a url").is_err());
        assert!(validate_http_url("api.base_url", "https://x.example.com/api/v1").is_ok());
        let err = validate_http_url("api.base_url", "ftp://x.example.com").unwrap_err();
        assert!(err.to_string().contains("scheme must be http or https"));
    }

    #[test]
    fn test_save_and_load_roundtrip_creates_directory() {
        let dir = tempdir().unwrap();
        let path = project_config_path(dir.path());

        let mut toml = SitewatchToml::default();
        toml.feed.url = Some("wss://feed.example.com/ws".to_string());
        toml.feed.history = 10;
        toml.save(&path).unwrap();

        let loaded = SitewatchToml::load(&path).unwrap();
        assert_eq!(loaded, toml);
    }

    #[test]
    fn test_load_or_default_prefers_project_file() {
        let dir = tempdir().unwrap();
        let path = project_config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[feed]\nhistory = 7\n").unwrap();

        let (toml, source) = SitewatchToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.feed.history, 7);
        assert_eq!(source, Some(path));
    }

    #[test]
    fn test_load_reports_parse_error_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sitewatch.toml");
        std::fs::write(&path, "[feed\n").unwrap();

        let err = SitewatchToml::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("sitewatch.toml"));
    }
}
