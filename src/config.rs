//! Effective runtime configuration.
//!
//! Merges, lowest precedence first:
//! 1. `sitewatch.toml`
//! 2. Environment variables (`.env` is loaded first)
//! 3. CLI arguments
//!
//! Endpoints missing from all three fall back to the local dev backend, with a
//! warning.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use url::Url;

use crate::feed::ReconnectPolicy;
use crate::sitewatch_config::{
    DEV_API_URL, DEV_FEED_URL, ENV_API_URL, ENV_FEED_URL, ENV_PROPERTY_URL, SitewatchToml,
    validate_feed_url, validate_http_url,
};
use crate::ui::UiMode;

/// Values given on the command line. `None` leaves the lower layers in charge.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub feed_url: Option<String>,
    pub api_url: Option<String>,
    pub history: Option<usize>,
    pub ui_mode: Option<UiMode>,
    pub verbose: bool,
    pub yes: bool,
}

/// Where an endpoint value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cli,
    Env,
    File,
    DevFallback,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Cli => write!(f, "command line"),
            Source::Env => write!(f, "environment"),
            Source::File => write!(f, "config file"),
            Source::DevFallback => write!(f, "dev fallback"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    /// Config file that was read, if any.
    pub config_file: Option<PathBuf>,
    pub toml: SitewatchToml,
    pub feed_url: Url,
    pub feed_url_source: Source,
    pub api_url: Url,
    pub api_url_source: Source,
    pub property_search_url: Option<Url>,
    pub verbose: bool,
    pub yes: bool,
    history: Option<usize>,
    ui_mode: Option<UiMode>,
}

impl Config {
    /// Load the file and environment for `project_dir` and apply CLI overrides.
    pub fn load(project_dir: &Path, overrides: CliOverrides) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "Ignoring unreadable .env"),
        }

        let (toml, config_file) = SitewatchToml::load_or_default(project_dir)?;
        if let Some(path) = &config_file {
            debug!(path = %path.display(), "Using config file");
        }

        let mut config = Self::resolve(toml, overrides, |key| std::env::var(key).ok())?;
        config.project_dir = project_dir.to_path_buf();
        config.config_file = config_file;

        if config.feed_url_source == Source::DevFallback {
            warn!(
                url = %config.feed_url,
                "No feed URL configured (set {} or feed.url); using dev fallback", ENV_FEED_URL
            );
        }
        if config.api_url_source == Source::DevFallback {
            debug!(url = %config.api_url, "No API URL configured; using dev fallback");
        }
        for warning in config.toml.validate() {
            warn!("{}", warning);
        }

        Ok(config)
    }

    /// Merge the layers. `env` looks up an environment variable.
    pub fn resolve(
        toml: SitewatchToml,
        overrides: CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let (feed_raw, feed_url_source) = pick(
            overrides.feed_url.clone(),
            env(ENV_FEED_URL),
            toml.feed.url.clone(),
            DEV_FEED_URL,
        );
        let feed_url = validate_feed_url("feed.url", &feed_raw)
            .with_context(|| format!("Feed URL from {} is not usable", feed_url_source))?;

        let (api_raw, api_url_source) = pick(
            overrides.api_url.clone(),
            env(ENV_API_URL),
            toml.api.base_url.clone(),
            DEV_API_URL,
        );
        let api_url = validate_http_url("api.base_url", &api_raw)
            .with_context(|| format!("API URL from {} is not usable", api_url_source))?;

        let property_search_url = env(ENV_PROPERTY_URL)
            .or_else(|| toml.api.property_search_url.clone())
            .map(|raw| validate_http_url("api.property_search_url", &raw))
            .transpose()
            .context("Property search URL is not usable")?;

        Ok(Self {
            project_dir: PathBuf::from("."),
            config_file: None,
            toml,
            feed_url,
            feed_url_source,
            api_url,
            api_url_source,
            property_search_url,
            verbose: overrides.verbose,
            yes: overrides.yes,
            history: overrides.history,
            ui_mode: overrides.ui_mode,
        })
    }

    /// Rows per dashboard table (CLI, then file).
    pub fn history(&self) -> usize {
        self.history.unwrap_or(self.toml.feed.history)
    }

    pub fn ui_mode(&self) -> UiMode {
        self.ui_mode.unwrap_or(self.toml.ui.mode)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.toml.ui.refresh_ms.max(1))
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.api.timeout_secs)
    }

    pub fn reconnect_policy(&self) -> Arc<dyn ReconnectPolicy> {
        self.toml.feed.reconnect.build_policy()
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

fn pick(
    cli: Option<String>,
    env: Option<String>,
    file: Option<String>,
    fallback: &str,
) -> (String, Source) {
    cli.map(|v| (v, Source::Cli))
        .or_else(|| env.map(|v| (v, Source::Env)))
        .or_else(|| file.map(|v| (v, Source::File)))
        .unwrap_or_else(|| (fallback.to_string(), Source::DevFallback))
}
