//! Tracing setup.
//!
//! Logs go to stderr, or to a daily-rolling file when one is given, so they
//! never interleave with table output on stdout. `RUST_LOG` overrides the
//! default filter.
//!
//! The full dashboard redraws the whole terminal, and stderr lines would tear
//! it. When it owns the screen and no log file is set, the default filter only
//! lets errors through; pass `--log-file` to keep the full log.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: text, json", s),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbose: bool,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
    /// The terminal is being redrawn in place.
    pub redraws_screen: bool,
}

impl LogOptions {
    /// Filter used when `RUST_LOG` is unset.
    pub fn default_filter(&self) -> &'static str {
        if self.redraws_screen && self.file.is_none() {
            "sitewatch=error,sitewatch_common=error"
        } else if self.verbose {
            "sitewatch=debug,sitewatch_common=debug"
        } else {
            "sitewatch=info,sitewatch_common=info"
        }
    }
}

/// Install the global subscriber.
///
/// Returns the file writer guard when logging to a file; keep it alive until
/// exit so buffered lines are flushed.
pub fn init(options: &LogOptions) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_filter()));
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = match &options.file {
        Some(path) => {
            let (dir, name) = split_log_path(path);
            let appender = tracing_appender::rolling::daily(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let installed = match options.format {
                LogFormat::Json => registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                    .try_init(),
                LogFormat::Text => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .try_init(),
            };
            installed.context("Failed to install tracing subscriber")?;
            Some(guard)
        }
        None => {
            let installed = match options.format {
                LogFormat::Json => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr),
                    )
                    .try_init(),
                LogFormat::Text => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_target(false)
                            .with_writer(std::io::stderr),
                    )
                    .try_init(),
            };
            installed.context("Failed to install tracing subscriber")?;
            None
        }
    };

    let target = options
        .file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(stderr)".to_string());
    tracing::debug!(format = %options.format, target = %target, "Logging initialized");
    Ok(guard)
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("sitewatch.log")
        .to_string();
    (dir, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_default_filter_follows_verbose() {
        let quiet = LogOptions::default();
        assert!(quiet.default_filter().starts_with("sitewatch=info"));
        let loud = LogOptions {
            verbose: true,
            ..Default::default()
        };
        assert!(loud.default_filter().starts_with("sitewatch=debug"));
    }

    #[test]
    fn test_full_screen_keeps_stderr_to_errors_unless_logging_to_file() {
        let full = LogOptions {
            verbose: true,
            redraws_screen: true,
            ..Default::default()
        };
        assert_eq!(full.default_filter(), "sitewatch=error,sitewatch_common=error");

        let to_file = LogOptions {
            file: Some(PathBuf::from("feed.log")),
            ..full
        };
        assert!(to_file.default_filter().starts_with("sitewatch=debug"));
    }

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("/var/log/sitewatch/feed.log"));
        assert_eq!(dir, PathBuf::from("/var/log/sitewatch"));
        assert_eq!(name, "feed.log");

        let (dir, name) = split_log_path(Path::new("feed.log"));
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "feed.log");
    }
}
