//! Terminal display surfaces.

pub mod dashboard;
pub mod deployment_log;
pub mod icons;
pub mod table;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

pub use dashboard::Dashboard;
pub use deployment_log::DeploymentLog;
pub use table::Table;

/// Output mode for the live surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiMode {
    /// Tables redrawn in place
    #[default]
    Full,
    /// One status line per change
    Minimal,
    /// One JSON envelope per line on stdout
    Json,
}

impl std::str::FromStr for UiMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "minimal" => Ok(Self::Minimal),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Invalid UI mode '{}'. Valid values: full, minimal, json", s),
        }
    }
}

impl std::fmt::Display for UiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UiMode::Full => write!(f, "full"),
            UiMode::Minimal => write!(f, "minimal"),
            UiMode::Json => write!(f, "json"),
        }
    }
}

/// Spinner shown on stderr while a REST call is in flight.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_mode_from_str() {
        assert_eq!("json".parse::<UiMode>().unwrap(), UiMode::Json);
        assert_eq!("Minimal".parse::<UiMode>().unwrap(), UiMode::Minimal);
        assert!("fancy".parse::<UiMode>().is_err());
        assert_eq!(UiMode::default(), UiMode::Full);
    }
}
