//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled         |
//! |-----------------|--------------------------|
//! | `watch`         | `Watch`, `Logs`          |
//! | `projects`      | `Projects`               |
//! | `leads`         | `Leads`                  |
//! | `domain_emails` | `DomainEmails`           |
//! | `settings`      | `Settings`               |
//! | `config`        | `Config`                 |

pub mod config;
pub mod domain_emails;
pub mod leads;
pub mod projects;
pub mod settings;
pub mod watch;

use std::future::Future;
use std::path::Path;

use anyhow::Result;
use sitewatch::api::ApiClient;
use sitewatch::config::{CliOverrides, Config};
use sitewatch::errors::ApiError;
use sitewatch::ui::{UiMode, spinner};

use crate::Cli;

pub use config::cmd_config;
pub use domain_emails::cmd_domain_emails;
pub use leads::cmd_leads;
pub use projects::cmd_projects;
pub use settings::cmd_settings;
pub use watch::{cmd_logs, cmd_watch};

/// Resolve the effective configuration for a command.
pub fn load_config(
    project_dir: &Path,
    cli: &Cli,
    ui_mode: Option<UiMode>,
    history: Option<usize>,
) -> Result<Config> {
    Config::load(project_dir, overrides(cli, ui_mode, history))
}

pub fn overrides(cli: &Cli, ui_mode: Option<UiMode>, history: Option<usize>) -> CliOverrides {
    CliOverrides {
        feed_url: cli.feed_url.clone(),
        api_url: cli.api_url.clone(),
        history,
        ui_mode,
        verbose: cli.verbose,
        yes: cli.yes,
    }
}

pub fn api_client(config: &Config) -> Result<ApiClient> {
    Ok(ApiClient::new(
        &config.api_url,
        config.property_search_url.clone(),
        config.api_timeout(),
    )?)
}

/// Await a REST call behind a spinner.
pub async fn with_spinner<T>(
    message: &str,
    call: impl Future<Output = Result<T, ApiError>>,
) -> Result<T> {
    let bar = spinner(message);
    let result = call.await;
    bar.finish_and_clear();
    Ok(result?)
}

/// Ask before a destructive action unless `--yes` was given.
pub fn confirm(config: &Config, prompt: &str) -> bool {
    use dialoguer::Confirm;

    if config.yes {
        return true;
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}
