//! Configuration view and validation commands: `sitewatch config`.

use std::path::Path;

use anyhow::Result;
use sitewatch::config::Config;
use sitewatch::sitewatch_config::{SitewatchToml, locate_config, project_config_path};

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(project_dir: &Path, cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => show(project_dir, cli),
        Some(ConfigCommands::Validate) => validate(project_dir),
        Some(ConfigCommands::Init) => init(project_dir),
    }
}

fn show(project_dir: &Path, cli: &Cli) -> Result<()> {
    println!();
    println!("Sitewatch Configuration");
    println!("=======================");
    println!();

    let toml = match locate_config(project_dir) {
        Some(path) => {
            println!("Config file: {}", path.display());
            println!();
            SitewatchToml::load(&path)?
        }
        None => {
            println!(
                "No sitewatch.toml found (looked for {})",
                project_config_path(project_dir).display()
            );
            println!("Run 'sitewatch config init' to create one.");
            println!();
            SitewatchToml::default()
        }
    };

    println!("[feed]");
    if let Some(url) = &toml.feed.url {
        println!("  url = \"{}\"", url);
    }
    println!("  history = {}", toml.feed.history);
    println!();
    println!("[feed.reconnect]");
    println!("  strategy = \"{}\"", toml.feed.reconnect.strategy);
    println!("  delay_ms = {}", toml.feed.reconnect.delay_ms);
    println!("  max_delay_ms = {}", toml.feed.reconnect.max_delay_ms);
    println!("  max_attempts = {}", toml.feed.reconnect.max_attempts);
    println!();
    println!("[api]");
    if let Some(url) = &toml.api.base_url {
        println!("  base_url = \"{}\"", url);
    }
    if let Some(url) = &toml.api.property_search_url {
        println!("  property_search_url = \"{}\"", url);
    }
    println!("  timeout_secs = {}", toml.api.timeout_secs);
    println!();
    println!("[ui]");
    println!("  mode = \"{}\"", toml.ui.mode);
    println!("  refresh_ms = {}", toml.ui.refresh_ms);
    println!();

    println!("Effective values (with env/CLI overrides):");
    match Config::load(project_dir, super::overrides(cli, None, None)) {
        Ok(config) => {
            println!(
                "  feed_url = \"{}\" ({})",
                config.feed_url, config.feed_url_source
            );
            println!(
                "  api_url = \"{}\" ({})",
                config.api_url, config.api_url_source
            );
            match &config.property_search_url {
                Some(url) => println!("  property_search_url = \"{}\"", url),
                None => println!("  property_search_url = (not set)"),
            }
            println!("  history = {}", config.history());
            println!("  ui_mode = \"{}\"", config.ui_mode());
        }
        Err(e) => println!("  {:#}", e),
    }
    println!();
    Ok(())
}

fn validate(project_dir: &Path) -> Result<()> {
    println!();
    println!("Validating configuration...");
    println!();

    let Some(path) = locate_config(project_dir) else {
        println!("No sitewatch.toml found. Using defaults (valid).");
        return Ok(());
    };

    let toml = SitewatchToml::load(&path)?;
    let warnings = toml.validate();

    if warnings.is_empty() {
        println!("Configuration is valid.");
    } else {
        println!("Configuration warnings:");
        for warning in warnings {
            println!("  - {}", warning);
        }
    }
    println!();
    Ok(())
}

fn init(project_dir: &Path) -> Result<()> {
    let config_path = project_config_path(project_dir);
    if config_path.exists() {
        println!("sitewatch.toml already exists at {}", config_path.display());
        println!("Delete it first if you want to recreate it.");
        return Ok(());
    }

    SitewatchToml::default().save(&config_path)?;

    println!("Created sitewatch.toml at {}", config_path.display());
    println!();
    println!("You can now customize:");
    println!("  - [feed] url, history");
    println!("  - [feed.reconnect] strategy, delay_ms, max_attempts");
    println!("  - [api] base_url, property_search_url, timeout_secs");
    println!();
    Ok(())
}
