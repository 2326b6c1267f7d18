use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sitewatch::api::ProjectStatus;
use sitewatch::logging::{LogFormat, LogOptions};
use sitewatch::ui::UiMode;

mod cmd;

#[derive(Parser)]
#[command(name = "sitewatch")]
#[command(version, about = "Live feed dashboard and admin console for hosted microsites")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    pub yes: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Live feed endpoint (ws:// or wss://). Overrides SITEWATCH_FEED_URL and sitewatch.toml.
    #[arg(long, global = true)]
    pub feed_url: Option<String>,

    /// REST API base URL. Overrides SITEWATCH_API_URL and sitewatch.toml.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Log format: text, json
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Write logs to this file (rotated daily) instead of stderr.
    /// The full `watch` dashboard only shows errors on stderr without it.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Live dashboard of leads, visits, suspicious events and deployments
    ///
    /// The full UI redraws the terminal, so only errors are logged to stderr
    /// while it runs. Use --log-file to capture warnings and info.
    Watch {
        /// UI output mode: full, minimal, json
        #[arg(long)]
        ui: Option<UiMode>,

        /// Rows kept per table
        #[arg(long)]
        history: Option<usize>,
    },
    /// Follow the live deployment log for one domain
    Logs {
        /// Project domain, e.g. example.com
        domain: String,
    },
    /// Manage hosted projects
    Projects {
        #[command(subcommand)]
        command: ProjectsCommands,
    },
    /// List or submit leads
    Leads {
        #[command(subcommand)]
        command: LeadsCommands,
    },
    /// Manage which addresses receive lead notifications for which domains
    DomainEmails {
        #[command(subcommand)]
        command: DomainEmailsCommands,
    },
    /// View or update SMTP and SMS notification settings
    Settings {
        #[command(subcommand)]
        command: Option<SettingsCommands>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ProjectsCommands {
    /// List all projects
    List,
    /// Register a new project
    Add {
        #[arg(long)]
        domain: String,
        /// Display name of the project
        #[arg(long)]
        name: String,
        /// Catalogue property id (see `projects search`)
        #[arg(long)]
        project_id: Option<String>,
        #[arg(long)]
        city: Option<String>,
        /// active, inactive or suspended
        #[arg(long, default_value = "inactive")]
        status: ProjectStatus,
    },
    /// Delete a project by id
    Delete { id: String },
    /// Search the property catalogue
    Search {
        query: String,
        #[arg(long)]
        product_id: Option<String>,
        #[arg(long)]
        area: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum LeadsCommands {
    /// List leads for a domain
    List {
        #[arg(long)]
        domain: String,
    },
    /// Submit a lead
    Add {
        #[arg(long)]
        domain: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        mobile: String,
        #[arg(long)]
        interest: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum DomainEmailsCommands {
    /// List address-to-domain mappings
    List,
    /// Add a mapping
    Add {
        #[arg(long)]
        email: String,
        /// Comma-separated domains, e.g. "a.com, b.com"
        #[arg(long, default_value = "")]
        domains: String,
    },
    /// Delete a mapping by id
    Delete { id: String },
}

#[derive(Subcommand, Clone)]
pub enum SettingsCommands {
    /// Show current settings (secrets masked)
    Show {
        /// Print secrets in clear text
        #[arg(long)]
        reveal: bool,
    },
    /// Update settings; fields not given keep their current value
    Set {
        #[arg(long)]
        smtp_host: Option<String>,
        #[arg(long)]
        smtp_port: Option<u16>,
        #[arg(long)]
        smtp_user: Option<String>,
        #[arg(long)]
        smtp_pass: Option<String>,
        #[arg(long)]
        twilio_sid: Option<String>,
        #[arg(long)]
        twilio_auth: Option<String>,
        #[arg(long)]
        twilio_from: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default sitewatch.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = sitewatch::logging::init(&LogOptions {
        verbose: cli.verbose,
        format: cli.log_format,
        file: cli.log_file.clone(),
        redraws_screen: matches!(
            cli.command,
            Commands::Watch { ui: None | Some(UiMode::Full), .. }
        ),
    })?;

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Config { command } => cmd::cmd_config(&project_dir, &cli, command.clone())?,
        Commands::Watch { ui, history } => {
            let config = cmd::load_config(&project_dir, &cli, *ui, *history)?;
            cmd::cmd_watch(&config).await?;
        }
        Commands::Logs { domain } => {
            let config = cmd::load_config(&project_dir, &cli, None, None)?;
            cmd::cmd_logs(&config, domain).await?;
        }
        Commands::Projects { command } => {
            let config = cmd::load_config(&project_dir, &cli, None, None)?;
            cmd::cmd_projects(&config, command.clone()).await?;
        }
        Commands::Leads { command } => {
            let config = cmd::load_config(&project_dir, &cli, None, None)?;
            cmd::cmd_leads(&config, command.clone()).await?;
        }
        Commands::DomainEmails { command } => {
            let config = cmd::load_config(&project_dir, &cli, None, None)?;
            cmd::cmd_domain_emails(&config, command.clone()).await?;
        }
        Commands::Settings { command } => {
            let config = cmd::load_config(&project_dir, &cli, None, None)?;
            cmd::cmd_settings(&config, command.clone()).await?;
        }
    }

    Ok(())
}
