//! Notification settings: `sitewatch settings`.

use anyhow::Result;
use console::style;
use sitewatch::api::NotificationSettings;
use sitewatch::config::Config;
use sitewatch::ui::icons::CHECK;

use super::super::SettingsCommands;
use super::{api_client, with_spinner};

pub async fn cmd_settings(config: &Config, command: Option<SettingsCommands>) -> Result<()> {
    let api = api_client(config)?;

    match command {
        None => show(&with_spinner("Loading settings...", api.get_settings()).await?, false),
        Some(SettingsCommands::Show { reveal }) => {
            show(&with_spinner("Loading settings...", api.get_settings()).await?, reveal)
        }
        Some(SettingsCommands::Set {
            smtp_host,
            smtp_port,
            smtp_user,
            smtp_pass,
            twilio_sid,
            twilio_auth,
            twilio_from,
        }) => {
            let mut settings = with_spinner("Loading settings...", api.get_settings()).await?;
            let changed = apply(&mut settings.smtp_host, smtp_host)
                | apply(&mut settings.smtp_port, smtp_port.map(|p| p.to_string()))
                | apply(&mut settings.smtp_user, smtp_user)
                | apply(&mut settings.smtp_pass, smtp_pass)
                | apply(&mut settings.twilio_sid, twilio_sid)
                | apply(&mut settings.twilio_auth, twilio_auth)
                | apply(&mut settings.twilio_from, twilio_from);
            if !changed {
                println!("Nothing to update. Pass at least one --smtp-* or --twilio-* flag.");
                return Ok(());
            }
            with_spinner("Saving settings...", api.save_settings(&settings)).await?;
            println!("{}Settings saved", CHECK);
        }
    }

    Ok(())
}

fn apply(field: &mut String, value: Option<String>) -> bool {
    match value {
        Some(v) => {
            *field = v.trim().to_string();
            true
        }
        None => false,
    }
}

fn show(settings: &NotificationSettings, reveal: bool) {
    let settings = if reveal {
        settings.clone()
    } else {
        settings.masked()
    };
    println!();
    println!("{}", style("Notification Settings").bold());
    println!();
    for (name, value) in settings.fields() {
        if value.is_empty() {
            println!("  {:<12} {}", name, style("(not set)").dim());
        } else {
            println!("  {:<12} {}", name, value);
        }
    }
    println!();
}
