//! Lead listing and submission: `sitewatch leads`.

use anyhow::Result;
use console::style;
use sitewatch::api::{LeadRecord, NewLead};
use sitewatch::config::Config;
use sitewatch::ui::Table;
use sitewatch::ui::dashboard::format_timestamp;
use sitewatch::ui::icons::CHECK;
use sitewatch::ui::table::cell;

use super::super::LeadsCommands;
use super::{api_client, with_spinner};

pub async fn cmd_leads(config: &Config, command: LeadsCommands) -> Result<()> {
    let api = api_client(config)?;

    match command {
        LeadsCommands::List { domain } => {
            let leads = with_spinner("Loading leads...", api.list_leads(domain.trim())).await?;
            print!("{}", leads_table(&leads).render());
        }
        LeadsCommands::Add {
            domain,
            name,
            mobile,
            interest,
        } => {
            let lead = NewLead {
                project_domain: domain.trim().to_string(),
                name: name.trim().to_string(),
                mobile: mobile.trim().to_string(),
                interest,
            };
            with_spinner("Submitting lead...", api.create_lead(&lead)).await?;
            println!(
                "{}Lead for {} submitted",
                CHECK,
                style(&lead.project_domain).cyan()
            );
        }
    }

    Ok(())
}

fn leads_table(leads: &[LeadRecord]) -> Table {
    let mut table = Table::new(vec!["Name", "Mobile", "Email", "Interest", "Created At"])
        .empty_message("No leads for this domain");
    for lead in leads {
        table.push(vec![
            cell(lead.name.as_deref()),
            cell(lead.mobile.as_deref()),
            cell(lead.email.as_deref()),
            cell(lead.interest.as_deref()),
            format_timestamp(lead.created_at.as_ref()),
        ]);
    }
    table
}
