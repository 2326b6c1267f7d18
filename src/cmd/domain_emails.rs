//! Notification address mappings: `sitewatch domain-emails`.

use anyhow::Result;
use sitewatch::api::{DomainEmail, NewDomainEmail};
use sitewatch::config::Config;
use sitewatch::ui::Table;
use sitewatch::ui::dashboard::format_timestamp;
use sitewatch::ui::icons::{CHECK, WARN};
use sitewatch::ui::table::cell;

use super::super::DomainEmailsCommands;
use super::{api_client, confirm, with_spinner};

pub async fn cmd_domain_emails(config: &Config, command: DomainEmailsCommands) -> Result<()> {
    let api = api_client(config)?;

    match command {
        DomainEmailsCommands::List => {
            let mappings =
                with_spinner("Loading domain emails...", api.list_domain_emails()).await?;
            print!("{}", mappings_table(&mappings).render());
        }
        DomainEmailsCommands::Add { email, domains } => {
            let mapping = NewDomainEmail::from_input(email.trim(), &domains);
            with_spinner("Saving mapping...", api.create_domain_email(&mapping)).await?;
            if mapping.domains.is_empty() {
                println!("{}Added {} with no domains", CHECK, mapping.email);
            } else {
                println!(
                    "{}Added {} for {}",
                    CHECK,
                    mapping.email,
                    mapping.domains.join(", ")
                );
            }
        }
        DomainEmailsCommands::Delete { id } => {
            if !confirm(config, &format!("Delete domain email mapping {}?", id)) {
                println!("{}Cancelled", WARN);
                return Ok(());
            }
            with_spinner("Deleting mapping...", api.delete_domain_email(&id)).await?;
            println!("{}Deleted mapping {}", CHECK, id);
        }
    }

    Ok(())
}

fn mappings_table(mappings: &[DomainEmail]) -> Table {
    let mut table = Table::new(vec!["ID", "Email", "Domains", "Created At"])
        .empty_message("No domain email mappings");
    for mapping in mappings {
        let domains = mapping.domains.join(", ");
        table.push(vec![
            cell(Some(mapping.id.as_str())),
            cell(Some(mapping.email.as_str())),
            cell(Some(domains.as_str())),
            format_timestamp(mapping.created_at.as_ref()),
        ]);
    }
    table
}
