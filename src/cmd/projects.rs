//! Project management: `sitewatch projects`.

use anyhow::Result;
use console::style;
use sitewatch::api::{NewProject, Project, PropertyQuery, PropertySearch};
use sitewatch::config::Config;
use sitewatch::ui::Table;
use sitewatch::ui::dashboard::format_timestamp;
use sitewatch::ui::icons::{CHECK, WARN};
use sitewatch::ui::table::cell;

use super::super::ProjectsCommands;
use super::{api_client, confirm, with_spinner};

pub async fn cmd_projects(config: &Config, command: ProjectsCommands) -> Result<()> {
    let api = api_client(config)?;

    match command {
        ProjectsCommands::List => {
            let projects = with_spinner("Loading projects...", api.list_projects()).await?;
            print!("{}", projects_table(&projects).render());
        }
        ProjectsCommands::Add {
            domain,
            name,
            project_id,
            city,
            status,
        } => {
            let project = NewProject {
                domain: domain.trim().to_string(),
                project_name: name.trim().to_string(),
                project_id,
                city,
                status,
            };
            with_spinner("Creating project...", api.create_project(&project)).await?;
            println!(
                "{}Created project {} ({})",
                CHECK,
                style(&project.domain).cyan(),
                project.status
            );
        }
        ProjectsCommands::Delete { id } => {
            if !confirm(config, &format!("Delete project {}?", id)) {
                println!("{}Cancelled", WARN);
                return Ok(());
            }
            with_spinner("Deleting project...", api.delete_project(&id)).await?;
            println!("{}Deleted project {}", CHECK, id);
        }
        ProjectsCommands::Search {
            query,
            product_id,
            area,
        } => {
            let query = PropertyQuery {
                search_value: query,
                product_id,
                area,
            };
            let found = with_spinner("Searching properties...", api.find_property(&query)).await?;
            print!("{}", search_table(&found).render());
            println!(
                "{}",
                style(format!(
                    "{} of {} matching properties shown",
                    found.property.len(),
                    found.totalproperty
                ))
                .dim()
            );
        }
    }

    Ok(())
}

fn projects_table(projects: &[Project]) -> Table {
    let mut table = Table::new(vec![
        "ID",
        "Domain",
        "Project Name",
        "GitHub Repo",
        "City",
        "Status",
        "Created At",
    ])
    .empty_message("No projects found");
    for project in projects {
        table.push(vec![
            cell(Some(project.id.as_str())),
            cell(Some(project.domain.as_str())),
            cell(Some(project.project_name.as_str())),
            cell(project.github_repo.as_deref()),
            cell(project.city.as_deref()),
            cell(project.status.as_deref()),
            format_timestamp(project.created_at.as_ref()),
        ]);
    }
    table
}

fn search_table(found: &PropertySearch) -> Table {
    let mut table =
        Table::new(vec!["ID", "Name", "Area", "City"]).empty_message("No matching properties");
    for property in &found.property {
        table.push(vec![
            cell(Some(property.id.as_str())),
            cell(Some(property.name.as_str())),
            cell(property.area.as_deref()),
            cell(property.city.as_deref()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewatch::api::PropertyMatch;

    #[test]
    fn test_projects_table_blank_fields_render_dash() {
        let table = projects_table(&[Project {
            id: "p1".into(),
            domain: "a.com".into(),
            project_name: "Alpha".into(),
            ..Default::default()
        }]);
        let out = console::strip_ansi_codes(&table.render()).into_owned();
        let row = out.lines().nth(1).unwrap();
        assert!(row.starts_with("p1"));
        assert!(row.contains("a.com"));
        assert!(row.trim_end().ends_with('-'));
    }

    #[test]
    fn test_search_table_lists_matches() {
        let found = PropertySearch {
            property: vec![PropertyMatch {
                id: "x9".into(),
                name: "Lake View".into(),
                area: Some("Baner".into()),
                city: None,
            }],
            totalproperty: 12,
        };
        let table = search_table(&found);
        assert_eq!(table.len(), 1);
        assert!(table.render().contains("Lake View"));
    }
}
