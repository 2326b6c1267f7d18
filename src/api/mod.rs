//! REST client for the backend: projects, leads, domain-email mappings,
//! notification settings and property search.

pub mod client;
pub mod models;

pub use client::ApiClient;
pub use models::{
    DomainEmail, LeadRecord, NewDomainEmail, NewLead, NewProject, NotificationSettings, Project,
    ProjectStatus, PropertyMatch, PropertyQuery, PropertySearch, parse_domains,
};
