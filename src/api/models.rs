//! Request and response bodies for the backend REST API.
//!
//! Response types are lenient: every field defaults, unknown fields are
//! ignored. Request types validate before they are sent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sitewatch_common::Timestamp;

use crate::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    #[default]
    Inactive,
    Suspended,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectStatus::Active => write!(f, "active"),
            ProjectStatus::Inactive => write!(f, "inactive"),
            ProjectStatus::Suspended => write!(f, "suspended"),
        }
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ProjectStatus::Active),
            "inactive" => Ok(ProjectStatus::Inactive),
            "suspended" => Ok(ProjectStatus::Suspended),
            _ => anyhow::bail!(
                "Invalid project status '{}'. Valid values: active, inactive, suspended",
                s
            ),
        }
    }
}

/// A hosted microsite as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,
    pub domain: String,
    pub project_name: String,
    pub project_id: Option<String>,
    pub github_repo: Option<String>,
    pub city: Option<String>,
    /// Kept as text: the backend may add states this client does not know.
    pub status: Option<String>,
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub domain: String,
    pub project_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub status: ProjectStatus,
}

impl NewProject {
    pub fn validate(&self) -> Result<(), ApiError> {
        require("domain", &self.domain)?;
        require("project name", &self.project_name)
    }
}

/// A lead as returned by `GET /leads`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadRecord {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub interest: Option<String>,
    pub project_domain: Option<String>,
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub project_domain: String,
    pub name: String,
    pub mobile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest: Option<String>,
}

impl NewLead {
    pub fn validate(&self) -> Result<(), ApiError> {
        require("project domain", &self.project_domain)?;
        require("name", &self.name)?;
        require("mobile", &self.mobile)
    }
}

/// Mapping from a notification address to the domains it receives leads for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainEmail {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub domains: Vec<String>,
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDomainEmail {
    pub email: String,
    pub domains: Vec<String>,
}

impl NewDomainEmail {
    /// Build from a comma-separated domain list as typed by the operator.
    pub fn from_input(email: impl Into<String>, domains: &str) -> Self {
        Self {
            email: email.into(),
            domains: parse_domains(domains),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        require("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(ApiError::InvalidInput(format!(
                "'{}' is not an email address",
                self.email
            )));
        }
        Ok(())
    }
}

/// Split on commas, trim, and drop empty entries.
pub fn parse_domains(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

/// SMTP and Twilio settings used by the backend for lead notifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub smtp_host: String,
    /// The backend has stored this both as a number and as a string.
    #[serde(deserialize_with = "lenient_string")]
    pub smtp_port: String,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub twilio_sid: String,
    pub twilio_auth: String,
    pub twilio_from: String,
}

impl NotificationSettings {
    /// Copy with secrets replaced, for display.
    pub fn masked(&self) -> Self {
        Self {
            smtp_pass: mask(&self.smtp_pass),
            twilio_auth: mask(&self.twilio_auth),
            ..self.clone()
        }
    }

    /// Every field may be left empty; SMS-only and email-only setups are both
    /// valid. A port, when given, must be a port number.
    pub fn validate(&self) -> Result<(), ApiError> {
        let port = self.smtp_port.trim();
        if !port.is_empty() && port.parse::<u16>().is_err() {
            return Err(ApiError::InvalidInput(format!(
                "SMTP port '{}' is not a port number",
                self.smtp_port
            )));
        }
        Ok(())
    }

    /// Field names in display order, paired with values.
    pub fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("smtpHost", &self.smtp_host),
            ("smtpPort", &self.smtp_port),
            ("smtpUser", &self.smtp_user),
            ("smtpPass", &self.smtp_pass),
            ("twilioSid", &self.twilio_sid),
            ("twilioAuth", &self.twilio_auth),
            ("twilioFrom", &self.twilio_from),
        ]
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Body of the property-search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyQuery {
    pub search_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PropertySearch {
    pub property: Vec<PropertyMatch>,
    pub totalproperty: u64,
}

/// A catalogue property a new project can be linked to.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PropertyMatch {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub area: Option<String>,
    pub city: Option<String>,
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}
