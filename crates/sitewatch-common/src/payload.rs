//! Per-topic payload records.
//!
//! The producer owns these schemas, so every field is optional and unknown
//! fields are ignored. Fields are decoded one at a time: a null or a value of
//! the wrong type leaves that field empty and keeps the rest of the record.
//! Numbers sent for text fields are kept as text, and coordinates may arrive
//! as numeric strings.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::envelope::Topic;

/// Event time as sent by the producer: either epoch milliseconds or an
/// RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Timestamp::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// Decode one field, treating null or a mistyped value as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lead {
    #[serde(deserialize_with = "text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "text")]
    pub email: Option<String>,
    #[serde(deserialize_with = "text")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "text")]
    pub mobile: Option<String>,
    #[serde(deserialize_with = "text")]
    pub interest: Option<String>,
    #[serde(deserialize_with = "text")]
    pub project_domain: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<Timestamp>,
}

impl Lead {
    /// Phone number, falling back to the `mobile` field some producers use.
    pub fn contact_number(&self) -> Option<&str> {
        self.phone.as_deref().or(self.mobile.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Visit {
    #[serde(deserialize_with = "text")]
    pub ip: Option<String>,
    #[serde(deserialize_with = "text")]
    pub browser: Option<String>,
    #[serde(deserialize_with = "text")]
    pub os: Option<String>,
    #[serde(deserialize_with = "text")]
    pub device: Option<String>,
    #[serde(deserialize_with = "text")]
    pub project_domain: Option<String>,
    #[serde(deserialize_with = "text")]
    pub city: Option<String>,
    #[serde(deserialize_with = "text")]
    pub region: Option<String>,
    #[serde(deserialize_with = "text")]
    pub country: Option<String>,
    #[serde(deserialize_with = "text")]
    pub path: Option<String>,
    #[serde(deserialize_with = "text")]
    pub method: Option<String>,
    /// HTTP status; some producers send it as a string.
    pub status: Option<Value>,
    #[serde(deserialize_with = "text")]
    pub referer: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub suspicious: Option<bool>,
    #[serde(deserialize_with = "text")]
    pub asn_org: Option<String>,
    #[serde(deserialize_with = "number")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub longitude: Option<f64>,
    #[serde(deserialize_with = "text")]
    pub area: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<Timestamp>,
}

impl Visit {
    /// "city, region, country" with missing parts skipped.
    pub fn location(&self) -> String {
        [&self.city, &self.region, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuspiciousEvent {
    #[serde(deserialize_with = "text")]
    pub ip: Option<String>,
    #[serde(deserialize_with = "text")]
    pub reason: Option<String>,
    #[serde(deserialize_with = "text")]
    pub origin: Option<String>,
    #[serde(deserialize_with = "text")]
    pub referer: Option<String>,
    #[serde(deserialize_with = "text")]
    pub user_agent: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GithubStatus {
    #[serde(deserialize_with = "lenient")]
    pub stars: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub forks: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub watchers: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub last_updated: Option<Timestamp>,
    #[serde(deserialize_with = "text")]
    pub repo_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Deployment {
    #[serde(deserialize_with = "text")]
    pub project_domain: Option<String>,
    #[serde(deserialize_with = "text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub github: Option<GithubStatus>,
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<Timestamp>,
    #[serde(deserialize_with = "text")]
    pub message: Option<String>,
    #[serde(rename = "type", deserialize_with = "text")]
    pub kind: Option<String>,
}

impl Deployment {
    pub fn is_error(&self) -> bool {
        self.kind.as_deref() == Some("error")
    }
}

/// Payload keyed by topic.
#[derive(Debug, Clone, PartialEq)]
pub enum TopicPayload {
    Lead(Lead),
    Visit(Visit),
    SuspiciousEvent(SuspiciousEvent),
    Deployment(Deployment),
    Unknown(Value),
}

impl TopicPayload {
    pub fn decode(topic: &Topic, data: &Value) -> Result<Self, serde_json::Error> {
        Ok(match topic {
            Topic::Leads => TopicPayload::Lead(Lead::deserialize(data)?),
            Topic::Visits => TopicPayload::Visit(Visit::deserialize(data)?),
            Topic::SuspiciousEvents => {
                TopicPayload::SuspiciousEvent(SuspiciousEvent::deserialize(data)?)
            }
            Topic::Deployments => TopicPayload::Deployment(Deployment::deserialize(data)?),
            Topic::Unknown(_) => TopicPayload::Unknown(data.clone()),
        })
    }
}
