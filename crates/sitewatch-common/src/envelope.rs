use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::payload::TopicPayload;

/// Logical channel of the feed.
///
/// Producers may introduce new topics at any time, so anything outside the
/// known set is kept as [`Topic::Unknown`] instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Topic {
    Leads,
    Visits,
    SuspiciousEvents,
    Deployments,
    Unknown(String),
}

impl Topic {
    /// Topics that have a display surface.
    pub const KNOWN: [Topic; 4] = [
        Topic::Leads,
        Topic::Visits,
        Topic::SuspiciousEvents,
        Topic::Deployments,
    ];

    pub fn parse(s: &str) -> Self {
        match s {
            "leads" => Topic::Leads,
            "visits" => Topic::Visits,
            "suspicious-events" => Topic::SuspiciousEvents,
            "deployments" => Topic::Deployments,
            other => Topic::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Topic::Leads => "leads",
            Topic::Visits => "visits",
            Topic::SuspiciousEvents => "suspicious-events",
            Topic::Deployments => "deployments",
            Topic::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Topic::Unknown(_))
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Topic::parse(s))
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Topic::parse(&s)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.as_str().to_string()
    }
}

/// Reasons a frame could not be turned into an [`Envelope`].
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("frame is not a JSON object")]
    FrameNotObject,

    #[error("envelope is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("envelope field `topic` must be a string")]
    TopicNotString,

    #[error("payload for topic '{topic}' is not a JSON object")]
    DataNotObject { topic: String },

    #[error("envelope field `seq` must be a non-negative integer")]
    InvalidSeq,
}

/// One unit of the live feed: a topic label plus an opaque object payload.
///
/// `data` is guaranteed to be a JSON object. Its shape is owned by the
/// producer and is only interpreted when a surface calls [`Envelope::payload`].
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub topic: Topic,
    pub data: Value,
    /// Producer sequence number, when the producer sends one.
    pub seq: Option<u64>,
}

impl Envelope {
    pub fn new(topic: Topic, data: Value) -> Result<Self, EnvelopeError> {
        if !data.is_object() {
            return Err(EnvelopeError::DataNotObject {
                topic: topic.as_str().to_string(),
            });
        }
        Ok(Self {
            topic,
            data,
            seq: None,
        })
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    /// Parse a text frame of the form `{"topic": "...", "data": {...}}`.
    ///
    /// Extra top-level fields other than `seq` are ignored.
    pub fn parse(frame: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(frame).map_err(EnvelopeError::InvalidJson)?;
        let Value::Object(mut fields) = value else {
            return Err(EnvelopeError::FrameNotObject);
        };

        let topic = match fields.remove("topic") {
            Some(Value::String(name)) => Topic::parse(&name),
            Some(_) => return Err(EnvelopeError::TopicNotString),
            None => return Err(EnvelopeError::MissingField("topic")),
        };

        let data = fields
            .remove("data")
            .ok_or(EnvelopeError::MissingField("data"))?;

        let seq = match fields.remove("seq") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_u64().ok_or(EnvelopeError::InvalidSeq)?),
        };

        let mut envelope = Self::new(topic, data)?;
        envelope.seq = seq;
        Ok(envelope)
    }

    /// Serialize back into the wire form.
    pub fn to_frame(&self) -> String {
        let mut fields = Map::new();
        fields.insert("topic".into(), Value::String(self.topic.as_str().to_string()));
        fields.insert("data".into(), self.data.clone());
        if let Some(seq) = self.seq {
            fields.insert("seq".into(), Value::from(seq));
        }
        Value::Object(fields).to_string()
    }

    /// `data.projectDomain`, when present.
    pub fn project_domain(&self) -> Option<&str> {
        self.data.get("projectDomain").and_then(Value::as_str)
    }

    /// Decode the payload into the record type for this topic.
    pub fn payload(&self) -> Result<TopicPayload, serde_json::Error> {
        TopicPayload::decode(&self.topic, &self.data)
    }
}
