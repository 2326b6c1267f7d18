//! Live deployment log for a single domain.
//!
//! Unlike the dashboard tables this history is never truncated: it lives for
//! as long as the operator keeps the log open.

use chrono::Local;
use console::style;
use serde::Deserialize;
use serde_json::Value;
use sitewatch_common::{Deployment, SharedBuffer, Topic, TopicBuffer};

use crate::feed::{Dispatcher, RouteId, domain_filter};

#[derive(Debug)]
pub struct DeploymentLog {
    domain: String,
    buffer: SharedBuffer<Value>,
    printed: usize,
}

impl DeploymentLog {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            buffer: TopicBuffer::unbounded().shared(),
            printed: 0,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Route deployments for this log's domain into its buffer.
    pub fn attach(&self, dispatcher: &mut Dispatcher) -> RouteId {
        dispatcher.attach_filtered_buffer(
            Topic::Deployments,
            domain_filter(self.domain.clone()),
            self.buffer.clone(),
        )
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries received since the last call, oldest first.
    pub fn take_new(&mut self) -> Vec<Deployment> {
        let Ok(buffer) = self.buffer.lock() else {
            return Vec::new();
        };
        let fresh = buffer.len().saturating_sub(self.printed);
        self.printed = buffer.len();
        buffer
            .iter()
            .take(fresh)
            .rev()
            .map(|v| Deployment::deserialize(v).unwrap_or_default())
            .collect()
    }
}

/// `[HH:MM:SS] message`, red for error entries.
pub fn format_line(entry: &Deployment) -> String {
    let time = entry
        .timestamp
        .as_ref()
        .and_then(|ts| ts.to_datetime())
        .map(|dt| dt.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    let message = entry
        .message
        .as_deref()
        .or(entry.status.as_deref())
        .unwrap_or("");
    let line = format!("[{}] {}", time, message);
    if entry.is_error() {
        style(line).red().to_string()
    } else {
        line
    }
}
