//! Typed error hierarchy for sitewatch.
//!
//! Three top-level enums cover the three subsystems:
//! - `FeedError` — live feed transport and envelope failures
//! - `ApiError` — REST backend calls
//! - `ConfigError` — loading and validating `sitewatch.toml`

use sitewatch_common::EnvelopeError;
use thiserror::Error;

/// Boxed transport-level cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from the live feed subsystem.
///
/// None of these are fatal to the process. Connection-level variants end the
/// current connection and lead to a reconnect; frame-level variants only drop
/// the offending frame.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Invalid feed endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: BoxError,
    },

    #[error("Timed out connecting to {endpoint}")]
    ConnectTimeout { endpoint: String },

    #[error("Feed stream error: {0}")]
    Stream(#[source] BoxError),

    #[error("Feed connection closed{}", close_suffix(.reason))]
    Closed { reason: Option<String> },

    #[error("Malformed envelope: {0}")]
    Malformed(#[from] EnvelopeError),

    #[error("Binary frame of {len} bytes is not UTF-8 text")]
    NonUtf8Frame { len: usize },

    #[error("Gave up reconnecting after {attempts} attempts")]
    GaveUp { attempts: u32 },
}

impl FeedError {
    /// Whether this error ends the current connection.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            FeedError::Connect { .. }
                | FeedError::ConnectTimeout { .. }
                | FeedError::Stream(_)
                | FeedError::Closed { .. }
        )
    }
}

fn close_suffix(reason: &Option<String>) -> String {
    match reason.as_deref() {
        Some(r) if !r.is_empty() => format!(": {}", r),
        _ => String::new(),
    }
}

/// Errors from the REST backend client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Property search URL is not configured")]
    PropertySearchUnavailable,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {key} '{value}': {reason}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        reason: String,
    },
}
