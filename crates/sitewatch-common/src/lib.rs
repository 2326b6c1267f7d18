//! Shared types for the sitewatch live feed.
//!
//! - [`envelope`]: the `{topic, data}` wire unit and its parser
//! - [`payload`]: per-topic payload records, decoded on demand by display surfaces
//! - [`buffer`]: bounded newest-first history kept per display surface

pub mod buffer;
pub mod envelope;
pub mod payload;

pub use buffer::{DEFAULT_HISTORY, SharedBuffer, TopicBuffer};
pub use envelope::{Envelope, EnvelopeError, Topic};
pub use payload::{Deployment, GithubStatus, Lead, SuspiciousEvent, Timestamp, TopicPayload, Visit};
