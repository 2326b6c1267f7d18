//! Live feed: connection lifecycle, reconnect policy and topic routing.

pub mod dispatcher;
pub mod reconnect;
pub mod subscriber;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{DispatchReport, Dispatcher, RouteId, domain_filter};
pub use reconnect::{DEFAULT_RECONNECT_DELAY, ExponentialBackoff, FixedDelay, Limited, ReconnectPolicy};
pub use subscriber::{ConnectionState, Subscriber, SubscriptionHandle};
pub use transport::{CONNECT_TIMEOUT, Frame, FrameStream, Transport, WebSocketTransport};
