use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::errors::FeedError;

/// How long the WebSocket handshake may take before the attempt counts as failed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Inbound frame after control frames have been absorbed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Peer-initiated close, with the close reason when one was sent.
    Close(Option<String>),
}

/// Stream of frames for one connection. The connection is released when the
/// stream is dropped.
pub type FrameStream = BoxStream<'static, Result<Frame, FeedError>>;

/// Opens streaming connections for the subscriber.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, endpoint: &Url) -> Result<FrameStream, FeedError>;
}

/// `tokio-tungstenite` client transport.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    connect_timeout: Duration,
}

impl WebSocketTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, endpoint: &Url) -> Result<FrameStream, FeedError> {
        let handshake = tokio_tungstenite::connect_async(endpoint.as_str());
        let (ws_stream, _response) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| FeedError::ConnectTimeout {
                endpoint: endpoint.to_string(),
            })?
            .map_err(|e| FeedError::Connect {
                endpoint: endpoint.to_string(),
                source: Box::new(e),
            })?;

        // Pongs are queued by tungstenite itself and flushed on the next read.
        let frames = ws_stream.filter_map(|msg| async move { classify(msg) });
        Ok(frames.boxed())
    }
}

fn classify(
    msg: Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<Result<Frame, FeedError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(Frame::Text(text))),
        Ok(Message::Binary(bytes)) => {
            let len = bytes.len();
            Some(
                String::from_utf8(bytes)
                    .map(Frame::Text)
                    .map_err(|_| FeedError::NonUtf8Frame { len }),
            )
        }
        Ok(Message::Close(close)) => Some(Ok(Frame::Close(
            close.map(|frame| frame.reason.to_string()),
        ))),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
        Err(e) => Some(Err(FeedError::Stream(Box::new(e)))),
    }
}
