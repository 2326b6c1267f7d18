//! In-memory transport for driving the subscriber from tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use serde_json::Value;
use tokio::time::Instant;
use url::Url;

use super::transport::{Frame, FrameStream, Transport};
use crate::errors::FeedError;

enum Step {
    Refuse,
    Accept(mpsc::UnboundedReceiver<Result<Frame, FeedError>>),
    Hang,
}

/// Transport whose connection attempts follow a queued script.
///
/// Attempts beyond the end of the script are refused.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a successful connection and return the server side of it.
    pub(crate) fn accept(&self) -> FrameSender {
        let (tx, rx) = mpsc::unbounded();
        self.steps.lock().unwrap().push_back(Step::Accept(rx));
        FrameSender { tx }
    }

    pub(crate) fn refuse(&self) {
        self.steps.lock().unwrap().push_back(Step::Refuse);
    }

    /// Queue a connection attempt that never completes.
    pub(crate) fn hang(&self) {
        self.steps.lock().unwrap().push_back(Step::Hang);
    }

    /// Times at which `connect` was called.
    pub(crate) fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, endpoint: &Url) -> Result<FrameStream, FeedError> {
        self.attempts.lock().unwrap().push(Instant::now());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Accept(rx)) => Ok(rx.boxed()),
            Some(Step::Hang) => futures::future::pending().await,
            Some(Step::Refuse) | None => Err(FeedError::Connect {
                endpoint: endpoint.to_string(),
                source: "connection refused".into(),
            }),
        }
    }
}

/// Server end of a scripted connection. Dropping it closes the stream.
///
/// Sends after the client has gone away are silently discarded.
pub(crate) struct FrameSender {
    tx: mpsc::UnboundedSender<Result<Frame, FeedError>>,
}

impl FrameSender {
    pub(crate) fn text(&self, frame: impl Into<String>) {
        let _ = self.tx.unbounded_send(Ok(Frame::Text(frame.into())));
    }

    pub(crate) fn envelope(&self, topic: &str, data: Value) {
        self.text(serde_json::json!({ "topic": topic, "data": data }).to_string());
    }

    pub(crate) fn error(&self, err: FeedError) {
        let _ = self.tx.unbounded_send(Err(err));
    }

    pub(crate) fn close(&self, reason: Option<&str>) {
        let _ = self
            .tx
            .unbounded_send(Ok(Frame::Close(reason.map(str::to_string))));
    }
}

/// Let spawned tasks run until they block.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
