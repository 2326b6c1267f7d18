//! Live feed subscriber: one streaming connection, restored after loss.
//!
//! ```text
//! DISCONNECTED -> CONNECTING (open transport)
//!   success                      -> OPEN
//!   failure / unexpected close   -> DISCONNECTED, wait policy delay, -> CONNECTING
//! stop(): any -> CLOSING -> DISCONNECTED (pending timer cancelled)
//! ```
//!
//! Each `start` begins a new *session* identified by a generation number.
//! The session task checks its generation under the delivery gate before
//! every state change and callback, and `stop` clears the session under the
//! same gate. Once `stop` returns, nothing from that session can reach the
//! callbacks, including a reconnect timer that was already running.
//!
//! A callback may stop its own subscriber. The gate is already held on that
//! thread, so the stop is recorded and carried out as soon as the callback
//! returns; no further callback from the session runs.

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use sitewatch_common::Envelope;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use super::reconnect::ReconnectPolicy;
use super::transport::{Frame, Transport};
use crate::errors::FeedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closing,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closing => write!(f, "closing"),
        }
    }
}

/// Returned by [`Subscriber::start`]; pass it back to [`Subscriber::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle {
    generation: u64,
}

impl SubscriptionHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

type EnvelopeCallback = Box<dyn FnMut(Envelope) + Send>;
type ErrorCallback = Box<dyn FnMut(&FeedError) + Send>;

struct Session {
    generation: u64,
    on_envelope: EnvelopeCallback,
    on_error: ErrorCallback,
}

thread_local! {
    /// Address of the `Shared` whose callback is running on this thread, or 0.
    static IN_CALLBACK: Cell<usize> = const { Cell::new(0) };
}

struct Shared {
    /// Delivery gate. Held while a callback runs and while `stop` clears the session.
    gate: Mutex<Option<Session>>,
    state: watch::Sender<ConnectionState>,
    /// Generation a callback asked to stop, or 0.
    stop_requested: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        // Callbacks run under catch_unwind, so a poisoned gate still holds a consistent session.
        self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current(gate: &mut Option<Session>, generation: u64) -> Option<&mut Session> {
        gate.as_mut().filter(|s| s.generation == generation)
    }

    /// Publish a state for `generation`. Returns false once the session is gone.
    fn set_state(&self, generation: u64, state: ConnectionState) -> bool {
        let mut gate = self.lock();
        if Self::current(&mut gate, generation).is_none() {
            return false;
        }
        self.state.send_replace(state);
        true
    }

    fn address(&self) -> usize {
        self as *const Shared as usize
    }

    /// Whether the calling thread is inside one of this subscriber's callbacks.
    fn in_callback(&self) -> bool {
        IN_CALLBACK.with(|current| current.get() == self.address())
    }

    /// Run a callback with the re-entry marker set for this thread.
    fn guarded(&self, callback: impl FnOnce()) -> bool {
        let outer = IN_CALLBACK.with(|current| current.replace(self.address()));
        let result = catch_unwind(AssertUnwindSafe(callback));
        IN_CALLBACK.with(|current| current.set(outer));
        result.is_ok()
    }

    /// Carry out a stop recorded by a callback. Returns false if the session ended.
    fn settle_stop_request(&self, mut gate: MutexGuard<'_, Option<Session>>, generation: u64) -> bool {
        let requested = self.stop_requested.swap(0, Ordering::SeqCst);
        if requested != generation {
            return true;
        }
        self.state.send_replace(ConnectionState::Closing);
        let ended = gate.take();
        self.state.send_replace(ConnectionState::Disconnected);
        drop(gate);
        drop(ended);
        info!(generation, "Live feed stopped from callback");
        false
    }

    fn deliver(&self, generation: u64, envelope: Envelope) -> bool {
        let mut gate = self.lock();
        let Some(session) = Self::current(&mut gate, generation) else {
            return false;
        };
        if !self.guarded(|| (session.on_envelope)(envelope)) {
            error!(generation, "Envelope callback panicked; envelope dropped");
        }
        self.settle_stop_request(gate, generation)
    }

    fn report(&self, generation: u64, err: &FeedError) -> bool {
        let mut gate = self.lock();
        let Some(session) = Self::current(&mut gate, generation) else {
            return false;
        };
        if !self.guarded(|| (session.on_error)(err)) {
            error!(generation, "Transport error callback panicked");
        }
        self.settle_stop_request(gate, generation)
    }

    /// End a session from inside its own task.
    fn finish(&self, generation: u64) {
        let mut gate = self.lock();
        if Self::current(&mut gate, generation).is_some() {
            let ended = gate.take();
            self.state.send_replace(ConnectionState::Disconnected);
            drop(gate);
            drop(ended);
        }
    }
}

/// Owns at most one live streaming connection and its reconnect loop.
///
/// Several subscribers can run side by side (e.g. the dashboard feed and a
/// per-domain deployment log); they share nothing. `start` must be called
/// from within a tokio runtime. Callbacks run on the runtime; they may call
/// `stop` on the subscriber invoking them but not `start`.
pub struct Subscriber {
    transport: Arc<dyn Transport>,
    policy: Arc<dyn ReconnectPolicy>,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
    generations: AtomicU64,
}

impl Subscriber {
    pub fn new(transport: Arc<dyn Transport>, policy: Arc<dyn ReconnectPolicy>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            policy,
            shared: Arc::new(Shared {
                gate: Mutex::new(None),
                state,
                stop_requested: AtomicU64::new(0),
            }),
            task: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Whether a session is active (connected, connecting or waiting to retry).
    pub fn is_running(&self) -> bool {
        if self.shared.in_callback() {
            let latest = self.generations.load(Ordering::SeqCst);
            return self.shared.stop_requested.load(Ordering::SeqCst) != latest;
        }
        self.shared.lock().is_some()
    }

    /// Begin connecting to `endpoint`. Returns immediately.
    ///
    /// A session that is already running is torn down first.
    pub fn start<F, E>(
        &self,
        endpoint: Url,
        on_envelope: F,
        on_transport_error: E,
    ) -> Result<SubscriptionHandle, FeedError>
    where
        F: FnMut(Envelope) + Send + 'static,
        E: FnMut(&FeedError) + Send + 'static,
    {
        validate_endpoint(&endpoint)?;
        self.shutdown();

        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut gate = self.shared.lock();
            *gate = Some(Session {
                generation,
                on_envelope: Box::new(on_envelope),
                on_error: Box::new(on_transport_error),
            });
            self.shared.state.send_replace(ConnectionState::Connecting);
        }

        info!(generation, endpoint = %endpoint, "Starting live feed");
        let task = tokio::spawn(run_session(
            self.shared.clone(),
            self.transport.clone(),
            self.policy.clone(),
            endpoint,
            generation,
        ));
        *self.task_slot() = Some(task);

        Ok(SubscriptionHandle { generation })
    }

    /// Close the session started with `handle` and cancel any pending retry.
    ///
    /// Safe to call repeatedly. A handle from an earlier session is ignored.
    pub fn stop(&self, handle: SubscriptionHandle) {
        if self.shared.in_callback() {
            // The gate is held further up this thread's stack.
            self.shared
                .stop_requested
                .store(handle.generation, Ordering::SeqCst);
            debug!(generation = handle.generation, "Stop requested from callback");
            return;
        }

        let mut gate = self.shared.lock();
        if Shared::current(&mut gate, handle.generation).is_none() {
            debug!(
                generation = handle.generation,
                "Stop ignored: session already ended"
            );
            return;
        }

        self.shared.state.send_replace(ConnectionState::Closing);
        let ended = gate.take();
        if let Some(task) = self.task_slot().take() {
            task.abort();
        }
        self.shared.state.send_replace(ConnectionState::Disconnected);
        drop(gate);
        drop(ended);

        info!(generation = handle.generation, "Live feed stopped");
    }

    /// Stop whichever session is active, if any.
    pub fn shutdown(&self) {
        if self.shared.in_callback() {
            let generation = self.generations.load(Ordering::SeqCst);
            self.stop(SubscriptionHandle { generation });
            return;
        }
        let generation = self.shared.lock().as_ref().map(|s| s.generation);
        if let Some(generation) = generation {
            self.stop(SubscriptionHandle { generation });
        }
    }

    fn task_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn validate_endpoint(endpoint: &Url) -> Result<(), FeedError> {
    let invalid = |reason: &str| FeedError::InvalidEndpoint {
        url: endpoint.to_string(),
        reason: reason.to_string(),
    };
    match endpoint.scheme() {
        "ws" | "wss" => {}
        _ => return Err(invalid("scheme must be ws or wss")),
    }
    if endpoint.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(())
}

/// Tracks producer sequence numbers within one connection.
#[derive(Debug, Default)]
struct SeqTracker {
    last: Option<u64>,
}

impl SeqTracker {
    /// Record `seq` and return how many envelopes were skipped before it.
    fn observe(&mut self, seq: Option<u64>) -> u64 {
        let Some(seq) = seq else {
            return 0;
        };
        let missed = match self.last {
            Some(last) if seq > last.saturating_add(1) => seq - last - 1,
            _ => 0,
        };
        self.last = Some(seq);
        missed
    }
}

async fn run_session(
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
    policy: Arc<dyn ReconnectPolicy>,
    endpoint: Url,
    generation: u64,
) {
    let mut failures: u32 = 0;

    loop {
        if !shared.set_state(generation, ConnectionState::Connecting) {
            return;
        }
        debug!(generation, endpoint = %endpoint, "Connecting");

        match transport.connect(&endpoint).await {
            Ok(mut frames) => {
                if !shared.set_state(generation, ConnectionState::Open) {
                    return;
                }
                info!(generation, endpoint = %endpoint, "Live feed connected");
                failures = 0;
                let mut seq = SeqTracker::default();

                let loss = loop {
                    match frames.next().await {
                        Some(Ok(Frame::Text(text))) => match Envelope::parse(&text) {
                            Ok(envelope) => {
                                let missed = seq.observe(envelope.seq);
                                if missed > 0 {
                                    warn!(generation, missed, "Gap in feed sequence numbers");
                                }
                                if !shared.deliver(generation, envelope) {
                                    return;
                                }
                            }
                            Err(e) => {
                                warn!(generation, error = %e, "Dropping malformed frame");
                                if !shared.report(generation, &FeedError::Malformed(e)) {
                                    return;
                                }
                            }
                        },
                        Some(Ok(Frame::Close(reason))) => break FeedError::Closed { reason },
                        Some(Err(e)) if e.is_connection_loss() => break e,
                        Some(Err(e)) => {
                            warn!(generation, error = %e, "Dropping unreadable frame");
                            if !shared.report(generation, &e) {
                                return;
                            }
                        }
                        None => break FeedError::Closed { reason: None },
                    }
                };

                warn!(generation, error = %loss, "Live feed connection lost");
                if !shared.report(generation, &loss) {
                    return;
                }
            }
            Err(e) => {
                warn!(generation, error = %e, "Live feed connect failed");
                if !shared.report(generation, &e) {
                    return;
                }
            }
        }

        if !shared.set_state(generation, ConnectionState::Disconnected) {
            return;
        }

        failures = failures.saturating_add(1);
        let Some(delay) = policy.next_delay(failures) else {
            let err = FeedError::GaveUp { attempts: failures };
            error!(generation, error = %err, "Live feed stopped retrying");
            shared.report(generation, &err);
            shared.finish(generation);
            return;
        };

        info!(
            generation,
            attempt = failures,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting after delay"
        );
        tokio::time::sleep(delay).await;
    }
}
