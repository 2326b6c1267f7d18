//! Topic routing from the subscriber to display surfaces.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde_json::Value;
use sitewatch_common::{Envelope, SharedBuffer, Topic};
use tracing::{debug, error, warn};

/// Identifies a route so a surface can remove it when it unmounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(u64);

/// What happened to one envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Callbacks that ran and returned `Ok`.
    pub delivered: usize,
    /// Routes whose filter rejected the envelope.
    pub filtered: usize,
    /// Callbacks that returned `Err` or panicked.
    pub failed: usize,
    /// Topic outside the known set; handed to the unknown handler.
    pub unknown: bool,
}

type Filter = Box<dyn Fn(&Envelope) -> bool + Send>;
type Callback = Box<dyn FnMut(&Envelope) -> anyhow::Result<()> + Send>;
type UnknownHandler = Box<dyn FnMut(&Envelope) + Send>;

struct Route {
    id: RouteId,
    name: String,
    filter: Option<Filter>,
    callback: Callback,
}

/// Routes envelopes by topic to registered callbacks.
///
/// Callbacks for a topic run in registration order, once per envelope. A
/// failing callback is logged and counted; the rest still run.
pub struct Dispatcher {
    routes: HashMap<Topic, Vec<Route>>,
    next_id: u64,
    on_unknown: UnknownHandler,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            next_id: 0,
            on_unknown: Box::new(|envelope: &Envelope| {
                warn!(topic = %envelope.topic, "Unknown feed topic; dropping envelope");
            }),
        }
    }

    pub fn subscribe<F>(&mut self, topic: Topic, name: impl Into<String>, callback: F) -> RouteId
    where
        F: FnMut(&Envelope) -> anyhow::Result<()> + Send + 'static,
    {
        self.add_route(topic, name.into(), None, Box::new(callback))
    }

    /// Like [`subscribe`](Self::subscribe), but only envelopes accepted by
    /// `filter` reach the callback.
    pub fn subscribe_filtered<P, F>(
        &mut self,
        topic: Topic,
        name: impl Into<String>,
        filter: P,
        callback: F,
    ) -> RouteId
    where
        P: Fn(&Envelope) -> bool + Send + 'static,
        F: FnMut(&Envelope) -> anyhow::Result<()> + Send + 'static,
    {
        self.add_route(topic, name.into(), Some(Box::new(filter)), Box::new(callback))
    }

    /// Remove a route. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: RouteId) -> bool {
        for routes in self.routes.values_mut() {
            if let Some(pos) = routes.iter().position(|r| r.id == id) {
                let route = routes.remove(pos);
                debug!(route = %route.name, "Route removed");
                return true;
            }
        }
        false
    }

    /// Replace the handler for topics outside the known set.
    pub fn on_unknown<F>(&mut self, handler: F)
    where
        F: FnMut(&Envelope) + Send + 'static,
    {
        self.on_unknown = Box::new(handler);
    }

    /// Push every payload for `topic` into `buffer`.
    pub fn attach_buffer(&mut self, topic: Topic, buffer: SharedBuffer<Value>) -> RouteId {
        let name = format!("{}-buffer", topic);
        self.subscribe(topic, name, buffer_writer(buffer))
    }

    /// Push payloads accepted by `filter` into `buffer`.
    pub fn attach_filtered_buffer<P>(
        &mut self,
        topic: Topic,
        filter: P,
        buffer: SharedBuffer<Value>,
    ) -> RouteId
    where
        P: Fn(&Envelope) -> bool + Send + 'static,
    {
        let name = format!("{}-filtered-buffer", topic);
        self.subscribe_filtered(topic, name, filter, buffer_writer(buffer))
    }

    pub fn route_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn dispatch(&mut self, envelope: &Envelope) -> DispatchReport {
        let mut report = DispatchReport::default();

        if !envelope.topic.is_known() {
            report.unknown = true;
            (self.on_unknown)(envelope);
            return report;
        }

        let Some(routes) = self.routes.get_mut(&envelope.topic) else {
            return report;
        };

        for route in routes.iter_mut() {
            if let Some(filter) = &route.filter {
                if !filter(envelope) {
                    report.filtered += 1;
                    continue;
                }
            }

            match catch_unwind(AssertUnwindSafe(|| (route.callback)(envelope))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(route = %route.name, topic = %envelope.topic, error = %e, "Feed callback failed");
                }
                Err(_) => {
                    report.failed += 1;
                    error!(route = %route.name, topic = %envelope.topic, "Feed callback panicked");
                }
            }
        }

        report
    }

    /// Turn the dispatcher into an `on_envelope` callback for the subscriber.
    pub fn into_handler(mut self) -> impl FnMut(Envelope) + Send + 'static {
        move |envelope| {
            self.dispatch(&envelope);
        }
    }

    fn add_route(
        &mut self,
        topic: Topic,
        name: String,
        filter: Option<Filter>,
        callback: Callback,
    ) -> RouteId {
        self.next_id += 1;
        let id = RouteId(self.next_id);
        debug!(route = %name, topic = %topic, "Route added");
        self.routes.entry(topic).or_default().push(Route {
            id,
            name,
            filter,
            callback,
        });
        id
    }
}

fn buffer_writer(
    buffer: SharedBuffer<Value>,
) -> impl FnMut(&Envelope) -> anyhow::Result<()> + Send + 'static {
    move |envelope| {
        buffer
            .lock()
            .map_err(|_| anyhow::anyhow!("buffer lock poisoned"))?
            .push(envelope.data.clone());
        Ok(())
    }
}

/// Accepts envelopes whose `data.projectDomain` equals `domain`.
pub fn domain_filter(domain: impl Into<String>) -> impl Fn(&Envelope) -> bool + Send + 'static {
    let domain = domain.into();
    move |envelope| envelope.project_domain() == Some(domain.as_str())
}
