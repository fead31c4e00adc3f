//! Event Channel for broadcasting pipeline events to collaborators.
//!
//! A topic-keyed pub/sub bus. Subscribers register callbacks under a topic
//! name; `publish` delivers synchronously, in subscription order, within the
//! calling context. A failing handler is logged and never blocks delivery to
//! the handlers after it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::ports::outbound::ClientEvent;

type Handler = Box<dyn FnMut(&ClientEvent) -> anyhow::Result<()> + Send>;

struct HandlerEntry {
    id: u64,
    once: bool,
    /// Set the moment a once-handler is claimed for invocation, so a nested
    /// publish in the same round cannot fire it twice.
    fired: AtomicBool,
    handler: Mutex<Handler>,
}

#[derive(Default)]
struct Registry {
    topics: HashMap<String, Vec<Arc<HandlerEntry>>>,
}

/// Topic-keyed event bus.
///
/// Delivery is synchronous and in subscription order within one topic; no
/// ordering exists across topics. The registry may be mutated (subscribe,
/// unsubscribe, clear) from inside a handler without disturbing the dispatch
/// already in progress: `publish` iterates a snapshot, so handlers added
/// during a round are first invoked on the next publish.
#[derive(Clone, Default)]
pub struct EventChannel {
    next_id: Arc<AtomicU64>,
    registry: Arc<Mutex<Registry>>,
}

/// Handle returned by `subscribe`; detaches the handler when consumed.
#[must_use = "dropping the subscription without calling unsubscribe() leaves the handler attached"]
pub struct Subscription {
    channel: EventChannel,
    topic: String,
    id: u64,
}

impl Subscription {
    /// Remove the handler from the registry.
    pub fn unsubscribe(self) {
        let mut registry = self.channel.lock_registry();
        if let Some(entries) = registry.topics.get_mut(&self.topic) {
            entries.retain(|e| e.id != self.id);
        }
    }
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(
        &self,
        topic: &str,
        once: bool,
        handler: impl FnMut(&ClientEvent) -> anyhow::Result<()> + Send + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(HandlerEntry {
            id,
            once,
            fired: AtomicBool::new(false),
            handler: Mutex::new(Box::new(handler)),
        });
        self.lock_registry()
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(entry);
        Subscription {
            channel: self.clone(),
            topic: topic.to_string(),
            id,
        }
    }

    /// Subscribe a handler to a topic.
    ///
    /// The handler runs for every event published under the topic until the
    /// returned subscription is consumed.
    pub fn subscribe(
        &self,
        topic: &str,
        handler: impl FnMut(&ClientEvent) -> anyhow::Result<()> + Send + 'static,
    ) -> Subscription {
        self.insert(topic, false, handler)
    }

    /// Subscribe a handler that runs at most once.
    ///
    /// Removal is atomic with invocation: re-subscribing from inside the
    /// handler does not make it fire again in the same publish round.
    pub fn subscribe_once(
        &self,
        topic: &str,
        handler: impl FnMut(&ClientEvent) -> anyhow::Result<()> + Send + 'static,
    ) -> Subscription {
        self.insert(topic, true, handler)
    }

    /// Publish an event to every handler subscribed to its topic.
    ///
    /// Returns once every handler has run. Handler failures are logged and
    /// do not propagate to the caller or skip later handlers.
    pub fn publish(&self, event: &ClientEvent) {
        let topic = event.topic();
        let snapshot: Vec<Arc<HandlerEntry>> = self
            .lock_registry()
            .topics
            .get(topic)
            .map(|entries| entries.to_vec())
            .unwrap_or_default();

        let mut fired_once = false;
        for entry in &snapshot {
            if entry.once && entry.fired.swap(true, Ordering::SeqCst) {
                continue;
            }
            if entry.once {
                fired_once = true;
            }
            // A handler still running from an outer publish of this same
            // topic is skipped rather than re-entered.
            match entry.handler.try_lock() {
                Ok(mut handler) => {
                    if let Err(error) = handler(event) {
                        tracing::warn!(topic, %error, "event handler failed");
                    }
                }
                Err(_) => {
                    tracing::debug!(topic, "skipping re-entrant event handler");
                }
            }
        }

        if fired_once {
            let mut registry = self.lock_registry();
            if let Some(entries) = registry.topics.get_mut(topic) {
                entries.retain(|e| !(e.once && e.fired.load(Ordering::SeqCst)));
            }
        }
    }

    /// Drop all handlers for a topic, or for every topic when `None`.
    pub fn clear(&self, topic: Option<&str>) {
        let mut registry = self.lock_registry();
        match topic {
            Some(topic) => {
                registry.topics.remove(topic);
            }
            None => registry.topics.clear(),
        }
    }

    /// Whether any handler is currently subscribed to the topic.
    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.subscriber_count(topic) > 0
    }

    /// Number of handlers currently subscribed to the topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.lock_registry()
            .topics
            .get(topic)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }
}
