//! Topic broker: fan-out of published notifications to live subscriber channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::NotifyError;
use crate::services::session::Session;
use crate::state::notifications::Notification;

/// The one topic this service publishes on.
pub const NEW_NOTIFICATIONS: &str = "newNotifications";

/// Broker-assigned identifier of a subscriber channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry side of a subscription. The receiving half lives in the `Session`.
struct SubscriberChannel {
    sender: mpsc::UnboundedSender<Arc<Notification>>,
}

impl SubscriberChannel {
    /// Queue an event. Never blocks; fails only once the receiver is gone.
    fn deliver(&self, id: SubscriberId, event: &Arc<Notification>) -> Result<(), NotifyError> {
        self.sender
            .send(event.clone())
            .map_err(|_| NotifyError::ChannelDefunct(id.0))
    }
}

type Registry = HashMap<String, HashMap<SubscriberId, SubscriberChannel>>;

struct BrokerInner {
    topics: RwLock<Registry>,
    next_id: AtomicU64,
    shut_down: AtomicBool,
}

/// Maps topic names to their live subscriber channels.
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct TopicBroker {
    inner: Arc<BrokerInner>,
}

impl TopicBroker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                topics: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Register a new channel on `topic` and hand back its consuming session.
    ///
    /// Only events published after this call returns are delivered.
    pub fn subscribe(&self, topic: &str) -> Session {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();

        {
            let mut topics = self.inner.topics.write();
            // Checked under the lock so shutdown cannot miss a late registration.
            if !self.inner.shut_down.load(Ordering::Acquire) {
                topics
                    .entry(topic.to_string())
                    .or_default()
                    .insert(id, SubscriberChannel { sender });
            }
        }

        debug!(topic, subscriber = %id, "subscriber registered");
        Session::new(id, topic, receiver, self.clone())
    }

    /// Remove a channel. Returns whether it was still registered.
    pub fn unsubscribe(&self, topic: &str, id: SubscriberId) -> bool {
        let mut topics = self.inner.topics.write();
        let Some(channels) = topics.get_mut(topic) else {
            return false;
        };

        let existed = channels.remove(&id).is_some();
        if channels.is_empty() {
            topics.remove(topic);
        }
        drop(topics);

        if existed {
            debug!(topic, subscriber = %id, "subscriber removed");
        }
        existed
    }

    /// Deliver `event` to every channel on `topic`, returning how many were reached.
    ///
    /// Defunct channels are dropped from the registry. Publishing to a topic
    /// without subscribers is a no-op.
    pub fn publish(&self, topic: &str, event: &Arc<Notification>) -> usize {
        // One pass under the write lock: every channel sees publishes in the same order.
        let mut topics = self.inner.topics.write();
        let Some(channels) = topics.get_mut(topic) else {
            debug!(topic, subscribers = 0, "published");
            return 0;
        };

        let mut delivered = 0;
        channels.retain(|id, channel| match channel.deliver(*id, event) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(e) => {
                debug!(topic, error = %e, "dropping subscriber");
                false
            }
        });
        if channels.is_empty() {
            topics.remove(topic);
        }

        debug!(topic, subscribers = delivered, "published");
        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .read()
            .get(topic)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    #[cfg(test)]
    fn total_subscribers(&self) -> usize {
        self.inner.topics.read().values().map(HashMap::len).sum()
    }

    /// Drop every channel. Open sessions drain what is already queued and
    /// then end as closed by the broker; later subscriptions start closed.
    pub fn shutdown(&self) {
        let mut topics = self.inner.topics.write();
        self.inner.shut_down.store(true, Ordering::Release);
        let dropped: usize = topics.values().map(HashMap::len).sum();
        topics.clear();
        drop(topics);

        debug!(subscribers = dropped, "broker shut down");
    }

    #[cfg(test)]
    fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }
}

impl Default for TopicBroker {
    fn default() -> Self {
        Self::new()
    }
}
