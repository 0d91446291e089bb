//! Entry point for the three boundary operations: query, mutation, subscription.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::errors::Result;
use crate::services::broker::{TopicBroker, NEW_NOTIFICATIONS};
use crate::services::session::Session;
use crate::state::notifications::{Notification, NotificationStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayStats {
    pub notifications: usize,
    pub subscribers: usize,
}

/// Owns the store/broker pair and exposes them to the transport layer.
pub struct Gateway {
    store: NotificationStore,
    broker: TopicBroker,
    /// Serializes append + publish so publish order equals append order.
    commit: Mutex<()>,
}

impl Gateway {
    pub fn new(store: NotificationStore, broker: TopicBroker) -> Self {
        Self {
            store,
            broker,
            commit: Mutex::new(()),
        }
    }

    /// Query `notifications`: the full history in insertion order.
    pub fn notifications(&self) -> Vec<Arc<Notification>> {
        self.store.list_all()
    }

    /// Mutation `pushNotification`: append, then fan out.
    ///
    /// The append is committed before publish is attempted; if the process
    /// dies in between, the notification is stored but never pushed. The
    /// result does not depend on how many subscribers were reached.
    pub fn push_notification(&self, label: impl Into<String>) -> Result<Arc<Notification>> {
        let _commit = self.commit.lock();
        let notification = self.store.append(label)?;
        let reached = self.broker.publish(NEW_NOTIFICATIONS, &notification);

        info!(label = %notification.label, subscribers = reached, "notification pushed");
        Ok(notification)
    }

    /// Subscription `newNotification`: a live session on the fixed topic.
    pub fn new_notification(&self) -> Session {
        self.broker.subscribe(NEW_NOTIFICATIONS)
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            notifications: self.store.len(),
            subscribers: self.broker.subscriber_count(NEW_NOTIFICATIONS),
        }
    }

    /// Close every open subscription. Queries and mutations keep working.
    pub fn shutdown(&self) {
        self.broker.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NotifyError;
    use crate::services::session::SessionState;

    fn gateway() -> Gateway {
        Gateway::new(NotificationStore::new(), TopicBroker::new())
    }

    fn labels(items: &[Arc<Notification>]) -> Vec<&str> {
        items.iter().map(|n| n.label.as_str()).collect()
    }

    #[tokio::test]
    async fn push_subscribe_query_end_to_end() {
        let gateway = gateway();
        let mut session = gateway.new_notification();

        let pushed = gateway.push_notification("hello").unwrap();
        assert_eq!(*pushed, Notification { label: "hello".into() });

        assert_eq!(session.next().await.unwrap().label, "hello");
        assert_eq!(labels(&gateway.notifications()), vec!["hello"]);
    }

    #[test]
    fn push_without_subscribers_still_succeeds() {
        let gateway = gateway();
        gateway.push_notification("lonely").unwrap();
        assert_eq!(gateway.stats(), GatewayStats { notifications: 1, subscribers: 0 });
    }

    #[tokio::test]
    async fn failed_push_changes_nothing() {
        let gateway = gateway();
        let mut session = gateway.new_notification();

        let err = gateway.push_notification("").unwrap_err();
        assert!(matches!(err, NotifyError::Validation(_)));

        assert!(gateway.notifications().is_empty());
        assert!(session.try_next().is_none());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn two_subscribers_see_the_same_order() {
        let gateway = gateway();
        let mut first = gateway.new_notification();
        let mut second = gateway.new_notification();

        for label in ["a", "b", "c"] {
            gateway.push_notification(label).unwrap();
        }

        for session in [&mut first, &mut second] {
            let mut seen = Vec::new();
            for _ in 0..3 {
                seen.push(session.next().await.unwrap().label.clone());
            }
            assert_eq!(seen, vec!["a", "b", "c"]);
        }
    }

    #[tokio::test]
    async fn disconnect_then_publish_reduces_live_count() {
        let gateway = gateway();
        let session = gateway.new_notification();
        let mut survivor = gateway.new_notification();
        assert_eq!(gateway.stats().subscribers, 2);

        session.canceller().cancel();
        drop(session);
        assert_eq!(gateway.stats().subscribers, 1);

        gateway.push_notification("after disconnect").unwrap();
        assert_eq!(survivor.next().await.unwrap().label, "after disconnect");
    }

    #[tokio::test]
    async fn concurrent_pushes_publish_in_append_order() {
        let gateway = Arc::new(gateway());
        let mut session = gateway.new_notification();

        let writers: Vec<_> = (0..4)
            .map(|t| {
                let gateway = gateway.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        gateway.push_notification(format!("{t}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let stored: Vec<String> = gateway
            .notifications()
            .iter()
            .map(|n| n.label.clone())
            .collect();
        let mut delivered = Vec::new();
        while let Some(n) = session.try_next() {
            delivered.push(n.label.clone());
        }
        assert_eq!(delivered, stored);
    }

    #[tokio::test]
    async fn shutdown_ends_subscriptions_but_not_mutations() {
        let gateway = gateway();
        let mut session = gateway.new_notification();

        gateway.shutdown();
        assert!(session.next().await.is_none());
        assert_eq!(session.state(), SessionState::ClosedByBroker);

        gateway.push_notification("still stored").unwrap();
        assert_eq!(gateway.stats().notifications, 1);
    }
}
