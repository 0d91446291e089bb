use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::errors::{NotifyError, Result};

/// A single notification. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub label: String,
}

/// Append-only, ordered in-memory log of notifications.
///
/// Cloning the store clones the handle, not the log.
#[derive(Debug, Clone, Default)]
pub struct NotificationStore {
    log: Arc<RwLock<Vec<Arc<Notification>>>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a notification and return the stored value.
    ///
    /// Empty labels are rejected before the log is touched.
    pub fn append(&self, label: impl Into<String>) -> Result<Arc<Notification>> {
        let label = label.into();
        if label.is_empty() {
            return Err(NotifyError::validation("label must not be empty"));
        }

        let notification = Arc::new(Notification { label });
        self.log.write().push(notification.clone());
        Ok(notification)
    }

    /// Snapshot of the full log in insertion order.
    pub fn list_all(&self) -> Vec<Arc<Notification>> {
        self.log.read().clone()
    }

    pub fn len(&self) -> usize {
        self.log.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(store: &NotificationStore) -> Vec<String> {
        store.list_all().iter().map(|n| n.label.clone()).collect()
    }

    #[test]
    fn list_all_preserves_insertion_order() {
        let store = NotificationStore::new();
        for label in ["first", "second", "third"] {
            store.append(label).unwrap();
        }
        assert_eq!(labels(&store), vec!["first", "second", "third"]);
    }

    #[test]
    fn append_returns_stored_value() {
        let store = NotificationStore::new();
        let stored = store.append("hello").unwrap();
        assert_eq!(stored.label, "hello");
        assert!(Arc::ptr_eq(&stored, &store.list_all()[0]));
    }

    #[test]
    fn empty_label_is_rejected_without_growth() {
        let store = NotificationStore::new();
        store.append("kept").unwrap();

        let err = store.append("").unwrap_err();
        assert!(matches!(err, NotifyError::Validation(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicates_are_kept() {
        let store = NotificationStore::new();
        store.append("same").unwrap();
        store.append("same").unwrap();
        assert_eq!(labels(&store), vec!["same", "same"]);
    }

    #[test]
    fn snapshot_is_not_affected_by_later_appends() {
        let store = NotificationStore::new();
        store.append("a").unwrap();
        let snapshot = store.list_all();
        store.append("b").unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn concurrent_appends_keep_a_total_order() {
        let store = NotificationStore::new();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.append(format!("{t}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let all = labels(&store);
        assert_eq!(all.len(), 400);
        // Each writer's own entries stay in the order it appended them.
        for t in 0..4 {
            let prefix = format!("{t}-");
            let mine: Vec<_> = all.iter().filter(|l| l.starts_with(&prefix)).collect();
            let expected: Vec<_> = (0..100).map(|i| format!("{t}-{i}")).collect();
            assert_eq!(mine, expected.iter().collect::<Vec<_>>());
        }
    }
}
