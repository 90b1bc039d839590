//! Durable key-value storage shared by sibling execution contexts.
//!
//! A [`SharedStorage`] models one origin's storage area. Every context
//! (browser tab, request session) opens its own [`StorageContext`] handle and
//! receives a [`ChangeFeed`] of writes made by *other* contexts. A context is
//! never notified of its own writes, and writes that leave a value unchanged
//! produce no event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::types::ContextId;

/// Key holding the serialized cart line items.
pub const CART_STORAGE_KEY: &str = "bad_marketplace_cart";

/// Write-only trigger key; its value is the millisecond timestamp of the last save.
pub const CART_UPDATED_KEY: &str = "cart_updated";

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A string key-value store.
pub trait DurableStore: Send {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

/// A change made to the shared store by another context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Receiver side of cross-context change notifications.
pub trait ExternalChangeListener {
    /// Called once per change made by another context.
    fn on_external_change(&mut self, key: &str);
}

/// Stream of [`StorageEvent`]s written by other contexts.
#[derive(Debug)]
pub struct ChangeFeed {
    receiver: UnboundedReceiver<StorageEvent>,
}

impl ChangeFeed {
    /// Take the next pending event without waiting.
    pub fn try_next(&mut self) -> Option<StorageEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next event. Returns `None` once the storage is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        self.receiver.recv().await
    }

    /// Deliver every pending event to `listener`, returning how many were delivered.
    pub fn dispatch_pending<L: ExternalChangeListener + ?Sized>(&mut self, listener: &mut L) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.try_next() {
            listener.on_external_change(&event.key);
            delivered += 1;
        }
        delivered
    }
}

struct Subscriber {
    context: ContextId,
    sender: UnboundedSender<StorageEvent>,
}

#[derive(Default)]
struct SharedInner {
    entries: HashMap<String, String>,
    subscribers: Vec<Subscriber>,
}

impl SharedInner {
    fn broadcast(&mut self, writer: ContextId, event: &StorageEvent) {
        // Closed feeds are pruned on the way.
        self.subscribers.retain(|subscriber| {
            subscriber.context == writer || subscriber.sender.send(event.clone()).is_ok()
        });
    }
}

/// One origin's storage area, shared by every context opened on it.
///
/// Cheaply cloneable; clones refer to the same entries.
#[derive(Clone, Default)]
pub struct SharedStorage {
    inner: Arc<Mutex<SharedInner>>,
}

impl SharedStorage {
    /// Create an empty storage area.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new context on this storage.
    ///
    /// The returned feed receives every change made through other contexts.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lock is poisoned.
    pub fn open_context(&self) -> Result<(StorageContext, ChangeFeed), StorageError> {
        let context = ContextId::new();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock()?.subscribers.push(Subscriber { context, sender });

        tracing::debug!(%context, "Storage context opened");
        Ok((
            StorageContext {
                id: context,
                storage: self.clone(),
            },
            ChangeFeed { receiver },
        ))
    }

    /// Number of contexts currently subscribed to changes.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().map(|inner| inner.subscribers.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SharedInner>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Poisoned)
    }

    fn write(
        &self,
        writer: ContextId,
        key: &str,
        value: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let old_value = match value {
            Some(value) => inner.entries.insert(key.to_string(), value.to_string()),
            None => inner.entries.remove(key),
        };

        if old_value.as_deref() == value {
            return Ok(());
        }

        let event = StorageEvent {
            key: key.to_string(),
            old_value,
            new_value: value.map(String::from),
        };
        inner.broadcast(writer, &event);
        Ok(())
    }
}

/// A single context's handle on a [`SharedStorage`].
pub struct StorageContext {
    id: ContextId,
    storage: SharedStorage,
}

impl StorageContext {
    /// This context's identity.
    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }
}

impl DurableStore for StorageContext {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.storage.lock()?.entries.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.write(self.id, key, Some(value))
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.storage.write(self.id, key, None)
    }
}

impl Drop for StorageContext {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.storage.lock() {
            inner
                .subscribers
                .retain(|subscriber| subscriber.context != self.id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct KeyLog(Vec<String>);

    impl ExternalChangeListener for KeyLog {
        fn on_external_change(&mut self, key: &str) {
            self.0.push(key.to_string());
        }
    }

    #[test]
    fn writes_are_visible_to_every_context() {
        let storage = SharedStorage::new();
        let (mut a, _feed_a) = storage.open_context().unwrap();
        let (b, _feed_b) = storage.open_context().unwrap();

        a.set_item("k", "v").unwrap();
        assert_eq!(b.get_item("k").unwrap().as_deref(), Some("v"));
        assert_eq!(a.get_item("missing").unwrap(), None);
    }

    #[test]
    fn writer_is_not_notified_but_siblings_are() {
        let storage = SharedStorage::new();
        let (mut a, mut feed_a) = storage.open_context().unwrap();
        let (_b, mut feed_b) = storage.open_context().unwrap();

        a.set_item("k", "v").unwrap();

        assert!(feed_a.try_next().is_none());
        assert_eq!(
            feed_b.try_next(),
            Some(StorageEvent {
                key: "k".to_string(),
                old_value: None,
                new_value: Some("v".to_string()),
            })
        );
        assert!(feed_b.try_next().is_none());
    }

    #[test]
    fn unchanged_value_produces_no_event() {
        let storage = SharedStorage::new();
        let (mut a, _feed_a) = storage.open_context().unwrap();
        let (_b, mut feed_b) = storage.open_context().unwrap();

        a.set_item("k", "same").unwrap();
        a.set_item("k", "same").unwrap();

        assert!(feed_b.try_next().is_some());
        assert!(feed_b.try_next().is_none());
    }

    #[test]
    fn remove_notifies_with_no_new_value() {
        let storage = SharedStorage::new();
        let (mut a, _feed_a) = storage.open_context().unwrap();
        let (_b, mut feed_b) = storage.open_context().unwrap();

        a.set_item("k", "v").unwrap();
        a.remove_item("k").unwrap();
        a.remove_item("k").unwrap();

        let events: Vec<_> = std::iter::from_fn(|| feed_b.try_next()).collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events.last().unwrap().new_value, None);
    }

    #[test]
    fn dispatch_pending_drains_feed_into_listener() {
        let storage = SharedStorage::new();
        let (mut a, _feed_a) = storage.open_context().unwrap();
        let (_b, mut feed_b) = storage.open_context().unwrap();

        a.set_item(CART_STORAGE_KEY, "[]").unwrap();
        a.set_item(CART_UPDATED_KEY, "1").unwrap();

        let mut log = KeyLog::default();
        assert_eq!(feed_b.dispatch_pending(&mut log), 2);
        assert_eq!(log.0, vec![CART_STORAGE_KEY, CART_UPDATED_KEY]);
        assert_eq!(feed_b.dispatch_pending(&mut log), 0);
    }

    #[test]
    fn dropped_contexts_and_feeds_are_unsubscribed() {
        let storage = SharedStorage::new();
        let (mut a, _feed_a) = storage.open_context().unwrap();
        let (b, _feed_b) = storage.open_context().unwrap();
        let (_c, feed_c) = storage.open_context().unwrap();
        assert_eq!(storage.subscriber_count(), 3);

        drop(b);
        assert_eq!(storage.subscriber_count(), 2);

        drop(feed_c);
        a.set_item("k", "v").unwrap();
        assert_eq!(storage.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn recv_waits_for_sibling_write() {
        let storage = SharedStorage::new();
        let (_a, mut feed_a) = storage.open_context().unwrap();
        let (mut b, _feed_b) = storage.open_context().unwrap();

        let writer = tokio::spawn(async move {
            b.set_item("k", "v").unwrap();
            b
        });

        let event = feed_a.recv().await.unwrap();
        assert_eq!(event.key, "k");
        drop(writer.await.unwrap());
    }
}
