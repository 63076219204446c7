//! Source lifecycle notifications.
//!
//! Subscribers get their own channel; events are broadcast with a
//! non-blocking send and disconnected subscribers are pruned on the next
//! broadcast. Dropping a [`Subscription`] unsubscribes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    SourceCreated { name: String },
    SourceUpdated { name: String },
    SourceDestroyed { name: String },
    SceneChanged,
}

struct Subscriber {
    sender: Sender<SourceEvent>,
    id: u64,
}

type Subscribers = Arc<Mutex<Vec<Subscriber>>>;

fn lock(subscribers: &Subscribers) -> MutexGuard<'_, Vec<Subscriber>> {
    subscribers
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct EventBus {
    subscribers: Subscribers,
    next_subscriber_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.subscribers).push(Subscriber { sender, id });
        tracing::debug!(subscriber = id, "event subscriber added");
        Subscription {
            receiver,
            id,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    pub fn emit(&self, event: SourceEvent) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|subscriber| subscriber.sender.send(event.clone()).is_ok());
        tracing::trace!(?event, receivers = subscribers.len(), "event emitted");
    }
}

/// Receiving end of an [`EventBus`] subscription.
pub struct Subscription {
    receiver: Receiver<SourceEvent>,
    id: u64,
    subscribers: Subscribers,
}

impl Subscription {
    /// Next pending event, if any.
    pub fn try_recv(&self) -> Option<SourceEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// All events received so far.
    pub fn drain(&self) -> Vec<SourceEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|subscriber| subscriber.id != self.id);
        tracing::debug!(
            subscriber = self.id,
            remaining = subscribers.len(),
            "event subscriber dropped"
        );
    }
}
