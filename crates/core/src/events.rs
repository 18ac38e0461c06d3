//! In-process change notifications.
//!
//! Each repository owns its own [`EventBus`]; nothing is dispatched
//! globally. Delivery is synchronous: by the time the call that triggered an
//! event returns, every subscriber has seen it.

use std::sync::{mpsc, Arc};

use parking_lot::Mutex;
use uuid::Uuid;

/// Change published by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SquadEvent {
    /// A squad was added to or deleted from the list.
    SquadListChanged,
    /// A stored squad was modified.
    SquadUpdated {
        /// Affected squad.
        squad: Uuid,
    },
    /// A member joined a squad.
    MemberAdded {
        /// Affected squad.
        squad: Uuid,
        /// New member.
        member: Uuid,
    },
    /// A member left a squad.
    MemberRemoved {
        /// Affected squad.
        squad: Uuid,
        /// Removed member.
        member: Uuid,
    },
    /// The total point cost of a squad changed.
    CostChanged {
        /// Affected squad.
        squad: Uuid,
        /// Cost before the change.
        previous: i32,
        /// Cost after the change.
        current: i32,
    },
}

/// Token returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Callback = Arc<dyn Fn(&SquadEvent) + Send + Sync>;

/// Observer registry with synchronous delivery.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<Subscribers>,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    callbacks: Vec<(Subscription, Callback)>,
    channels: Vec<mpsc::Sender<SquadEvent>>,
}

impl EventBus {
    /// Create a bus without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked for every published event.
    pub fn subscribe(&self, callback: impl Fn(&SquadEvent) + Send + Sync + 'static) -> Subscription {
        let mut inner = self.inner.lock();
        let token = Subscription(inner.next_id);
        inner.next_id += 1;
        inner.callbacks.push((token, Arc::new(callback)));
        token
    }

    /// Remove a callback; returns whether it was registered.
    pub fn unsubscribe(&self, token: Subscription) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.callbacks.len();
        inner.callbacks.retain(|(existing, _)| *existing != token);
        inner.callbacks.len() != before
    }

    /// Receive events through a channel. The sender side is dropped once the
    /// receiver goes away.
    pub fn subscribe_channel(&self) -> mpsc::Receiver<SquadEvent> {
        let (sender, receiver) = mpsc::channel();
        self.inner.lock().channels.push(sender);
        receiver
    }

    /// Deliver `event` to every subscriber before returning.
    pub fn publish(&self, event: &SquadEvent) {
        // Callbacks run without the lock held so they may (un)subscribe.
        let callbacks: Vec<Callback> = {
            let mut inner = self.inner.lock();
            inner
                .channels
                .retain(|sender| sender.send(event.clone()).is_ok());
            inner
                .callbacks
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect()
        };
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.callbacks.len() + inner.channels.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("EventBus")
            .field("callbacks", &inner.callbacks.len())
            .field("channels", &inner.channels.len())
            .finish()
    }
}
