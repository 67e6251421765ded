use parking_lot::Mutex;
use std::sync::{
    Arc,
    Weak,
    atomic::{AtomicU64, Ordering},
};

use crate::ac::UserId;

type Callback = Arc<dyn Fn(Option<&UserId>) + Send + Sync>;

/// Holds the currently authenticated identity and notifies subscribers
/// synchronously whenever it changes.
///
/// Notifications are delivered one at a time; a callback may read
/// `IdentityWatch::current` but must not set or subscribe.
#[derive(Clone, Default)]
pub struct IdentityWatch(Arc<Inner>);

#[derive(Default)]
struct Inner {
    current: Mutex<Option<UserId>>,
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
    notifying: Mutex<()>,
}

/// Handle to a registered callback; dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    watch: Weak<Inner>,
}

impl IdentityWatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<UserId> {
        self.0.current.lock().clone()
    }

    /// Replace the current identity; subscribers are only notified if
    /// the identity actually changed.  Returns whether it changed.
    pub fn set(&self, identity: Option<UserId>) -> bool {
        let _guard = self.0.notifying.lock();
        {
            let mut current = self.0.current.lock();
            if *current == identity {
                return false;
            }
            *current = identity.clone();
        }
        log::debug!("identity changed to {identity:?}");
        let callbacks = self.0.subscribers.lock()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect::<Vec<_>>();
        for callback in callbacks {
            callback(identity.as_ref());
        }
        true
    }

    /// Register a callback.  It is invoked immediately with the current
    /// identity and afterwards on every change.
    pub fn subscribe(
        &self,
        callback: impl Fn(Option<&UserId>) + Send + Sync + 'static,
    ) -> Subscription {
        let _guard = self.0.notifying.lock();
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback = Arc::new(callback);
        self.0.subscribers.lock().push((id, callback.clone()));
        let current = self.current();
        callback(current.as_ref());
        Subscription {
            id,
            watch: Arc::downgrade(&self.0),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subscribers.lock().len()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.watch.upgrade() {
            inner.subscribers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}
