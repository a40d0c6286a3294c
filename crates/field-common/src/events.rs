//! Viewport change notifications.
//!
//! The host map emits move-start / move-end / resize through a shared
//! [`ViewportEvents`] hub. Each animator holds a [`Subscription`] for the
//! events it cares about and drains it at the start of every frame.
//! Dropping the subscription unregisters the listener, so a stopped
//! animator never keeps receiving work for a viewport that went away.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewportEvent {
    /// Interaction began (pan or zoom gesture started).
    MoveStart,
    /// Interaction finished; the pixel-to-coordinate mapping changed.
    MoveEnd,
    /// The viewport's pixel size changed.
    Resize,
}

struct Listener {
    id: u64,
    kinds: Vec<ViewportEvent>,
    sender: Sender<ViewportEvent>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<Listener>,
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event hub owned by the host viewport.
#[derive(Clone, Default)]
pub struct ViewportEvents {
    inner: Arc<Mutex<Listeners>>,
}

impl ViewportEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the given event kinds.
    pub fn subscribe(&self, kinds: &[ViewportEvent]) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let mut listeners = lock(&self.inner);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push(Listener {
            id,
            kinds: kinds.to_vec(),
            sender,
        });
        trace!(listener = id, ?kinds, "viewport listener registered");

        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every listener subscribed to its kind.
    pub fn emit(&self, event: ViewportEvent) {
        let mut listeners = lock(&self.inner);
        listeners.entries.retain(|listener| {
            if !listener.kinds.contains(&event) {
                return true;
            }
            // A closed receiver means the subscription is gone.
            listener.sender.send(event).is_ok()
        });
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).entries.len()
    }
}

impl std::fmt::Debug for ViewportEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportEvents")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Scoped listener registration. Unregisters on drop.
pub struct Subscription {
    id: u64,
    receiver: Receiver<ViewportEvent>,
    hub: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Take every event received since the last drain, oldest first.
    pub fn drain(&self) -> Vec<ViewportEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            lock(&hub).entries.retain(|listener| listener.id != self.id);
            trace!(listener = self.id, "viewport listener removed");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_filtered_by_kind() {
        let hub = ViewportEvents::new();
        let sub = hub.subscribe(&[ViewportEvent::MoveEnd]);

        hub.emit(ViewportEvent::MoveStart);
        hub.emit(ViewportEvent::MoveEnd);
        hub.emit(ViewportEvent::Resize);

        assert_eq!(sub.drain(), vec![ViewportEvent::MoveEnd]);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_events_keep_emission_order() {
        let hub = ViewportEvents::new();
        let sub = hub.subscribe(&[ViewportEvent::MoveStart, ViewportEvent::MoveEnd]);

        hub.emit(ViewportEvent::MoveStart);
        hub.emit(ViewportEvent::MoveEnd);

        assert_eq!(
            sub.drain(),
            vec![ViewportEvent::MoveStart, ViewportEvent::MoveEnd]
        );
    }

    #[test]
    fn test_drop_unsubscribes() {
        let hub = ViewportEvents::new();
        let a = hub.subscribe(&[ViewportEvent::Resize]);
        let b = hub.subscribe(&[ViewportEvent::Resize]);
        assert_eq!(hub.listener_count(), 2);

        drop(a);
        assert_eq!(hub.listener_count(), 1);

        hub.emit(ViewportEvent::Resize);
        assert_eq!(b.drain(), vec![ViewportEvent::Resize]);
    }

    #[test]
    fn test_subscription_outliving_hub() {
        let hub = ViewportEvents::new();
        let sub = hub.subscribe(&[ViewportEvent::Resize]);
        drop(hub);
        assert!(sub.drain().is_empty());
        drop(sub);
    }
}
