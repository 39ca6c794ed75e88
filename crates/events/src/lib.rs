//! Event bus primitives for library changes.
//!
//! Every successful store mutation publishes one [`LibraryEvent`] per
//! affected record. Subscribers use them to re-run derived computations.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

/// A change applied to the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LibraryEvent {
    BookAdded { book_id: Uuid },
    BookUpdated { book_id: Uuid },
    /// The book was removed together with `cascaded_logs` reading logs.
    BookDeleted { book_id: Uuid, cascaded_logs: usize },
    LogAdded { log_id: Uuid, book_id: Uuid },
    LogDeleted { log_id: Uuid, book_id: Uuid },
}

impl LibraryEvent {
    /// The book this event concerns.
    pub fn book_id(&self) -> Uuid {
        match self {
            LibraryEvent::BookAdded { book_id }
            | LibraryEvent::BookUpdated { book_id }
            | LibraryEvent::BookDeleted { book_id, .. }
            | LibraryEvent::LogAdded { book_id, .. }
            | LibraryEvent::LogDeleted { book_id, .. } => *book_id,
        }
    }
}

/// Broadcast bus for [`LibraryEvent`]s. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LibraryEvent>,
}

impl EventBus {
    /// Create a bus that buffers up to `capacity` events per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event, returning how many subscribers received it.
    pub fn publish(&self, event: LibraryEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(target: "lectern-events", ?event, "no subscribers for event");
                0
            }
        }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::default();
        let delivered = bus.publish(LibraryEvent::BookAdded {
            book_id: Uuid::new_v4(),
        });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let book_id = Uuid::new_v4();
        let log_id = Uuid::new_v4();

        bus.publish(LibraryEvent::BookAdded { book_id });
        bus.publish(LibraryEvent::LogAdded { log_id, book_id });

        assert_eq!(rx.recv().await.unwrap(), LibraryEvent::BookAdded { book_id });
        let second = rx.recv().await.unwrap();
        assert_eq!(second.book_id(), book_id);
        assert!(matches!(second, LibraryEvent::LogAdded { .. }));
    }

    #[test]
    fn clones_share_the_channel() {
        let bus = EventBus::default();
        let clone = bus.clone();
        let _rx = bus.subscribe();
        assert_eq!(clone.subscriber_count(), 1);
    }
}
