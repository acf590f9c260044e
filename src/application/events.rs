//! Fan-out of engine events to subscribers.
//!
//! Each subscriber has a bounded buffer. When a subscriber falls behind,
//! its oldest undelivered events are dropped and it resumes from the
//! oldest retained one; publishing never waits on a subscriber.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::domain::Event;

/// Publishing side, held by the sync engine.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<Event>,
}

impl EventPublisher {
    /// Create a publisher with `buffer` events of backlog per subscriber.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self { sender }
    }

    /// Deliver `event` to every current subscriber.
    pub fn publish(&self, event: Event) {
        tracing::trace!(?event, subscribers = self.sender.receiver_count(), "Publishing event");
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    /// Start a new subscription. It sees events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
            dropped: 0,
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// One subscriber's view of the event stream.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: broadcast::Receiver<Event>,
    dropped: u64,
}

impl EventSubscription {
    /// Wait for the next event. `None` once the engine has shut down.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    self.dropped += skipped;
                    tracing::warn!(skipped, "Subscriber lagged, oldest events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take an already-buffered event without waiting.
    pub fn try_next(&mut self) -> Option<Event> {
        use broadcast::error::TryRecvError;

        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => self.dropped += skipped,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Number of events this subscriber missed because it fell behind.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    #[tokio::test]
    async fn test_delivers_in_publish_order() {
        let publisher = EventPublisher::new(8);
        let mut sub = publisher.subscribe();

        publisher.publish(Event::TagsHistoryUpdated);
        publisher.publish(Event::CommandFailed(ErrorKind::NotActive));

        assert_eq!(sub.next().await, Some(Event::TagsHistoryUpdated));
        assert_eq!(
            sub.next().await,
            Some(Event::CommandFailed(ErrorKind::NotActive))
        );
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_every_event() {
        let publisher = EventPublisher::new(8);
        let mut first = publisher.subscribe();
        let mut second = publisher.subscribe();

        publisher.publish(Event::Recovered);

        assert_eq!(first.next().await, Some(Event::Recovered));
        assert_eq!(second.next().await, Some(Event::Recovered));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let publisher = EventPublisher::new(4);
        publisher.publish(Event::TagsHistoryUpdated);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn test_slow_subscriber_drops_oldest() {
        let publisher = EventPublisher::new(2);
        let mut slow = publisher.subscribe();

        publisher.publish(Event::CommandFailed(ErrorKind::NotActive));
        publisher.publish(Event::CommandFailed(ErrorKind::AlreadyActive));
        publisher.publish(Event::TagsHistoryUpdated);

        assert_eq!(
            slow.try_next(),
            Some(Event::CommandFailed(ErrorKind::AlreadyActive))
        );
        assert_eq!(slow.try_next(), Some(Event::TagsHistoryUpdated));
        assert_eq!(slow.try_next(), None);
        assert_eq!(slow.dropped(), 1);
    }

    #[tokio::test]
    async fn test_closed_when_publisher_dropped() {
        let publisher = EventPublisher::new(2);
        let mut sub = publisher.subscribe();
        drop(publisher);
        assert_eq!(sub.next().await, None);
    }

    #[test]
    fn test_late_subscriber_sees_only_new_events() {
        let publisher = EventPublisher::new(4);
        publisher.publish(Event::TagsHistoryUpdated);
        let mut late = publisher.subscribe();
        assert_eq!(late.try_next(), None);
    }
}
