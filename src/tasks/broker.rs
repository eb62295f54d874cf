//! Per-session fan-out of progress events to live subscribers.
//!
//! The broker keeps a set of unbounded channels per session and delivers each
//! published event to every channel registered at publish time. There is no
//! replay: a subscriber connecting mid-run sees only what is published after
//! it subscribed, prefixed by one synthetic `connected` event.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::ProgressEvent;

struct SubscriberEntry {
    id: Uuid,
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

#[derive(Default)]
pub struct EventBroker {
    subscribers: DashMap<Uuid, Vec<SubscriberEntry>>,
}

impl EventBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a new subscriber for a session. The returned subscription
    /// already holds a `connected` event and unsubscribes itself on drop, so
    /// an abandoned consumer never leaks its channel.
    pub fn subscribe(self: &Arc<Self>, session_id: Uuid) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let _ = tx.send(ProgressEvent::connected(session_id));
        self.subscribers
            .entry(session_id)
            .or_default()
            .push(SubscriberEntry { id, tx });
        Subscription {
            session_id,
            id,
            rx,
            broker: self.clone(),
        }
    }

    /// Remove one subscriber channel. Safe to call for a channel that is
    /// already gone.
    pub fn unsubscribe(&self, session_id: Uuid, subscriber_id: Uuid) {
        if let Some(mut entry) = self.subscribers.get_mut(&session_id) {
            entry.retain(|subscriber| subscriber.id != subscriber_id);
        }
        self.subscribers
            .remove_if(&session_id, |_, subscribers| subscribers.is_empty());
    }

    /// Deliver an event to every subscriber currently registered for the
    /// session. Channels whose receiver has gone away are pruned.
    pub fn publish(&self, session_id: Uuid, event: &ProgressEvent) {
        if let Some(mut entry) = self.subscribers.get_mut(&session_id) {
            entry.retain(|subscriber| subscriber.tx.send(event.clone()).is_ok());
        }
    }

    /// Number of live subscribers for a session.
    pub fn subscriber_count(&self, session_id: Uuid) -> usize {
        self.subscribers
            .get(&session_id)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}

/// One subscriber's end of a session's event feed.
pub struct Subscription {
    session_id: Uuid,
    id: Uuid,
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
    broker: Arc<EventBroker>,
}

impl Subscription {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Wait for the next event. `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broker.unsubscribe(self.session_id, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_greets_with_connected() {
        let broker = EventBroker::new();
        let session_id = Uuid::new_v4();
        let mut sub = broker.subscribe(session_id);

        match sub.recv().await {
            Some(ProgressEvent::Connected { session_id: sid, .. }) => {
                assert_eq!(sid, session_id)
            }
            other => panic!("expected connected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn publish_fans_out_to_all_current_subscribers() {
        let broker = EventBroker::new();
        let session_id = Uuid::new_v4();
        let mut first = broker.subscribe(session_id);
        let mut second = broker.subscribe(session_id);

        broker.publish(session_id, &ProgressEvent::PageStart { page_index: 0 });

        // Late subscriber misses the event already published.
        let mut late = broker.subscribe(session_id);

        assert!(matches!(
            first.recv().await,
            Some(ProgressEvent::Connected { .. })
        ));
        assert!(matches!(
            first.recv().await,
            Some(ProgressEvent::PageStart { page_index: 0 })
        ));
        assert!(matches!(
            second.recv().await,
            Some(ProgressEvent::Connected { .. })
        ));
        assert!(matches!(
            second.recv().await,
            Some(ProgressEvent::PageStart { page_index: 0 })
        ));

        assert!(matches!(
            late.recv().await,
            Some(ProgressEvent::Connected { .. })
        ));
        broker.publish(session_id, &ProgressEvent::PageComplete { page_index: 0 });
        assert!(matches!(
            late.recv().await,
            Some(ProgressEvent::PageComplete { page_index: 0 })
        ));
    }

    #[tokio::test]
    async fn publish_to_other_session_is_isolated() {
        let broker = EventBroker::new();
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();
        let mut sub = broker.subscribe(session_a);
        assert!(matches!(
            sub.recv().await,
            Some(ProgressEvent::Connected { .. })
        ));

        broker.publish(session_b, &ProgressEvent::PageStart { page_index: 9 });
        broker.publish(session_a, &ProgressEvent::PageStart { page_index: 1 });
        assert!(matches!(
            sub.recv().await,
            Some(ProgressEvent::PageStart { page_index: 1 })
        ));
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let broker = EventBroker::new();
        let session_id = Uuid::new_v4();
        let sub = broker.subscribe(session_id);
        assert_eq!(broker.subscriber_count(session_id), 1);

        drop(sub);
        assert_eq!(broker.subscriber_count(session_id), 0);

        // Publishing afterwards is a no-op, not a panic.
        broker.publish(session_id, &ProgressEvent::PageStart { page_index: 0 });
    }

    #[tokio::test]
    async fn unsubscribe_twice_is_safe() {
        let broker = EventBroker::new();
        let session_id = Uuid::new_v4();
        let sub = broker.subscribe(session_id);
        let id = sub.id;
        broker.unsubscribe(session_id, id);
        broker.unsubscribe(session_id, id);
        assert_eq!(broker.subscriber_count(session_id), 0);
    }
}
