//! Background task orchestration bridged into the event broker.
//!
//! One `start_task` call runs one unit of background work for a session and
//! publishes its lifecycle (`task-started`, then exactly one of
//! `task-completed` / `task-failed` / `task-cancelled`) into that session's
//! event feed. `stream` exposes the feed as a lazy sequence that heartbeats
//! through quiet stretches and ends at the first terminal event.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::Stream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;

use super::broker::{EventBroker, Subscription};
use super::events::ProgressEvent;

/// Process-local record of one in-flight task. Never persisted.
#[derive(Debug, Clone)]
pub struct TaskMeta {
    pub id: Uuid,
    pub session_id: Uuid,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

struct RunningTask {
    meta: TaskMeta,
    cancel: CancellationToken,
}

pub struct TaskManager {
    tasks: DashMap<Uuid, RunningTask>,
    broker: Arc<EventBroker>,
    heartbeat: Duration,
}

impl TaskManager {
    pub fn new(heartbeat: Duration) -> Arc<Self> {
        Arc::new(Self {
            tasks: DashMap::new(),
            broker: EventBroker::new(),
            heartbeat,
        })
    }

    /// Subscribe to a session's event feed.
    pub fn subscribe(&self, session_id: Uuid) -> Subscription {
        self.broker.subscribe(session_id)
    }

    /// Publish an event to a session's subscribers.
    pub fn publish(&self, session_id: Uuid, event: &ProgressEvent) {
        self.broker.publish(session_id, event);
    }

    /// Start one unit of background work and return its task id without
    /// waiting for completion.
    ///
    /// Nothing here enforces a single concurrent task per session: two
    /// `start_task` calls for the same session run independently and
    /// interleave their events in the shared feed.
    pub fn start_task<F>(self: &Arc<Self>, session_id: Uuid, kind: &str, work: F) -> Uuid
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let task_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        self.tasks.insert(
            task_id,
            RunningTask {
                meta: TaskMeta {
                    id: task_id,
                    session_id,
                    kind: kind.to_string(),
                    created_at: Utc::now(),
                },
                cancel: cancel.clone(),
            },
        );

        let manager = self.clone();
        let kind = kind.to_string();
        tokio::spawn(async move {
            manager.publish(session_id, &ProgressEvent::task_started(task_id, &kind));

            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                result = work => Some(result),
            };

            match outcome {
                None => {
                    tracing::info!("Task {} ({}) cancelled", task_id, kind);
                    manager.publish(session_id, &ProgressEvent::task_cancelled(task_id, &kind));
                }
                Some(Ok(())) => {
                    manager.publish(session_id, &ProgressEvent::task_completed(task_id, &kind));
                }
                Some(Err(err)) => {
                    tracing::error!("Task {} ({}) failed: {}", task_id, kind, err);
                    manager.publish(
                        session_id,
                        &ProgressEvent::task_failed(task_id, &kind, err.to_string()),
                    );
                }
            }
            manager.tasks.remove(&task_id);
        });

        task_id
    }

    /// Request cancellation of a running task. No-op for unknown or already
    /// terminal ids.
    pub fn cancel_task(&self, task_id: Uuid) {
        if let Some(task) = self.tasks.get(&task_id) {
            task.cancel.cancel();
        }
    }

    /// Whether a task is still in flight.
    pub fn is_task_running(&self, task_id: Uuid) -> bool {
        self.tasks.contains_key(&task_id)
    }

    /// Metadata of one in-flight task.
    pub fn task_meta(&self, task_id: Uuid) -> Option<TaskMeta> {
        self.tasks.get(&task_id).map(|task| task.meta.clone())
    }

    /// A session's live event feed as a lazy stream.
    ///
    /// Each pull waits up to the heartbeat window for the next event and
    /// yields a synthetic `heartbeat` on timeout. The stream ends after the
    /// first terminal event; the underlying subscription unsubscribes when
    /// the stream is dropped, whether it ran to completion or the consumer
    /// walked away mid-feed.
    pub fn stream(self: &Arc<Self>, session_id: Uuid) -> impl Stream<Item = ProgressEvent> + Send {
        let subscription = self.subscribe(session_id);
        let heartbeat = self.heartbeat;
        futures::stream::unfold(
            (subscription, false),
            move |(mut subscription, finished)| async move {
                if finished {
                    return None;
                }
                let event = match tokio::time::timeout(heartbeat, subscription.recv()).await {
                    Ok(Some(event)) => event,
                    Ok(None) => return None,
                    Err(_) => ProgressEvent::heartbeat(subscription.session_id()),
                };
                let terminal = event.is_terminal();
                Some((event, (subscription, terminal)))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn manager() -> Arc<TaskManager> {
        TaskManager::new(Duration::from_secs(15))
    }

    async fn drain_until_terminal(subscription: &mut Subscription) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = subscription.recv().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    mod lifecycle_tests {
        use super::*;

        #[tokio::test]
        async fn successful_task_publishes_started_then_completed() {
            let manager = manager();
            let session_id = Uuid::new_v4();
            let mut subscription = manager.subscribe(session_id);

            let task_id = manager.start_task(session_id, "recognition", async { Ok(()) });

            let events = drain_until_terminal(&mut subscription).await;
            let tags: Vec<&str> = events.iter().map(|e| e.tag()).collect();
            assert_eq!(tags, vec!["connected", "task-started", "task-completed"]);

            match &events[1] {
                ProgressEvent::TaskStarted { task_id: id, kind, .. } => {
                    assert_eq!(*id, task_id);
                    assert_eq!(kind, "recognition");
                }
                other => panic!("expected task-started, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn failing_task_publishes_task_failed_with_error() {
            let manager = manager();
            let session_id = Uuid::new_v4();
            let mut subscription = manager.subscribe(session_id);

            manager.start_task(session_id, "recognition", async {
                Err(crate::error::ReflowError::Recognition("boom".to_string()))
            });

            let events = drain_until_terminal(&mut subscription).await;
            match events.last() {
                Some(ProgressEvent::TaskFailed { error, .. }) => {
                    assert!(error.contains("boom"));
                }
                other => panic!("expected task-failed, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn task_record_is_removed_after_completion() {
            let manager = manager();
            let session_id = Uuid::new_v4();
            let mut subscription = manager.subscribe(session_id);

            let task_id = manager.start_task(session_id, "recognition", async { Ok(()) });
            drain_until_terminal(&mut subscription).await;

            // The runner removes the record right after the terminal publish.
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(!manager.is_task_running(task_id));
            assert!(manager.task_meta(task_id).is_none());
        }
    }

    mod cancellation_tests {
        use super::*;

        #[tokio::test]
        async fn cancel_publishes_task_cancelled() {
            let manager = manager();
            let session_id = Uuid::new_v4();
            let mut subscription = manager.subscribe(session_id);

            let task_id = manager.start_task(session_id, "recognition", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            });

            // Let the runner publish task-started first.
            assert!(matches!(
                subscription.recv().await,
                Some(ProgressEvent::Connected { .. })
            ));
            assert!(matches!(
                subscription.recv().await,
                Some(ProgressEvent::TaskStarted { .. })
            ));

            manager.cancel_task(task_id);
            match subscription.recv().await {
                Some(ProgressEvent::TaskCancelled { task_id: id, .. }) => {
                    assert_eq!(id, task_id)
                }
                other => panic!("expected task-cancelled, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn cancel_unknown_task_is_a_noop() {
            let manager = manager();
            manager.cancel_task(Uuid::new_v4());
        }
    }

    mod stream_tests {
        use super::*;

        #[tokio::test]
        async fn stream_ends_at_first_terminal_event() {
            let manager = manager();
            let session_id = Uuid::new_v4();

            let stream = manager.stream(session_id);
            manager.start_task(session_id, "recognition", async { Ok(()) });

            let events: Vec<ProgressEvent> = stream.collect().await;
            let tags: Vec<&str> = events.iter().map(|e| e.tag()).collect();
            assert_eq!(tags, vec!["connected", "task-started", "task-completed"]);
        }

        #[tokio::test]
        async fn quiet_stream_yields_heartbeat() {
            let manager = TaskManager::new(Duration::from_millis(30));
            let session_id = Uuid::new_v4();

            let mut stream = Box::pin(manager.stream(session_id));
            assert!(matches!(
                stream.next().await,
                Some(ProgressEvent::Connected { .. })
            ));
            assert!(matches!(
                stream.next().await,
                Some(ProgressEvent::Heartbeat { .. })
            ));
        }

        #[tokio::test]
        async fn abandoned_stream_releases_its_subscription() {
            let manager = manager();
            let session_id = Uuid::new_v4();

            let mut stream = Box::pin(manager.stream(session_id));
            assert!(matches!(
                stream.next().await,
                Some(ProgressEvent::Connected { .. })
            ));
            drop(stream);

            // Publishing after abandonment reaches nobody and panics nothing.
            manager.publish(session_id, &ProgressEvent::PageStart { page_index: 0 });
        }
    }
}
