//! Progress events published to session subscribers.
//!
//! Every event carries an `event` tag on the wire; clients switch on it.
//! Field names are camelCase to match the frontend's expectations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One structured progress message for a session's live feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ProgressEvent {
    /// Pushed into every new subscription before anything else
    Connected {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    TaskStarted {
        task_id: Uuid,
        kind: String,
        timestamp: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: Uuid,
        kind: String,
        timestamp: DateTime<Utc>,
    },
    TaskFailed {
        task_id: Uuid,
        kind: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    TaskCancelled {
        task_id: Uuid,
        kind: String,
        timestamp: DateTime<Utc>,
    },

    /// Synthesized by the stream when no message arrives within the
    /// heartbeat window
    Heartbeat {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    RecognitionStart {
        session_id: Uuid,
        total_pages: usize,
    },
    PageStart {
        page_index: usize,
    },
    PageComplete {
        page_index: usize,
    },
    RecognitionFinished {
        pages: usize,
    },
    RecognitionError {
        message: String,
    },
}

impl ProgressEvent {
    pub fn connected(session_id: Uuid) -> Self {
        Self::Connected {
            session_id,
            timestamp: Utc::now(),
        }
    }

    pub fn heartbeat(session_id: Uuid) -> Self {
        Self::Heartbeat {
            session_id,
            timestamp: Utc::now(),
        }
    }

    pub fn task_started(task_id: Uuid, kind: &str) -> Self {
        Self::TaskStarted {
            task_id,
            kind: kind.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn task_completed(task_id: Uuid, kind: &str) -> Self {
        Self::TaskCompleted {
            task_id,
            kind: kind.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn task_failed(task_id: Uuid, kind: &str, error: String) -> Self {
        Self::TaskFailed {
            task_id,
            kind: kind.to_string(),
            error,
            timestamp: Utc::now(),
        }
    }

    pub fn task_cancelled(task_id: Uuid, kind: &str) -> Self {
        Self::TaskCancelled {
            task_id,
            kind: kind.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// The tag as it appears on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::TaskStarted { .. } => "task-started",
            Self::TaskCompleted { .. } => "task-completed",
            Self::TaskFailed { .. } => "task-failed",
            Self::TaskCancelled { .. } => "task-cancelled",
            Self::Heartbeat { .. } => "heartbeat",
            Self::RecognitionStart { .. } => "recognition-start",
            Self::PageStart { .. } => "page-start",
            Self::PageComplete { .. } => "page-complete",
            Self::RecognitionFinished { .. } => "recognition-finished",
            Self::RecognitionError { .. } => "recognition-error",
        }
    }

    /// A terminal event ends the live stream that yields it.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::TaskCompleted { .. } | Self::TaskFailed { .. } | Self::TaskCancelled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_kebab_case() {
        let event = ProgressEvent::task_started(Uuid::new_v4(), "recognition");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "task-started");
        assert!(json["taskId"].is_string());
        assert_eq!(json["kind"], "recognition");
    }

    #[test]
    fn fields_are_camel_case() {
        let event = ProgressEvent::RecognitionStart {
            session_id: Uuid::new_v4(),
            total_pages: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "recognition-start");
        assert_eq!(json["totalPages"], 3);
        assert!(json["sessionId"].is_string());
    }

    #[test]
    fn terminal_events_are_exactly_the_task_outcomes() {
        let id = Uuid::new_v4();
        assert!(ProgressEvent::task_completed(id, "recognition").is_terminal());
        assert!(ProgressEvent::task_failed(id, "recognition", "boom".to_string()).is_terminal());
        assert!(ProgressEvent::task_cancelled(id, "recognition").is_terminal());
        assert!(!ProgressEvent::connected(id).is_terminal());
        assert!(!ProgressEvent::heartbeat(id).is_terminal());
        assert!(!ProgressEvent::RecognitionFinished { pages: 1 }.is_terminal());
    }

    #[test]
    fn tag_matches_serialized_event_field() {
        let events = vec![
            ProgressEvent::connected(Uuid::new_v4()),
            ProgressEvent::heartbeat(Uuid::new_v4()),
            ProgressEvent::PageStart { page_index: 0 },
            ProgressEvent::PageComplete { page_index: 0 },
            ProgressEvent::RecognitionError {
                message: "x".to_string(),
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], event.tag());
        }
    }
}
