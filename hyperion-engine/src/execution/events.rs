// Execution Events
// Progress reporting and event types for document execution

use std::time::Duration;
use tokio::sync::mpsc;

/// Sender for execution progress events
pub type ProgressSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiver for execution progress events
pub type ProgressReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted during document execution
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Document execution started
    DocumentStarted {
        total_groups: usize,
        iterations: usize,
    },

    /// Document execution completed
    DocumentCompleted { success: bool, duration: Duration },

    /// Matrix iteration started (title is None without a matrix)
    IterationStarted { title: Option<String> },

    /// Task group started
    TaskGroupStarted {
        title: String,
        parallel: bool,
        selected_tasks: usize,
    },

    /// Task group completed
    TaskGroupCompleted {
        title: String,
        success: bool,
        duration: Duration,
    },

    /// Task group hit its deadline
    TaskGroupTimedOut { title: String, timeout: Duration },

    /// Task invocation started
    TaskStarted {
        group: String,
        title: String,
        with_index: Option<usize>,
    },

    /// Task invocation completed
    TaskCompleted {
        group: String,
        title: String,
        success: bool,
        duration: Duration,
    },

    /// Task variable was written into the group store
    VariableSet {
        group: String,
        name: String,
        value: String,
    },

    /// Execution error occurred
    Error {
        group: Option<String>,
        message: String,
    },
}

impl EngineEvent {
    /// Create a task group completed event
    pub fn group_completed(title: impl Into<String>, success: bool, duration: Duration) -> Self {
        Self::TaskGroupCompleted {
            title: title.into(),
            success,
            duration,
        }
    }

    /// Create a task started event
    pub fn task_started(
        group: impl Into<String>,
        title: impl Into<String>,
        with_index: Option<usize>,
    ) -> Self {
        Self::TaskStarted {
            group: group.into(),
            title: title.into(),
            with_index,
        }
    }

    /// Create a task completed event
    pub fn task_completed(
        group: impl Into<String>,
        title: impl Into<String>,
        success: bool,
        duration: Duration,
    ) -> Self {
        Self::TaskCompleted {
            group: group.into(),
            title: title.into(),
            success,
            duration,
        }
    }

    /// Create a variable set event
    pub fn variable_set(
        group: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::VariableSet {
            group: group.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create an execution error event
    pub fn error(group: Option<String>, message: impl Into<String>) -> Self {
        Self::Error {
            group,
            message: message.into(),
        }
    }
}

/// Helper trait for sending events, ignoring errors (fire-and-forget)
pub trait EventSender {
    fn send_event(&self, event: EngineEvent);
}

impl EventSender for ProgressSender {
    fn send_event(&self, event: EngineEvent) {
        let _ = self.send(event);
    }
}

impl EventSender for Option<ProgressSender> {
    fn send_event(&self, event: EngineEvent) {
        if let Some(sender) = self {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_channel() {
        let (tx, mut rx) = progress_channel();

        tx.send_event(EngineEvent::IterationStarted { title: None });
        tx.send_event(EngineEvent::variable_set("group", "default", "hello"));

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(event1, EngineEvent::IterationStarted { .. }));

        let event2 = rx.recv().await.unwrap();
        assert_eq!(
            event2,
            EngineEvent::VariableSet {
                group: "group".to_string(),
                name: "default".to_string(),
                value: "hello".to_string(),
            }
        );
    }

    #[test]
    fn test_event_construction() {
        let event = EngineEvent::task_completed("Build", "Compile", true, Duration::from_secs(30));

        if let EngineEvent::TaskCompleted {
            group,
            title,
            success,
            duration,
        } = event
        {
            assert_eq!(group, "Build");
            assert_eq!(title, "Compile");
            assert!(success);
            assert_eq!(duration, Duration::from_secs(30));
        } else {
            panic!("wrong event type");
        }
    }

    #[test]
    fn test_optional_sender() {
        let sender: Option<ProgressSender> = None;
        // Should not panic
        sender.send_event(EngineEvent::error(None, "test"));
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (tx, rx) = progress_channel();
        drop(rx);
        tx.send_event(EngineEvent::error(Some("group".to_string()), "late"));
    }
}
