// Document
// Matrix iterations over ordered task groups, folded into one result

use crate::execution::config::DEFAULT_TIMEOUT;
use crate::execution::context::{ExecutionEnv, RunScope};
use crate::execution::events::{EngineEvent, EventSender};
use crate::execution::group::TaskGroup;
use crate::model::{matrix, MatrixParameters, Value};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Input of a document run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentParameters {
    /// Tag filter; empty selects every task
    pub tags: BTreeSet<String>,
    /// Deadline of each task group
    pub timeout: Duration,
}

impl DocumentParameters {
    pub fn new(tags: impl IntoIterator<Item = impl Into<String>>, timeout_minutes: u64) -> Self {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            timeout: Duration::from_secs(timeout_minutes.saturating_mul(60)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for DocumentParameters {
    fn default() -> Self {
        Self {
            tags: BTreeSet::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Outcome of a document run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub success: bool,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl DocumentResult {
    /// Result for a document that could not be read: nothing ran
    pub fn failed() -> Self {
        let now = Utc::now();
        Self {
            success: false,
            started: now,
            finished: now,
        }
    }
}

/// Model, ordered task groups and optional matrix
#[derive(Debug, Default)]
pub struct Document {
    pub model: Arc<Value>,
    pub task_groups: Vec<TaskGroup>,
    pub matrix: Vec<MatrixParameters>,
}

impl Document {
    pub fn new(model: Value) -> Self {
        Self {
            model: Arc::new(model),
            task_groups: Vec::new(),
            matrix: Vec::new(),
        }
    }

    pub fn with_task_group(mut self, group: TaskGroup) -> Self {
        self.task_groups.push(group);
        self
    }

    pub fn with_matrix(mut self, parameters: MatrixParameters) -> Self {
        self.matrix.push(parameters);
        self
    }

    /// Run with default services
    pub async fn run(&self, parameters: &DocumentParameters) -> DocumentResult {
        self.run_with(&ExecutionEnv::default(), parameters).await
    }

    /// Run every iteration and every group; failures never stop later groups
    pub async fn run_with(
        &self,
        env: &ExecutionEnv,
        parameters: &DocumentParameters,
    ) -> DocumentResult {
        let started = Utc::now();
        let clock = Instant::now();
        let iterations = matrix::iterations(&self.matrix);

        tracing::info!(
            "running document with {} task group(s) in {} iteration(s)",
            self.task_groups.len(),
            iterations.len()
        );
        env.events.send_event(EngineEvent::DocumentStarted {
            total_groups: self.task_groups.len(),
            iterations: iterations.len(),
        });

        let mut success = true;
        for entry in iterations {
            if let Some(entry) = entry {
                tracing::info!(matrix = %entry.title, "running matrix iteration");
            }
            env.events.send_event(EngineEvent::IterationStarted {
                title: entry.map(|m| m.title.clone()),
            });

            let scope = RunScope::new(env.clone(), Arc::clone(&self.model)).with_matrix(entry);
            for group in &self.task_groups {
                success &= group
                    .run(&parameters.tags, parameters.timeout, &scope)
                    .await;
            }
        }

        let duration = clock.elapsed();
        env.events.send_event(EngineEvent::DocumentCompleted { success, duration });
        if success {
            tracing::info!("document succeeded in {:?}", duration);
        } else {
            tracing::error!("document failed after {:?}", duration);
        }

        DocumentResult {
            success,
            started,
            finished: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters() {
        let parameters = DocumentParameters::new(["a", "b"], 2);
        assert_eq!(parameters.timeout, Duration::from_secs(120));
        assert!(parameters.tags.contains("a"));

        let unbounded = DocumentParameters::new(Vec::<String>::new(), u64::MAX);
        assert_eq!(unbounded.timeout, Duration::from_secs(u64::MAX));

        let parameters = DocumentParameters::default().with_timeout(Duration::from_secs(1));
        assert!(parameters.tags.is_empty());
        assert_eq!(parameters.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_failed_result() {
        let result = DocumentResult::failed();
        assert!(!result.success);
        assert_eq!(result.started, result.finished);
    }

    #[test]
    fn test_result_json() {
        let result = DocumentResult::failed();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], serde_json::Value::Bool(false));
        assert!(json["started"].is_string());

        let back: DocumentResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[tokio::test]
    async fn test_empty_document_succeeds() {
        let result = Document::default().run(&DocumentParameters::default()).await;
        assert!(result.success);
        assert!(result.started <= result.finished);
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::execution::config::ExecutorConfig;
        use crate::execution::events::progress_channel;
        use crate::model::Variable;
        use crate::tasks::Task;

        #[tokio::test]
        async fn test_failing_group_does_not_stop_document() {
            let dir = tempfile::TempDir::new().unwrap();
            let marker = dir.path().join("second-group-ran");
            let document = Document::new(Value::empty_map())
                .with_task_group(TaskGroup::new("first", false).with_task(Task::shell("exit 1")))
                .with_task_group(
                    TaskGroup::new("second", false)
                        .with_task(Task::shell(format!("touch {}", marker.display()))),
                );

            let result = document.run(&DocumentParameters::default()).await;

            assert!(!result.success);
            assert!(marker.exists());
        }

        #[tokio::test]
        async fn test_matrix_iterations() {
            let dir = tempfile::TempDir::new().unwrap();
            let (tx, mut rx) = progress_channel();
            let env = ExecutionEnv::new(&ExecutorConfig::default().with_working_dir(dir.path()))
                .with_events(tx);
            let document = Document::new(Value::empty_map())
                .with_matrix(MatrixParameters::new("first").with_parameter("os", "linux"))
                .with_matrix(MatrixParameters::new("second").with_parameter("os", "windows"))
                .with_task_group(
                    TaskGroup::new("greet", false).with_task(
                        Task::shell("echo \"{{ matrix.os }}\"").with_variable(Variable::new("os")),
                    ),
                );

            let result = document.run_with(&env, &DocumentParameters::default()).await;
            assert!(result.success);

            let mut iterations = Vec::new();
            let mut values = Vec::new();
            while let Ok(event) = rx.try_recv() {
                match event {
                    EngineEvent::IterationStarted { title } => iterations.push(title),
                    EngineEvent::VariableSet { value, .. } => values.push(value),
                    _ => {}
                }
            }
            assert_eq!(
                iterations,
                vec![Some("first".to_string()), Some("second".to_string())]
            );
            assert_eq!(values, vec!["linux", "windows"]);
        }
    }
}
