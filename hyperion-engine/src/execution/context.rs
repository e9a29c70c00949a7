// Runtime Execution Context
// Shared services and per-iteration scope handed to task groups

use crate::execution::config::ExecutorConfig;
use crate::execution::events::ProgressSender;
use crate::model::{MatrixParameters, Value};
use crate::runners::{Runner, RunnerRegistry};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Services shared by every task of an executor
#[derive(Clone)]
pub struct ExecutionEnv {
    /// Executes task kinds
    pub runner: Arc<dyn Runner>,
    /// Progress event sink
    pub events: Option<ProgressSender>,
    /// Bounds concurrently running tasks
    pub pool: Arc<Semaphore>,
    /// Time cancelled tasks get before they are aborted
    pub cancel_grace: Duration,
}

impl ExecutionEnv {
    /// Environment with the default runner registry rooted at the configured working directory
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            runner: Arc::new(RunnerRegistry::with_working_dir(config.working_dir.clone())),
            events: None,
            pool: Arc::new(Semaphore::new(config.max_parallel_tasks.max(1))),
            cancel_grace: config.cancel_grace,
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn Runner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_events(mut self, events: ProgressSender) -> Self {
        self.events = Some(events);
        self
    }
}

impl Default for ExecutionEnv {
    fn default() -> Self {
        Self::new(&ExecutorConfig::default())
    }
}

/// What one iteration of a document exposes to its tasks
#[derive(Clone)]
pub struct RunScope {
    pub env: ExecutionEnv,
    /// Read-only document model
    pub model: Arc<Value>,
    /// Matrix entry of the current iteration
    pub matrix: Option<Arc<MatrixParameters>>,
}

impl RunScope {
    pub fn new(env: ExecutionEnv, model: Arc<Value>) -> Self {
        Self {
            env,
            model,
            matrix: None,
        }
    }

    pub fn with_matrix(mut self, matrix: Option<&MatrixParameters>) -> Self {
        self.matrix = matrix.map(|m| Arc::new(m.clone()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::events::progress_channel;

    #[test]
    fn test_env_from_config() {
        let config = ExecutorConfig::default()
            .with_max_parallel_tasks(3)
            .with_cancel_grace(Duration::from_millis(10));
        let env = ExecutionEnv::new(&config);

        assert_eq!(env.pool.available_permits(), 3);
        assert_eq!(env.cancel_grace, Duration::from_millis(10));
        assert!(env.events.is_none());
    }

    #[test]
    fn test_scope_matrix() {
        let (tx, _rx) = progress_channel();
        let env = ExecutionEnv::default().with_events(tx);
        let matrix = MatrixParameters::new("linux").with_parameter("os", "linux");
        let scope = RunScope::new(env, Arc::new(Value::empty_map())).with_matrix(Some(&matrix));

        assert_eq!(scope.matrix.as_deref(), Some(&matrix));
        assert!(scope.env.events.is_some());
    }
}
