// Document Executor
// Configured entry point running documents with shared runners, pool and progress channel

use crate::execution::config::ExecutorConfig;
use crate::execution::context::ExecutionEnv;
use crate::execution::document::{Document, DocumentParameters, DocumentResult};
use crate::execution::events::ProgressSender;
use crate::runners::Runner;

use std::sync::Arc;

/// Document executor
#[derive(Clone)]
pub struct DocumentExecutor {
    /// Configuration
    config: ExecutorConfig,
    env: ExecutionEnv,
}

impl DocumentExecutor {
    /// Create an executor with default configuration
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    /// Create an executor with custom configuration
    pub fn with_config(config: ExecutorConfig) -> Self {
        let env = ExecutionEnv::new(&config);
        Self { config, env }
    }

    /// Set progress event sender
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.env = self.env.with_events(tx);
        self
    }

    /// Replace the runner registry
    pub fn with_runner(mut self, runner: Arc<dyn Runner>) -> Self {
        self.env = self.env.with_runner(runner);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute the document
    pub async fn execute(
        &self,
        document: &Document,
        parameters: &DocumentParameters,
    ) -> DocumentResult {
        document.run_with(&self.env, parameters).await
    }
}

impl Default for DocumentExecutor {
    fn default() -> Self {
        Self::new()
    }
}
