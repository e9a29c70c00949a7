// Executor Configuration
// Limits and locations applied to every document run

use std::path::PathBuf;
use std::time::Duration;

/// Default per-group timeout (5 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Configuration for document execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Group timeout used when the caller does not pass one
    pub default_timeout: Duration,
    /// Maximum tasks of a parallel group running at once
    pub max_parallel_tasks: usize,
    /// Directory task processes run in and relative paths resolve against
    pub working_dir: PathBuf,
    /// Time a cancelled task gets to wind down before it is aborted
    pub cancel_grace: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            max_parallel_tasks: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            cancel_grace: Duration::from_secs(5),
        }
    }
}

impl ExecutorConfig {
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the parallel task limit (at least 1)
    pub fn with_max_parallel_tasks(mut self, max: usize) -> Self {
        self.max_parallel_tasks = max.max(1);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }
}
