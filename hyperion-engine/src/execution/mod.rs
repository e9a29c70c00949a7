// Execution Engine Module
// Handles document iterations, task groups, cancellation and progress events

pub mod config;
pub mod context;
pub mod document;
pub mod events;
pub mod executor;
pub mod group;

// Re-export key types
pub use config::{ExecutorConfig, DEFAULT_TIMEOUT};
pub use context::{ExecutionEnv, RunScope};
pub use document::{Document, DocumentParameters, DocumentResult};
pub use events::{progress_channel, EngineEvent, EventSender, ProgressReceiver, ProgressSender};
pub use executor::DocumentExecutor;
pub use group::{TaskGroup, VariableStore};
