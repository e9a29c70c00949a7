// Hyperion Engine Library
// Reads declarative documents and executes their task groups

pub mod error;
pub mod execution;
pub mod model;
pub mod reader;
pub mod runners;
pub mod tasks;
pub mod template;

// Re-export commonly used types
pub use error::{EngineError, EngineResult};

// Re-export reader types
pub use reader::{DocumentReader, ParseError, ParseErrorKind, ParseResult};

// Re-export model and template types
pub use model::{MatrixParameters, Value, Variable};
pub use template::{render, RenderError, TemplateContext};

// Re-export execution types
pub use execution::{
    progress_channel, Document, DocumentExecutor, DocumentParameters, DocumentResult,
    EngineEvent, ExecutorConfig, ProgressReceiver, ProgressSender, TaskGroup, DEFAULT_TIMEOUT,
};

// Re-export runner and task types
pub use runners::{Runner, RunnerRegistry, TaskError, TaskOutput};
pub use tasks::{Task, TaskKind};
