// Engine Errors
// Umbrella error over reading, rendering and task execution

use crate::reader::ParseError;
use crate::runners::TaskError;
use crate::template::RenderError;

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot read document: {0}")]
    Parse(#[from] ParseError),

    #[error("template error: {0}")]
    Render(#[from] RenderError),

    #[error("task error: {0}")]
    Task(#[from] TaskError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
