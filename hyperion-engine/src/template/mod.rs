// Template Engine
// {{ expression }} substitution, filters and for/if blocks over the task context

pub mod lexer;
pub mod parser;
pub mod renderer;

pub use renderer::{render, TemplateContext, WithEntry};

use thiserror::Error;

/// Errors raised while parsing or evaluating a template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("unclosed '{delimiter}' at position {position}")]
    Unclosed {
        delimiter: &'static str,
        position: usize,
    },

    #[error("template syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("filter '{name}' called with {found} argument(s), expected {expected}")]
    FilterArguments {
        name: String,
        expected: String,
        found: usize,
    },
}
