// Document Reader Module
// YAML document loading with detailed error reporting

pub mod document;
pub mod error;

pub use document::DocumentReader;
pub use error::{ParseError, ParseErrorKind, ParseResult};
