// Data Model
// Values, variables and matrix parameters shared by reader, renderer and executor

pub mod matrix;
pub mod value;
pub mod variable;

pub use matrix::MatrixParameters;
pub use value::Value;
pub use variable::Variable;
