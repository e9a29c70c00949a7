// Matrix Parameters
// Named parameter sets forming the outer loop of a document run

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One matrix configuration: a title plus string parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixParameters {
    pub title: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl MatrixParameters {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add a parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

/// Iterations for a document: one per matrix entry, or a single run without matrix
pub fn iterations(matrix: &[MatrixParameters]) -> Vec<Option<&MatrixParameters>> {
    if matrix.is_empty() {
        vec![None]
    } else {
        matrix.iter().map(Some).collect()
    }
}
