// Model Values
// Recursive string/list/map tree used for the document model and "with" entries

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A model value: a string leaf, an ordered list or a key-sorted map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Empty map, the shape of a document without a model
    pub fn empty_map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Get the string if this is a leaf
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this is a map
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Number of entries for lists and maps, characters for strings
    pub fn len(&self) -> usize {
        match self {
            Value::String(s) => s.chars().count(),
            Value::List(items) => items.len(),
            Value::Map(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a new tree with every string leaf passed through `f`.
    ///
    /// Map keys are left untouched. The first error aborts the walk.
    pub fn try_map_strings<E>(
        &self,
        f: &mut impl FnMut(&str) -> Result<String, E>,
    ) -> Result<Value, E> {
        Ok(match self {
            Value::String(s) => Value::String(f(s)?),
            Value::List(items) => Value::List(
                items
                    .iter()
                    .map(|item| item.try_map_strings(f))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(map) => {
                let mut rendered = BTreeMap::new();
                for (key, value) in map {
                    rendered.insert(key.clone(), value.try_map_strings(f)?);
                }
                Value::Map(rendered)
            }
        })
    }

    /// Convert a parsed YAML node; nulls and non-scalar keys are dropped with a warning
    pub fn from_yaml(node: &serde_yaml::Value) -> Option<Value> {
        match node {
            serde_yaml::Value::Null => {
                tracing::warn!("node type 'null' not supported, ignoring");
                None
            }
            serde_yaml::Value::Bool(b) => Some(Value::String(b.to_string())),
            serde_yaml::Value::Number(n) => Some(Value::String(n.to_string())),
            serde_yaml::Value::String(s) => Some(Value::String(s.clone())),
            serde_yaml::Value::Sequence(items) => {
                Some(Value::List(items.iter().filter_map(Value::from_yaml).collect()))
            }
            serde_yaml::Value::Mapping(mapping) => {
                let mut map = BTreeMap::new();
                for (key, value) in mapping {
                    let Some(key) = scalar_key(key) else {
                        tracing::warn!("non-scalar map key not supported, ignoring");
                        continue;
                    };
                    if let Some(value) = Value::from_yaml(value) {
                        map.insert(key, value);
                    }
                }
                Some(Value::Map(map))
            }
            serde_yaml::Value::Tagged(tagged) => Value::from_yaml(&tagged.value),
        }
    }
}

fn scalar_key(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let node = serde_yaml::Value::deserialize(deserializer)?;
        Ok(Value::from_yaml(&node).unwrap_or_else(|| Value::String(String::new())))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            other => {
                let json = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                write!(f, "{}", json)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::empty_map()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_scalars_become_strings() {
        let node: serde_yaml::Value = serde_yaml::from_str("a: 1\nb: true\nc: text").unwrap();
        let value = Value::from_yaml(&node).unwrap();

        assert_eq!(value.get("a"), Some(&Value::from("1")));
        assert_eq!(value.get("b"), Some(&Value::from("true")));
        assert_eq!(value.get("c"), Some(&Value::from("text")));
    }

    #[test]
    fn test_from_yaml_skips_nulls() {
        let node: serde_yaml::Value = serde_yaml::from_str("a: ~\nb: [x, ~, y]").unwrap();
        let value = Value::from_yaml(&node).unwrap();

        assert!(value.get("a").is_none());
        assert_eq!(
            value.get("b"),
            Some(&Value::List(vec![Value::from("x"), Value::from("y")]))
        );
    }

    #[test]
    fn test_map_iterates_sorted() {
        let node: serde_yaml::Value = serde_yaml::from_str("zeta: 1\nalpha: 2\nmid: 3").unwrap();
        let value = Value::from_yaml(&node).unwrap();
        let keys: Vec<&String> = value.as_map().unwrap().keys().collect();

        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_try_map_strings_keeps_shape() {
        let node: serde_yaml::Value =
            serde_yaml::from_str("name: a\nitems: [b, {inner: c}]").unwrap();
        let value = Value::from_yaml(&node).unwrap();

        let upper = value
            .try_map_strings(&mut |s| Ok::<_, ()>(s.to_uppercase()))
            .unwrap();

        assert_eq!(upper.get("name"), Some(&Value::from("A")));
        let items = upper.get("items").and_then(Value::as_list).unwrap();
        assert_eq!(items[0], Value::from("B"));
        assert_eq!(items[1].get("inner"), Some(&Value::from("C")));
        // original untouched
        assert_eq!(value.get("name"), Some(&Value::from("a")));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("plain").to_string(), "plain");
        let list = Value::List(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(list.to_string(), r#"["a","b"]"#);
    }
}
