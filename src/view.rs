//! Dotted-path access to a parsed YAML section
//!
//! Lookups are permissive: an absent path, or a value of the wrong shape, yields
//! the zero value of the requested type instead of an error.

use serde::de::Error as _;
use serde_yaml::{Mapping, Value};

use crate::sanitize::sanitize_mapping;

/// Parsed configuration for one section
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigView {
    root: Mapping,
    case_sensitive: bool,
}

impl ConfigView {
    /// Parse one YAML document.
    ///
    /// Empty and comment-only documents give an empty view. A document whose top
    /// level is not a mapping is rejected.
    pub fn from_slice(data: &[u8], case_sensitive: bool) -> Result<Self, serde_yaml::Error> {
        let value: Value = serde_yaml::from_slice(data)?;
        let root = match value {
            Value::Null => Mapping::new(),
            Value::Mapping(map) => map,
            other => {
                return Err(serde_yaml::Error::custom(format!(
                    "expected a mapping at the top level, found {}",
                    kind_name(&other)
                )))
            }
        };
        Ok(Self::from_mapping(root, case_sensitive))
    }

    pub fn from_mapping(root: Mapping, case_sensitive: bool) -> Self {
        let root = if case_sensitive {
            root
        } else {
            lowercase_keys(root)
        };
        Self {
            root,
            case_sensitive,
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Resolve a dotted path such as `metadata.name`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return None;
        }
        let path = if self.case_sensitive {
            path.to_string()
        } else {
            path.to_lowercase()
        };

        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.root.get(first)?;
        for part in parts {
            current = current.as_mapping()?.get(part)?;
        }
        Some(current)
    }

    pub fn get_string(&self, path: &str) -> String {
        self.get(path).map(value_to_string).unwrap_or_default()
    }

    pub fn get_bool(&self, path: &str) -> bool {
        self.get(path).map(value_to_bool).unwrap_or(false)
    }

    pub fn get_string_slice(&self, path: &str) -> Vec<String> {
        match self.get(path) {
            Some(Value::Sequence(items)) => items.iter().map(value_to_string).collect(),
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    /// The subtree at `path`, if it is a mapping.
    pub fn sub(&self, path: &str) -> Option<ConfigView> {
        match self.get(path)? {
            Value::Mapping(map) => Some(ConfigView {
                root: map.clone(),
                case_sensitive: self.case_sensitive,
            }),
            _ => None,
        }
    }

    /// The whole view, string-keyed at every level.
    pub fn all_settings(&self) -> Mapping {
        sanitize_mapping(&self.root)
    }
}

/// Scalar to string in the permissive accessor style: numbers in shortest form,
/// everything that is not a scalar becomes empty.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(|f| f.to_string()).unwrap_or_default()
            }
        }
        Value::Tagged(tagged) => value_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => String::new(),
    }
}

fn value_to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.as_str(), "1" | "t" | "T" | "TRUE" | "true" | "True"),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Tagged(tagged) => value_to_bool(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => false,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn lowercase_keys(map: Mapping) -> Mapping {
    map.into_iter()
        .map(|(key, value)| {
            let key = match key {
                Value::String(s) => Value::String(s.to_lowercase()),
                other => other,
            };
            (key, lowercase_value(value))
        })
        .collect()
}

fn lowercase_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(lowercase_keys(map)),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lowercase_value).collect()),
        other => other,
    }
}
