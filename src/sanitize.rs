//! Normalization of decoded YAML into string-keyed mappings
//!
//! YAML allows any value as a mapping key (`1: a`, `true: b`, `[x]: c`). Consumers
//! of section settings expect string keys at every level, so decoded values are
//! rewritten here. Entries with non-string keys are dropped with a warning rather
//! than failing the whole document.

use serde_yaml::{Mapping, Value};

/// Recursively rewrite `input` so every mapping is keyed by strings.
///
/// Sequences and scalar leaves are kept as-is. Tagged values are not inspected
/// and pass through unchanged.
pub fn sanitize(input: &Value) -> Value {
    match input {
        Value::Mapping(map) => Value::Mapping(sanitize_mapping(map)),
        Value::Sequence(seq) => Value::Sequence(seq.iter().map(sanitize).collect()),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => input.clone(),
        Value::Tagged(tagged) => {
            tracing::debug!("sanitize: passing through tagged value {}", tagged.tag);
            input.clone()
        }
    }
}

/// Sanitize a single mapping level and everything below it.
pub fn sanitize_mapping(map: &Mapping) -> Mapping {
    let mut output = Mapping::with_capacity(map.len());
    for (key, value) in map {
        match key {
            Value::String(_) => {
                output.insert(key.clone(), sanitize(value));
            }
            other => {
                tracing::warn!("sanitize: skipping non-string mapping key {:?}", other);
            }
        }
    }
    output
}
