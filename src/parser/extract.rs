//! Pulling individual documents out of a raw stream without building a store

use std::collections::BTreeMap;

use regex::bytes::Regex;
use serde_yaml::{Mapping, Value};

use super::splitter::{split_sections, DELIMITER};
use crate::error::{Error, Result};
use crate::sanitize::sanitize_mapping;

/// Partition the documents of `data` into `(extracted, remaining)` streams.
///
/// A document is extracted when every `key -> value` criterion appears in it as
/// `key: value` (the value optionally double-quoted). Both output streams
/// re-prefix each document with `---\n`, so they can be imported again.
pub fn extract_doc(data: &[u8], criteria: &BTreeMap<String, String>) -> Result<(Vec<u8>, Vec<u8>)> {
    let filters = criteria
        .iter()
        .map(|(key, value)| {
            let pattern = format!(r#"{}:\s*"?{}"?"#, regex::escape(key), regex::escape(value));
            Regex::new(&pattern).map_err(|source| Error::InvalidPattern { pattern, source })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut extracted = Vec::new();
    let mut remaining = Vec::new();

    for doc in split_sections(data) {
        let target = if filters.iter().all(|rx| rx.is_match(doc)) {
            &mut extracted
        } else {
            &mut remaining
        };
        target.extend_from_slice(DELIMITER.as_bytes());
        target.push(b'\n');
        target.extend_from_slice(doc);
    }

    Ok((extracted, remaining))
}

/// Parse a single YAML document into a string-keyed mapping.
///
/// `file` names the source in any parse error.
pub fn map_from_bytes(file: &str, data: &[u8]) -> Result<Mapping> {
    let value: Value =
        serde_yaml::from_slice(data).map_err(|source| Error::parse(file, data, source))?;
    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(map) => Ok(sanitize_mapping(&map)),
        _ => Err(Error::parse(
            file,
            data,
            serde::de::Error::custom("expected a mapping at the top level"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = "---\nkind: Service\nmetadata:\n  name: web\n---\nkind: Deployment\nmetadata:\n  name: \"web\"\n---\nkind: Service\nmetadata:\n  name: db\n";

    fn criteria(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_extract_all_criteria_must_match() {
        let (extracted, remaining) =
            extract_doc(STREAM.as_bytes(), &criteria(&[("kind", "Service"), ("name", "web")])).unwrap();

        let extracted = String::from_utf8(extracted).unwrap();
        let remaining = String::from_utf8(remaining).unwrap();

        assert_eq!(extracted, "---\n\nkind: Service\nmetadata:\n  name: web\n");
        assert!(remaining.contains("kind: Deployment"));
        assert!(remaining.contains("name: db"));
        assert_eq!(remaining.matches("---\n").count(), 2);
    }

    #[test]
    fn test_extract_quoted_value() {
        let (extracted, _) =
            extract_doc(STREAM.as_bytes(), &criteria(&[("kind", "Deployment"), ("name", "web")])).unwrap();

        let extracted = String::from_utf8(extracted).unwrap();
        assert!(extracted.contains("name: \"web\""));
        assert_eq!(extracted.matches("---\n").count(), 1);
    }

    #[test]
    fn test_no_criteria_extracts_everything() {
        let (extracted, remaining) = extract_doc(STREAM.as_bytes(), &BTreeMap::new()).unwrap();

        assert_eq!(String::from_utf8(extracted).unwrap().matches("---\n").count(), 3);
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_criteria_are_literal() {
        let stream = b"---\nimage: app.v1\n---\nimage: appXv1\n";
        let (extracted, remaining) = extract_doc(stream, &criteria(&[("image", "app.v1")])).unwrap();

        assert_eq!(extracted, b"---\n\nimage: app.v1\n".to_vec());
        assert_eq!(remaining, b"---\n\nimage: appXv1\n".to_vec());
    }

    #[test]
    fn test_map_from_bytes() {
        let map = map_from_bytes("values.yaml", b"a: 1\n2: dropped\nb:\n  c: d\n").unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&Value::from(1)));
        assert!(map.get("b").and_then(|b| b.get("c")).is_some());
    }

    #[test]
    fn test_map_from_bytes_rejects_scalar() {
        let err = map_from_bytes("values.yaml", b"just a string").unwrap_err();
        assert!(matches!(err, Error::Parse { ref file, .. } if file == "values.yaml"));
        assert!(map_from_bytes("values.yaml", b"").unwrap().is_empty());
    }
}
