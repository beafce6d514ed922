//! Error types for importing, rendering and querying sections

/// Result type alias for yamlpack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the store, the renderer and the section accessors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source could not be opened or fully read
    #[error("could not read data: {0}")]
    Io(#[from] std::io::Error),

    /// An operation named a file identifier that was never imported
    #[error("file has not been imported: {file}")]
    NotFound { file: String },

    /// A handler with this name is already registered
    #[error("handler \"{name}\" already exists")]
    DuplicateHandler { name: String },

    /// The template engine rejected or failed to execute a section
    #[error("failed to render template for {file}: {message}")]
    Render {
        file: String,
        message: String,
        /// The section text handed to the template function
        source_text: String,
        /// Output produced before the failure
        partial: String,
    },

    /// A section's bytes are not valid YAML (or not a mapping)
    #[error("failed to parse yaml section of {file}: {source}")]
    Parse {
        file: String,
        /// The offending bytes, lossily decoded
        data: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The section has no parsed view (never parsed, or its last parse failed)
    #[error("yaml section of {file} has not been parsed")]
    Unparsed { file: String },

    /// A filter pattern is not a valid regular expression
    #[error("invalid filter pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Template values could not be converted to a template context
    #[error("template values could not be serialized: {0}")]
    Values(#[from] serde_json::Error),

    /// The parsed view could not be decoded into the destination type
    #[error("yaml unmarshal failed: {0}")]
    Decode(#[source] serde_yaml::Error),

    /// A parsed view could not be written back out as YAML
    #[error("yaml marshal failed: {0}")]
    Encode(#[source] serde_yaml::Error),

    /// Strict decoding found keys the destination type does not know
    #[error("yaml unmarshal strict failed, unknown fields: {}", fields.join(", "))]
    UnknownFields { fields: Vec<String> },

    /// A section is missing a key the caller requires
    #[error("section of {file} has no string value at {key}")]
    MissingKey { file: String, key: String },
}

impl Error {
    pub(crate) fn not_found(file: &str) -> Self {
        Error::NotFound {
            file: file.to_string(),
        }
    }

    pub(crate) fn parse(file: &str, data: &[u8], source: serde_yaml::Error) -> Self {
        Error::Parse {
            file: file.to_string(),
            data: String::from_utf8_lossy(data).into_owned(),
            source,
        }
    }

    /// Attach a file identifier to an error raised by a template function,
    /// which only sees bytes.
    pub(crate) fn with_file(self, file: &str) -> Self {
        match self {
            Error::Render {
                file: current,
                message,
                source_text,
                partial,
            } if current.is_empty() => Error::Render {
                file: file.to_string(),
                message,
                source_text,
                partial,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_file_fills_empty_render_file() {
        let err = Error::Render {
            file: String::new(),
            message: "boom".to_string(),
            source_text: "a: {{".to_string(),
            partial: String::new(),
        }
        .with_file("manifests.yaml");

        assert!(matches!(err, Error::Render { ref file, .. } if file == "manifests.yaml"));
        assert_eq!(
            err.to_string(),
            "failed to render template for manifests.yaml: boom"
        );
    }

    #[test]
    fn test_with_file_keeps_existing_file() {
        let err = Error::Render {
            file: "first".to_string(),
            message: "boom".to_string(),
            source_text: String::new(),
            partial: String::new(),
        }
        .with_file("second");

        assert!(matches!(err, Error::Render { ref file, .. } if file == "first"));
    }

    #[test]
    fn test_unknown_fields_message() {
        let err = Error::UnknownFields {
            fields: vec!["b".to_string(), "c.d".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "yaml unmarshal strict failed, unknown fields: b, c.d"
        );
    }
}
