//! One YAML document from a multi-document stream
//!
//! A section keeps the bytes it was split out of (`original_bytes`) separately
//! from its current rendered bytes. Rendering always starts from the original, so
//! a section can be rendered again with different values without drift.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_ignored::Path as IgnoredPath;
use serde_json::Value as JsonValue;
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::template::{default_template, TemplateFunc};
use crate::view::ConfigView;

/// A single document with its raw and rendered forms
#[derive(Clone)]
pub struct Section {
    bytes: Vec<u8>,
    original_bytes: Vec<u8>,
    file: String,
    view: Option<ConfigView>,
    template_func: TemplateFunc,
    case_sensitive: bool,
}

impl Section {
    /// Create an unparsed, unrendered section bound to the default template.
    pub fn from_bytes(file: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(file.into(), data, default_template(), true)
    }

    pub(crate) fn new(
        file: String,
        data: Vec<u8>,
        template_func: TemplateFunc,
        case_sensitive: bool,
    ) -> Self {
        Self {
            bytes: data.clone(),
            original_bytes: data,
            file,
            view: None,
            template_func,
            case_sensitive,
        }
    }

    /// Current (possibly rendered) content
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content as split from the source, before any rendering
    pub fn original_bytes(&self) -> &[u8] {
        &self.original_bytes
    }

    /// Identifier of the import this section came from
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn view(&self) -> Option<&ConfigView> {
        self.view.as_ref()
    }

    pub fn is_parsed(&self) -> bool {
        self.view.is_some()
    }

    pub fn template_func(&self) -> &TemplateFunc {
        &self.template_func
    }

    pub fn set_template_func(&mut self, func: TemplateFunc) {
        self.template_func = func;
    }

    /// Rebuild the parsed view from the current bytes.
    ///
    /// On failure the previous view is dropped, so stale data is never served.
    pub fn parse(&mut self) -> Result<()> {
        match ConfigView::from_slice(&self.bytes, self.case_sensitive) {
            Ok(view) => {
                self.view = Some(view);
                Ok(())
            }
            Err(source) => {
                self.view = None;
                Err(Error::parse(&self.file, &self.bytes, source))
            }
        }
    }

    /// Replace the current bytes. The view is invalid until the next parse.
    pub(crate) fn set_rendered(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
        self.view = None;
    }

    /// Render with this section's own template function.
    pub fn render<T: Serialize + ?Sized>(&mut self, values: &T) -> Result<()> {
        let func = self.template_func.clone();
        self.render_with_template_func(&func, values)
    }

    /// Render with `func` instead of the bound template function.
    pub fn render_with_template_func<T: Serialize + ?Sized>(
        &mut self,
        func: &TemplateFunc,
        values: &T,
    ) -> Result<()> {
        let values = serde_json::to_value(values)?;
        self.render_value_with(func, &values)
    }

    /// Render the original bytes and re-parse.
    ///
    /// A template failure leaves the section untouched. A parse failure after a
    /// successful render leaves the new bytes in place with no view.
    pub fn render_value_with(&mut self, func: &TemplateFunc, values: &JsonValue) -> Result<()> {
        let rendered = func(self.original_bytes.as_slice(), values)
            .map_err(|e| e.with_file(&self.file))?;
        tracing::debug!(
            "rendered section of {} ({} -> {} bytes)",
            self.file,
            self.original_bytes.len(),
            rendered.len()
        );
        self.set_rendered(rendered);
        self.parse()
    }

    fn parsed(&self) -> Result<&ConfigView> {
        self.view.as_ref().ok_or_else(|| Error::Unparsed {
            file: self.file.clone(),
        })
    }

    /// String at a dotted path, or empty when absent.
    pub fn get_string(&self, path: &str) -> String {
        self.view
            .as_ref()
            .map(|v| v.get_string(path))
            .unwrap_or_default()
    }

    /// String list at a dotted path, or empty when absent.
    pub fn get_string_slice(&self, path: &str) -> Vec<String> {
        self.view
            .as_ref()
            .map(|v| v.get_string_slice(path))
            .unwrap_or_default()
    }

    /// Boolean at a dotted path, or `false` when absent.
    pub fn get_bool(&self, path: &str) -> bool {
        self.view.as_ref().map(|v| v.get_bool(path)).unwrap_or(false)
    }

    /// Extract the mapping at `path` as an independent section.
    ///
    /// Returns `Ok(None)` when the path does not exist or is not a mapping. The new
    /// section keeps this section's file and template function.
    pub fn sub(&self, path: &str) -> Result<Option<Section>> {
        let view = match self.parsed()?.sub(path) {
            Some(view) => view,
            None => return Ok(None),
        };
        let bytes = serde_yaml::to_string(&view.all_settings())
            .map_err(Error::Encode)?
            .into_bytes();

        Ok(Some(Section {
            bytes: bytes.clone(),
            original_bytes: bytes,
            file: self.file.clone(),
            view: Some(view),
            template_func: self.template_func.clone(),
            case_sensitive: self.case_sensitive,
        }))
    }

    /// All settings as a string-keyed mapping.
    pub fn all_settings(&self) -> Result<Mapping> {
        Ok(self.parsed()?.all_settings())
    }

    /// Decode the settings into `T`, ignoring keys `T` does not declare.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T> {
        let settings = Value::Mapping(self.all_settings()?);
        serde_yaml::from_value(settings).map_err(Error::Decode)
    }

    /// Decode the settings into `T`, failing on keys `T` does not declare.
    ///
    /// Every ignored key is reported by path, e.g. `spec.extra` or `items[1].name`.
    pub fn unmarshal_strict<T: DeserializeOwned>(&self) -> Result<T> {
        let settings = Value::Mapping(self.all_settings()?);

        let mut fields = Vec::new();
        let decoded: T = serde_ignored::deserialize(settings, |path| fields.push(field_path(&path)))
            .map_err(Error::Decode)?;
        if !fields.is_empty() {
            return Err(Error::UnknownFields { fields });
        }
        Ok(decoded)
    }
}

fn field_path(path: &IgnoredPath<'_>) -> String {
    match path {
        IgnoredPath::Root => String::new(),
        IgnoredPath::Seq { parent, index } => format!("{}[{}]", field_path(parent), index),
        IgnoredPath::Map { parent, key } => {
            let parent = field_path(parent);
            if parent.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", parent, key)
            }
        }
        IgnoredPath::Some { parent }
        | IgnoredPath::NewtypeStruct { parent }
        | IgnoredPath::NewtypeVariant { parent } => field_path(parent),
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("file", &self.file)
            .field("bytes", &String::from_utf8_lossy(&self.bytes))
            .field("original_bytes", &String::from_utf8_lossy(&self.original_bytes))
            .field("parsed", &self.view.is_some())
            .finish_non_exhaustive()
    }
}
