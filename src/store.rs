//! The section store: imported files, their sections, and registered handlers
//!
//! Every mutating call takes the store's write lock for its whole duration, and
//! snapshots take the read lock. Nothing runs in the background.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::parser::{compile_patterns, matches_any, split_sections};
use crate::section::Section;
use crate::template::{default_template, null_template, strict_template, TemplateFunc};

/// A named callback registered with the store
pub type Handler = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// Store-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct YamlPackOptions {
    /// Match keys exactly in dotted-path lookups. When off, keys are lower-cased.
    pub case_sensitive: bool,
}

impl Default for YamlPackOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
        }
    }
}

#[derive(Default)]
struct Inner {
    files: HashMap<String, Vec<Section>>,
    handlers: HashMap<String, Handler>,
}

/// Ordered sections per imported file, plus handler bookkeeping
pub struct YamlPack {
    inner: RwLock<Inner>,
    options: YamlPackOptions,
    default_template: TemplateFunc,
    strict_template: TemplateFunc,
}

impl Default for YamlPack {
    fn default() -> Self {
        Self::new()
    }
}

impl YamlPack {
    /// Create an empty, case-sensitive store.
    pub fn new() -> Self {
        Self::with_options(YamlPackOptions::default())
    }

    pub fn with_options(options: YamlPackOptions) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            options,
            default_template: default_template(),
            strict_template: strict_template(),
        }
    }

    pub fn options(&self) -> YamlPackOptions {
        self.options
    }

    /// Replace the template function bound to newly imported sections and used
    /// by [`apply_default_template`](Self::apply_default_template).
    pub fn set_default_template(&mut self, func: TemplateFunc) {
        self.default_template = func;
    }

    /// Replace the function used by
    /// [`apply_default_template_strict`](Self::apply_default_template_strict).
    pub fn set_strict_template(&mut self, func: TemplateFunc) {
        self.strict_template = func;
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read every byte from `reader`, split it into sections stored under `id`,
    /// null-render them and re-parse every known file.
    ///
    /// Replaces any sections previously imported under `id`. A read or null-render
    /// failure leaves the store unchanged.
    pub fn import<R: Read>(&self, id: &str, mut reader: R) -> Result<()> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let mut sections: Vec<Section> = split_sections(&data)
            .into_iter()
            .map(|span| {
                Section::new(
                    id.to_string(),
                    span.to_vec(),
                    self.default_template.clone(),
                    self.options.case_sensitive,
                )
            })
            .collect();
        tracing::debug!("importing {}: {} bytes, {} sections", id, data.len(), sections.len());

        apply_null_template(&mut sections, id)?;

        let mut inner = self.write();
        inner.files.insert(id.to_string(), sections);
        parse_all(&mut inner, id)
    }

    /// Open `path` and import it, using the path as the file identifier.
    pub fn import_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::open(path)?;
        self.import(&path.to_string_lossy(), BufReader::new(file))
    }

    /// Import, keep only sections matching `filters`, render the rest with
    /// `func` and no values, then re-parse.
    pub fn import_with_template_func_and_filters<R: Read, S: AsRef<str>>(
        &self,
        id: &str,
        reader: R,
        func: &TemplateFunc,
        filters: &[S],
    ) -> Result<()> {
        self.import(id, reader)?;
        self.apply_filters(id, filters)?;
        self.apply_template(id, func, &JsonValue::Null)?;
        self.parse_sections(id)
    }

    /// Re-parse every section of every file. Fails if `id` was never imported.
    pub fn parse_sections(&self, id: &str) -> Result<()> {
        let mut inner = self.write();
        parse_all(&mut inner, id)
    }

    /// Keep only the sections of `id` whose original text matches a pattern.
    ///
    /// Patterns are compiled before anything is removed, so an invalid pattern
    /// leaves the file as it was.
    pub fn apply_filters<S: AsRef<str>>(&self, id: &str, filters: &[S]) -> Result<()> {
        let patterns = compile_patterns(filters)?;
        let mut inner = self.write();
        let sections = inner.files.get_mut(id).ok_or_else(|| Error::not_found(id))?;

        let before = sections.len();
        sections.retain(|section| matches_any(section.original_bytes(), &patterns));
        tracing::debug!("filters on {} kept {} of {} sections", id, sections.len(), before);
        Ok(())
    }

    /// Render every section of `id` with `func`, stopping at the first failure.
    pub fn apply_template<T: Serialize + ?Sized>(
        &self,
        id: &str,
        func: &TemplateFunc,
        values: &T,
    ) -> Result<()> {
        let values = serde_json::to_value(values)?;
        let mut inner = self.write();
        let sections = inner.files.get_mut(id).ok_or_else(|| Error::not_found(id))?;
        for section in sections.iter_mut() {
            section.render_value_with(func, &values)?;
        }
        Ok(())
    }

    /// Render every section of `id` with the default template function, where
    /// missing values render as empty.
    pub fn apply_default_template<T: Serialize + ?Sized>(&self, id: &str, values: &T) -> Result<()> {
        let func = self.default_template.clone();
        self.apply_template(id, &func, values)
    }

    /// Render every section of `id` with the strict template function, where a
    /// missing value is an error.
    pub fn apply_default_template_strict<T: Serialize + ?Sized>(
        &self,
        id: &str,
        values: &T,
    ) -> Result<()> {
        let func = self.strict_template.clone();
        self.apply_template(id, &func, values)
    }

    /// Snapshot of every section. Order across files is unspecified; within a
    /// file it follows the source.
    pub fn all_sections(&self) -> Vec<Section> {
        let inner = self.read();
        inner.files.values().flatten().cloned().collect()
    }

    /// Snapshot of the sections of `id`, in source order.
    pub fn sections(&self, id: &str) -> Result<Vec<Section>> {
        let inner = self.read();
        inner.files.get(id).cloned().ok_or_else(|| Error::not_found(id))
    }

    /// Identifiers of all imported files
    pub fn files(&self) -> Vec<String> {
        self.read().files.keys().cloned().collect()
    }

    /// The `metadata.name` of every section.
    ///
    /// Fails on the first section without a string name there.
    pub fn list_yamls(&self) -> Result<Vec<String>> {
        const NAME_PATH: &str = "metadata.name";

        self.all_sections()
            .iter()
            .map(|section| {
                let view = section.view().ok_or_else(|| Error::Unparsed {
                    file: section.file().to_string(),
                })?;
                view.get(NAME_PATH)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| Error::MissingKey {
                        file: section.file().to_string(),
                        key: NAME_PATH.to_string(),
                    })
            })
            .collect()
    }

    /// Register `handler` under `name`. Names must be unique.
    pub fn register_handler<F>(&self, name: &str, handler: F) -> Result<()>
    where
        F: Fn(&str) -> Result<()> + Send + Sync + 'static,
    {
        let mut inner = self.write();
        if inner.handlers.contains_key(name) {
            return Err(Error::DuplicateHandler {
                name: name.to_string(),
            });
        }
        inner.handlers.insert(name.to_string(), Arc::new(handler));
        Ok(())
    }

    /// Remove a handler. Unknown names are ignored.
    pub fn deregister_handler(&self, name: &str) {
        let mut inner = self.write();
        inner.handlers.remove(name);
    }

    pub fn handler(&self, name: &str) -> Option<Handler> {
        self.read().handlers.get(name).cloned()
    }
}

fn apply_null_template(sections: &mut [Section], id: &str) -> Result<()> {
    for section in sections.iter_mut() {
        let rendered = null_template(section.original_bytes()).map_err(|e| e.with_file(id))?;
        section.set_rendered(rendered);
    }
    Ok(())
}

fn parse_all(inner: &mut Inner, id: &str) -> Result<()> {
    if !inner.files.contains_key(id) {
        return Err(Error::not_found(id));
    }
    for sections in inner.files.values_mut() {
        for section in sections.iter_mut() {
            section.parse()?;
        }
    }
    Ok(())
}
