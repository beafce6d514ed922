//! Rendering section text through a template engine before it is parsed
//!
//! A [`TemplateFunc`] receives a section's original bytes plus a value object and
//! returns the rendered bytes. The built-in functions run handlebars with HTML
//! escaping disabled and the helper library registered.

mod helpers;

use std::sync::Arc;

use handlebars::Handlebars;
use lazy_static::lazy_static;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

/// A section rendering function: `(original bytes, values) -> rendered bytes`
pub type TemplateFunc = Arc<dyn Fn(&[u8], &JsonValue) -> Result<Vec<u8>> + Send + Sync>;

lazy_static! {
    static ref LENIENT: Handlebars<'static> = registry(false);
    static ref STRICT: Handlebars<'static> = registry(true);
}

fn registry(strict: bool) -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(strict);
    handlebars.register_escape_fn(handlebars::no_escape);
    helpers::register(&mut handlebars);
    handlebars
}

/// Template function where missing values render as empty.
pub fn default_template() -> TemplateFunc {
    Arc::new(render_lenient)
}

/// Template function where a reference to a missing value is a render error.
pub fn strict_template() -> TemplateFunc {
    Arc::new(render_strict)
}

/// Render with no values, giving a parseable first version of a section.
pub fn null_template(input: &[u8]) -> Result<Vec<u8>> {
    render_with(&LENIENT, input, &JsonValue::Object(Default::default()))
}

fn render_lenient(input: &[u8], values: &JsonValue) -> Result<Vec<u8>> {
    render_with(&LENIENT, input, values)
}

fn render_strict(input: &[u8], values: &JsonValue) -> Result<Vec<u8>> {
    render_with(&STRICT, input, values)
}

fn render_with(registry: &Handlebars<'static>, input: &[u8], values: &JsonValue) -> Result<Vec<u8>> {
    let source = std::str::from_utf8(input).map_err(|e| Error::Render {
        file: String::new(),
        message: format!("section is not valid UTF-8: {}", e),
        source_text: String::from_utf8_lossy(input).into_owned(),
        partial: String::new(),
    })?;

    let mut rendered = Vec::with_capacity(input.len());
    match registry.render_template_to_write(source, values, &mut rendered) {
        Ok(()) => Ok(rendered),
        Err(err) => {
            let partial = String::from_utf8_lossy(&rendered).into_owned();
            tracing::debug!("render failed after {} bytes of output: {}", rendered.len(), err);
            Err(Error::Render {
                file: String::new(),
                message: err.to_string(),
                source_text: source.to_string(),
                partial,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn render(func: &TemplateFunc, text: &str, values: JsonValue) -> Result<String> {
        func(text.as_bytes(), &values).map(|b| String::from_utf8(b).unwrap())
    }

    #[test]
    fn test_default_template_substitutes_values() {
        let out = render(
            &default_template(),
            "name: {{Values.name}}\nport: {{Values.port}}\n",
            json!({ "Values": { "name": "web", "port": 8080 } }),
        )
        .unwrap();

        assert_eq!(out, "name: web\nport: 8080\n");
    }

    #[test]
    fn test_no_html_escaping() {
        let out = render(&default_template(), "cmd: {{cmd}}", json!({ "cmd": "a && b <c>" })).unwrap();
        assert_eq!(out, "cmd: a && b <c>");
    }

    #[test]
    fn test_lenient_missing_value_is_empty() {
        let out = render(&default_template(), "name: {{Values.missing}}\n", json!({})).unwrap();
        assert_eq!(out, "name: \n");
    }

    #[test]
    fn test_strict_missing_value_fails() {
        let err = render(&strict_template(), "name: {{Values.missing}}\n", json!({})).unwrap_err();
        assert_matches!(err, Error::Render { source_text, .. } if source_text == "name: {{Values.missing}}\n");
    }

    #[test]
    fn test_syntax_error_fails_in_both_modes() {
        for func in [default_template(), strict_template()] {
            let err = render(&func, "name: {{#if}}\n", json!({})).unwrap_err();
            assert_matches!(err, Error::Render { .. });
        }
    }

    #[test]
    fn test_partial_output_kept_on_failure() {
        let err = render(
            &strict_template(),
            "first: {{a}}\nsecond: {{b}}\n",
            json!({ "a": "ok" }),
        )
        .unwrap_err();

        match err {
            Error::Render { partial, .. } => assert!(partial.starts_with("first: ok")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_null_template_renders_blocks_empty() {
        let out = null_template(b"a: 1\n{{#if Values.extra}}b: 2\n{{/if}}c: {{Values.c}}\n").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a: 1\nc: \n");
    }

    #[test]
    fn test_invalid_utf8_is_render_error() {
        let err = null_template(&[0xff, 0xfe]).unwrap_err();
        assert_matches!(err, Error::Render { message, .. } if message.contains("UTF-8"));
    }
}
