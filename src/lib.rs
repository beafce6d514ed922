//! yamlpack: multi-document YAML streams as ordered, templated sections
//!
//! This library provides:
//! - Splitting a byte stream into sections at each `---`
//! - Rendering each section through handlebars before it is parsed
//! - Regex filtering of sections by their original text
//! - Dotted-path getters, sub-section extraction and serde decoding per section
//!
//! # Example
//!
//! ```
//! use yamlpack::YamlPack;
//!
//! let yp = YamlPack::new();
//! let text = "---\nname: {{Values.name}}\n---\nname: static\n";
//! yp.import("bundle.yaml", text.as_bytes()).unwrap();
//! yp.apply_default_template("bundle.yaml", &serde_json::json!({ "Values": { "name": "web" } }))
//!     .unwrap();
//!
//! let sections = yp.sections("bundle.yaml").unwrap();
//! assert_eq!(sections[0].get_string("name"), "web");
//! assert_eq!(sections[1].get_string("name"), "static");
//! ```

pub mod error;
pub mod parser;
pub mod sanitize;
pub mod template;
pub mod view;

mod section;
mod store;

pub use error::{Error, Result};
pub use section::Section;
pub use store::{Handler, YamlPack, YamlPackOptions};
pub use template::TemplateFunc;
pub use view::ConfigView;
