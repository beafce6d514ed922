//! Splitting, filtering and extracting documents from multi-document streams

mod extract;
mod filter;
mod splitter;

pub use extract::{extract_doc, map_from_bytes};
pub use filter::{compile_patterns, filter_sections, matches_any};
pub use splitter::{split_sections, DELIMITER};
