//! Line-oriented regex filtering of sections

use regex::Regex;

use crate::error::{Error, Result};
use crate::section::Section;

/// Compile every pattern, failing on the first invalid one.
pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            let pattern = p.as_ref();
            Regex::new(pattern).map_err(|source| Error::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}

/// True if any pattern matches any single line of `data`.
pub fn matches_any(data: &[u8], patterns: &[Regex]) -> bool {
    let text = String::from_utf8_lossy(data);
    patterns
        .iter()
        .any(|rx| text.lines().any(|line| rx.is_match(line)))
}

/// Keep the sections whose original text matches at least one pattern on at
/// least one line. Order is preserved.
///
/// All patterns are compiled before any section is inspected. An empty pattern
/// list keeps nothing.
pub fn filter_sections<S: AsRef<str>>(sections: Vec<Section>, patterns: &[S]) -> Result<Vec<Section>> {
    let compiled = compile_patterns(patterns)?;
    let before = sections.len();

    let kept: Vec<Section> = sections
        .into_iter()
        .filter(|section| matches_any(section.original_bytes(), &compiled))
        .collect();

    tracing::debug!("filter kept {} of {} sections", kept.len(), before);
    Ok(kept)
}
