//! Document boundary detection
//!
//! A stream is cut at every literal `---`. The bytes between one delimiter and the
//! next (or the end of the stream) form a document; anything before the first
//! delimiter is discarded. A stream with no delimiter is a single document.

use lazy_static::lazy_static;
use regex::bytes::Regex;

/// The literal separating documents in a stream
pub const DELIMITER: &str = "---";

lazy_static! {
    static ref DELIMITER_RE: Regex = Regex::new(&regex::escape(DELIMITER)).unwrap();
}

/// Split `data` into document spans, in stream order.
///
/// Produces exactly one span per delimiter occurrence, or one span covering all
/// of `data` when there are none.
pub fn split_sections(data: &[u8]) -> Vec<&[u8]> {
    let bounds: Vec<(usize, usize)> = DELIMITER_RE
        .find_iter(data)
        .map(|m| (m.start(), m.end()))
        .collect();

    if bounds.is_empty() {
        return vec![data];
    }

    bounds
        .iter()
        .enumerate()
        .map(|(i, &(_, end))| match bounds.get(i + 1) {
            Some(&(next_start, _)) => &data[end..next_start],
            None => &data[end..],
        })
        .collect()
}
