//! Unique-character extraction for font subsetting.
//!
//! The deck client renders card text with a subset font; this produces the
//! full set of characters that subset must cover. Only top-level string
//! values contribute, matching what the renderer actually displays.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::normalize::RawRecord;

/// Every distinct character across the records' string fields, sorted.
pub fn unique_characters(records: &[RawRecord]) -> String {
    let mut chars = BTreeSet::new();
    for record in records {
        for value in record.values() {
            if let Value::String(s) = value {
                chars.extend(s.chars());
            }
        }
    }
    chars.into_iter().collect()
}
