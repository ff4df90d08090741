//! The uniform result shape every recipe produces.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single extracted record: field name to scalar value.
///
/// Recipes build records with whatever nesting is convenient, then run
/// [`crate::toolkit::flatten_record`] before returning so that every value
/// is a string, number or boolean (the downstream storage layer rejects
/// nested containers).
pub type Record = serde_json::Map<String, Value>;

/// Paginated result of one recipe invocation.
///
/// `items` preserve on-page document order; no re-sorting happens anywhere
/// in this crate. `has_next == false` is terminal: the caller must not
/// probe further pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub items: Vec<Record>,
    pub current_page: u32,
    pub has_next: bool,
}

impl ScrapeResult {
    pub fn new(items: Vec<Record>, current_page: u32, has_next: bool) -> Self {
        Self {
            items,
            current_page,
            has_next,
        }
    }

    /// Empty, non-paginated result (used when a results container never
    /// appeared or the site reported "no results").
    pub fn empty(current_page: u32) -> Self {
        Self {
            items: Vec::new(),
            current_page,
            has_next: false,
        }
    }

    /// Single-record result with no pagination (articles, translations).
    pub fn single(record: Record) -> Self {
        Self {
            items: vec![record],
            current_page: 1,
            has_next: false,
        }
    }
}
