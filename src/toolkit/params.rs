//! Shared request-parameter access with validation and clamping.

use std::collections::HashMap;

use crate::app::{PagesiftError, Result};

/// Read-only view over the request parameters of one invocation.
///
/// Recognized keys: `query` (free text), `count` (requested item cap),
/// `page` (1-based page number). Every accessor validates and clamps, so
/// recipes share one parsing behavior instead of each reinventing it.
#[derive(Debug, Clone, Default)]
pub struct Params {
    map: HashMap<String, String>,
}

impl Params {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    /// Convenience constructor for literal key/value pairs.
    pub fn from_pairs<const N: usize>(pairs: [(&str, &str); N]) -> Self {
        Self {
            map: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Trimmed `query` value; empty string when absent.
    pub fn query(&self) -> &str {
        self.raw("query").map(str::trim).unwrap_or("")
    }

    /// Trimmed `query`, or `InvalidRequest` when empty/absent.
    pub fn require_query(&self, what: &str) -> Result<&str> {
        let query = self.query();
        if query.is_empty() {
            return Err(PagesiftError::InvalidRequest(format!(
                "Missing {what}: pass query=<{what}>"
            )));
        }
        Ok(query)
    }

    /// Requested item cap, clamped to `1..=max`. Absent or unparseable
    /// values fall back to `default`.
    pub fn count(&self, default: usize, max: usize) -> usize {
        self.raw("count")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(default)
            .clamp(1, max)
    }

    /// Requested page number, clamped to >= 1. Absent or unparseable
    /// values mean page 1.
    pub fn page(&self) -> u32 {
        self.raw("page")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(1)
            .max(1)
    }
}
