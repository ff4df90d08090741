//! Shared extraction-resilience patterns.
//!
//! Every recipe composes the same four tolerances against site drift:
//!
//! - [`first_matching_text`]: ordered selector-fallback probing
//! - [`check_bot_challenge`]: cheap post-navigation challenge detection
//! - [`poll_until_stable`]: convergence polling for streamed content
//! - [`flatten_record`]: safe serialization of nested extracted values
//!
//! [`Params`] closes the companion gap of every recipe re-parsing request
//! parameters its own way.

pub mod params;

pub use params::Params;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::{PagesiftError, Result};
use crate::model::Record;
use crate::page::QueryScope;

/// Title substrings that mark a bot-challenge interstitial. Matched
/// case-insensitively.
const CHALLENGE_MARKERS: &[&str] = &["captcha", "unusual traffic", "verify you are human"];

/// Try `candidates` in order within `scope`; return the first non-empty
/// trimmed text. `None` means the field is absent; the caller decides
/// whether that discards the record. Query faults on one candidate are
/// treated as a miss, not an error.
pub async fn first_matching_text<S>(scope: &S, candidates: &[&str]) -> Option<String>
where
    S: QueryScope + ?Sized,
{
    for selector in candidates {
        let element = match scope.find(selector).await {
            Ok(Some(el)) => el,
            Ok(None) => continue,
            Err(e) => {
                tracing::trace!("candidate {selector:?} failed: {e}");
                continue;
            }
        };
        let text = element.text().await.ok().flatten().unwrap_or_default();
        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }
    None
}

/// Inspect the page title for challenge markers and fail the invocation
/// with `Blocked` before any extraction is attempted.
pub async fn check_bot_challenge(page: &dyn crate::page::PageHandle) -> Result<()> {
    let title = page.title().await?;
    let lower = title.to_lowercase();
    for marker in CHALLENGE_MARKERS {
        if lower.contains(marker) {
            return Err(PagesiftError::Blocked(format!(
                "challenge page detected (title: {title:?})"
            )));
        }
    }
    Ok(())
}

/// Tunables for [`poll_until_stable`]. Fixed configuration, never derived
/// dynamically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Milliseconds between samples (default: 500)
    pub interval_ms: u64,

    /// Consecutive identical non-trivial samples required (default: 6)
    pub required_stable: usize,

    /// Maximum samples before giving up (default: 80)
    pub max_attempts: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            required_stable: 6,
            max_attempts: 80,
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Repeatedly sample a streamed value until it stabilizes.
///
/// Samples that are empty or still equal to `baseline` (the untranslated
/// input echoed back) reset the stability counter. A sample repeating the
/// last-seen non-trivial value extends its streak; a new value starts a
/// fresh streak of one. Returns the value once its streak reaches
/// `required_stable` consecutive observations, or `Timeout` after
/// `max_attempts` samples. This substitutes for a "done" signal the site
/// does not expose.
pub async fn poll_until_stable<F, Fut>(
    settings: &PollSettings,
    baseline: &str,
    mut sample: F,
) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let baseline = baseline.trim();
    let mut last = String::new();
    let mut streak = 0usize;

    for _ in 0..settings.max_attempts {
        tokio::time::sleep(settings.interval()).await;

        let current = sample().await?;
        let current = current.trim();

        if current.is_empty() || current == baseline {
            // Not started yet, or the site is echoing the input back
            streak = 0;
            continue;
        }

        if current == last {
            streak += 1;
        } else {
            last = current.to_string();
            streak = 1;
        }

        if streak >= settings.required_stable {
            return Ok(last);
        }
    }

    Err(PagesiftError::Timeout(format!(
        "value did not stabilize within {} samples",
        settings.max_attempts
    )))
}

/// Serialize every nested value (array or object) in `record` to its
/// compact JSON encoding, leaving scalars untouched. Downstream storage
/// accepts only scalar field values.
pub fn flatten_record(record: &mut Record) -> Result<()> {
    for (_, value) in record.iter_mut() {
        if value.is_array() || value.is_object() {
            let encoded = serde_json::to_string(value)?;
            *value = Value::String(encoded);
        }
    }
    Ok(())
}
