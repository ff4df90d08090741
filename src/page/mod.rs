//! Capability surface over the browser-automation engine.
//!
//! Recipes never touch the engine directly; they consume [`PageHandle`] and
//! [`ElementHandle`], which cover exactly the operations extraction needs:
//! navigation, scoped selector queries, text/attribute reads, keyboard
//! interaction, init scripts and small per-node script evaluation.
//!
//! [`chrome`] provides the chromiumoxide-backed implementation. Tests use
//! the in-memory fakes from [`fake`].

pub mod chrome;

#[cfg(test)]
pub mod fake;

pub use chrome::{BrowserSettings, ChromePage, ChromeSession};

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::app::Result;

/// Boxed element handle as returned from queries.
pub type DynElement = Box<dyn ElementHandle>;

/// Selector queries scoped to either a whole page or a single element.
///
/// A query that matches nothing yields `Ok(None)` / an empty vec; engine
/// faults surface as [`crate::app::PagesiftError::Page`].
#[async_trait]
pub trait QueryScope: Send + Sync {
    /// First element matching `selector` within this scope, if any.
    async fn find(&self, selector: &str) -> Result<Option<DynElement>>;

    /// All elements matching `selector` within this scope, in document order.
    async fn find_all(&self, selector: &str) -> Result<Vec<DynElement>>;
}

/// A handle to one DOM node.
#[async_trait]
pub trait ElementHandle: QueryScope {
    /// Rendered text content, trimmed by callers as needed.
    async fn text(&self) -> Result<Option<String>>;

    /// Attribute value, if the attribute is present.
    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    async fn click(&self) -> Result<()>;

    /// Type text into the element (it must already hold focus or be
    /// focusable by the engine).
    async fn type_text(&self, text: &str) -> Result<()>;

    /// Press a named key or chord (e.g. `"Backspace"`, `"Control+a"`).
    async fn press_key(&self, key: &str) -> Result<()>;

    /// Evaluate a JavaScript function against this node (`this` is the
    /// node) and return its JSON-serializable result.
    async fn eval(&self, js_fn: &str) -> Result<Value>;
}

/// A handle to one live browser page.
#[async_trait]
pub trait PageHandle: QueryScope {
    /// Navigate and wait for the document to load.
    async fn goto(&self, url: &str) -> Result<()>;

    /// URL the page currently shows (sites may redirect under us).
    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// Register a script that runs in every new document before any page
    /// script, ahead of the next navigation.
    async fn add_init_script(&self, source: &str) -> Result<()>;

    /// Wait until `selector` matches, polling up to `timeout`. Expiry is a
    /// typed [`crate::app::PagesiftError::Timeout`] so callers can choose
    /// to tolerate it.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<DynElement>;
}
