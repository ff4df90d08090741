//! # pagesift
//!
//! Extracts structured records (search results, translations, articles,
//! social posts) from live web pages rendered by a controlled browser,
//! normalizing heterogeneous site markup into a uniform paginated result
//! shape.
//!
//! ## Architecture
//!
//! ```text
//! Registry ── dispatch(endpoint) ──> Recipe ── PageHandle ──> rendered DOM
//!                                      │
//!                                   toolkit (fallbacks, polling,
//!                                            challenge checks, flattening)
//!                                      │
//!                                 ScrapeResult
//! ```
//!
//! Each site is handled by an independent recipe selected by endpoint name.
//! Recipes are stateless; one invocation drives one page handle through a
//! sequence of navigations, waits and polls, each under a bounded timeout.
//! Failures surface as distinct [`app::PagesiftError`] kinds; nothing is
//! retried inside this crate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pagesift::page::{BrowserSettings, ChromeSession};
//! use pagesift::recipe::{BraveRecipe, Registry};
//! use pagesift::toolkit::Params;
//!
//! let mut registry = Registry::new();
//! registry.register(Box::new(BraveRecipe::default()))?;
//!
//! let session = ChromeSession::launch(BrowserSettings::default()).await?;
//! let page = session.new_page().await?;
//!
//! let params = Params::from_pairs([("query", "rust"), ("count", "5")]);
//! let result = registry.dispatch("search", &page, &params).await?;
//! ```

/// Error types.
///
/// [`PagesiftError`](app::PagesiftError) is the single failure channel:
/// every wait, poll and subprocess call converts into one of its typed
/// variants.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/pagesift/config.toml`.
pub mod config;

/// The uniform result model.
///
/// - [`ScrapeResult`](model::ScrapeResult): items + pagination
/// - [`Record`](model::Record): one extracted item, scalar fields only
pub mod model;

/// Browser capability traits and the chromiumoxide adapter.
///
/// - [`PageHandle`](page::PageHandle) / [`ElementHandle`](page::ElementHandle):
///   the capability surface recipes consume
/// - [`ChromeSession`](page::ChromeSession): launches headless Chrome
pub mod page;

/// The recipe contract, the dispatcher and the four site recipes.
///
/// - [`Recipe`](recipe::Recipe): `endpoints` / `supports` / `scrape`
/// - [`Registry`](recipe::Registry): first-match dispatch with
///   registration-time endpoint uniqueness
pub mod recipe;

/// Shared extraction-resilience patterns: selector fallbacks, bot-challenge
/// detection, convergence polling, scalar flattening, parameter parsing.
pub mod toolkit;
