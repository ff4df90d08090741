//! Brave Search recipe: DOM-based extraction with anti-detection.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::app::{PagesiftError, Result};
use crate::model::{Record, ScrapeResult};
use crate::page::{ElementHandle, PageHandle};
use crate::recipe::Recipe;
use crate::toolkit::{self, Params};

const ENDPOINTS: &[&str] = &["search"];

const SEARCH_URL: &str = "https://search.brave.com/search";

/// Web results only; AI answers, ads and other snippet types are excluded
/// by the data-type filter.
const SNIPPET_SELECTOR: &str = "#results .snippet[data-type=\"web\"]";

/// Results per page as served by the site; drives the page -> offset math.
const RESULTS_PER_PAGE: u32 = 20;

/// Clears the standard automation signal before any site script runs.
const STEALTH_INIT_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

const TITLE_SELECTORS: &[&str] = &["[class*='title']", "a h2", "a h3"];
const DESCRIPTION_SELECTORS: &[&str] = &[".content", "[class*='snippet-description']", "p"];
const SITE_NAME_SELECTOR: &str = "[class*='site-name']";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BraveSettings {
    /// Settle delay after navigation for client-side rendering, in
    /// milliseconds (default: 3000)
    pub settle_ms: u64,

    /// How long to wait for the results container before concluding "zero
    /// results", in milliseconds (default: 8000)
    pub results_timeout_ms: u64,
}

impl Default for BraveSettings {
    fn default() -> Self {
        Self {
            settle_ms: 3000,
            results_timeout_ms: 8000,
        }
    }
}

/// Extracts Brave Search web results via the rendered DOM.
pub struct BraveRecipe {
    settings: BraveSettings,
}

impl Default for BraveRecipe {
    fn default() -> Self {
        Self::new(BraveSettings::default())
    }
}

impl BraveRecipe {
    pub fn new(settings: BraveSettings) -> Self {
        Self { settings }
    }

    /// Parse one result snippet. `Ok(None)` means the snippet lacks a
    /// mandatory field and should be dropped without failing the batch.
    async fn parse_snippet(snippet: &dyn ElementHandle) -> Result<Option<Record>> {
        let Some(title) = toolkit::first_matching_text(snippet, TITLE_SELECTORS).await else {
            return Ok(None);
        };

        // First external link; brave.com links are site chrome, not results
        let mut href = String::new();
        for link in snippet.find_all("a[href^='http']").await? {
            let candidate = link.attribute("href").await?.unwrap_or_default();
            if !candidate.is_empty() && !candidate.contains("brave.com") {
                href = candidate;
                break;
            }
        }
        if href.is_empty() {
            return Ok(None);
        }

        let description = toolkit::first_matching_text(snippet, DESCRIPTION_SELECTORS)
            .await
            .unwrap_or_default();

        let mut record = Record::new();
        record.insert("title".into(), json!(title));
        record.insert("url".into(), json!(href));
        record.insert("snippet".into(), json!(description));

        if let Ok(Some(el)) = snippet.find(SITE_NAME_SELECTOR).await {
            let site = el.text().await.ok().flatten().unwrap_or_default();
            // Keep only the site name, not the breadcrumb below it
            let site = site.lines().next().unwrap_or("").trim();
            if !site.is_empty() {
                record.insert("site".into(), json!(site));
            }
        }

        Ok(Some(record))
    }
}

#[async_trait]
impl Recipe for BraveRecipe {
    fn endpoints(&self) -> &[&str] {
        ENDPOINTS
    }

    async fn scrape(
        &self,
        _endpoint: &str,
        page: &dyn PageHandle,
        params: &Params,
    ) -> Result<ScrapeResult> {
        let query = params.require_query("search query")?;
        let count = params.count(20, 50);
        let page_num = params.page();
        // Saturate rather than wrap for absurd page numbers
        let offset = page_num.saturating_sub(1).saturating_mul(RESULTS_PER_PAGE);

        let offset = offset.to_string();
        let url =
            Url::parse_with_params(SEARCH_URL, &[("q", query), ("offset", offset.as_str())])?;

        page.add_init_script(STEALTH_INIT_SCRIPT).await?;
        page.goto(url.as_str()).await?;

        // Let client-side rendering finish
        tokio::time::sleep(Duration::from_millis(self.settings.settle_ms)).await;

        toolkit::check_bot_challenge(page).await?;

        let wait = page
            .wait_for(
                SNIPPET_SELECTOR,
                Duration::from_millis(self.settings.results_timeout_ms),
            )
            .await;
        if let Err(e) = wait {
            // No results container is "zero results", not a failure
            if matches!(e, PagesiftError::Timeout(_)) {
                return Ok(ScrapeResult::empty(page_num));
            }
            return Err(e);
        }

        let snippets = page.find_all(SNIPPET_SELECTOR).await?;
        let raw_count = snippets.len();

        let mut items = Vec::new();
        for snippet in &snippets {
            if items.len() >= count {
                break;
            }
            match Self::parse_snippet(snippet.as_ref()).await {
                Ok(Some(record)) => items.push(record),
                Ok(None) => {}
                Err(e) => tracing::debug!("skipping malformed snippet: {e}"),
            }
        }

        // Heuristic: a full-looking page probably has a next one. The site
        // exposes no authoritative page count.
        let has_next = raw_count >= 10;

        Ok(ScrapeResult::new(items, page_num, has_next))
    }
}
