//! Wikipedia recipe: article search plus structured article extraction.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::app::{PagesiftError, Result};
use crate::model::{Record, ScrapeResult};
use crate::page::{ElementHandle, PageHandle};
use crate::recipe::Recipe;
use crate::toolkit::{self, Params};

const ENDPOINTS: &[&str] = &["search", "article"];

const BASE_URL: &str = "https://en.wikipedia.org";
const SEARCH_PATH: &str = "/w/index.php";

/// Matches either outcome of a search: the results list or the explicit
/// "no results" marker.
const RESULTS_OR_NONE_SELECTOR: &str = ".mw-search-results, .mw-search-nonefound";
const NONE_FOUND_SELECTOR: &str = ".mw-search-nonefound";
const RESULT_SELECTOR: &str = ".mw-search-result";
const RESULT_HEADING_SELECTOR: &str = ".mw-search-result-heading a";
const RESULT_SNIPPET_SELECTOR: &str = ".searchresult";
const RESULT_SIZE_SELECTOR: &str = ".mw-search-result-data";
const NEXT_LINK_SELECTOR: &str = ".mw-nextlink";

const MISSING_ARTICLE_SELECTOR: &str = ".noarticletext";
const HEADING_SELECTOR: &str = "#firstHeading";
const LEAD_PARAGRAPH_SELECTOR: &str = "#mw-content-text .mw-parser-output > p";
const INFOBOX_SELECTOR: &str = ".infobox, .infobox_v2";
const TOC_SELECTOR: &str = "#toc .toctext, .vector-toc-text, .mw-toc-text .toctext";
const SECTION_HEADING_SELECTOR: &str =
    "#mw-content-text .mw-parser-output > h2, #mw-content-text .mw-parser-output > h3";
const CATEGORY_SELECTOR: &str = "#mw-normal-catlinks ul li a";
const LANGUAGE_SELECTOR: &str = "#p-lang li, .interlanguage-link";

/// Search pages served per request; drives the page -> offset math.
const RESULTS_PER_PAGE: u32 = 20;

/// Lead paragraphs shorter than this are coordinate lines or rendering
/// artifacts, not prose.
const MIN_PARAGRAPH_LEN: usize = 10;

/// Meta sections that carry link lists rather than prose.
const SKIPPED_SECTIONS: &[&str] = &["references", "external links", "notes", "further reading"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikipediaSettings {
    /// How long to wait for the search outcome markers, in milliseconds
    /// (default: 10000)
    pub results_timeout_ms: u64,

    /// Upper bound on the sibling scan that collects a section's
    /// paragraphs; stops early at the next heading (default: 50)
    pub section_scan_limit: usize,

    /// Lead paragraphs kept as the article summary (default: 3)
    pub summary_paragraphs: usize,
}

impl Default for WikipediaSettings {
    fn default() -> Self {
        Self {
            results_timeout_ms: 10_000,
            section_scan_limit: 50,
            summary_paragraphs: 3,
        }
    }
}

/// Scrapes Wikipedia search results and structured article content.
pub struct WikipediaRecipe {
    settings: WikipediaSettings,
}

impl Default for WikipediaRecipe {
    fn default() -> Self {
        Self::new(WikipediaSettings::default())
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl WikipediaRecipe {
    pub fn new(settings: WikipediaSettings) -> Self {
        Self { settings }
    }

    async fn search(&self, page: &dyn PageHandle, params: &Params) -> Result<ScrapeResult> {
        let query = params.require_query("search query")?;
        let count = params.count(20, 50);
        let page_num = params.page();
        // Saturate rather than wrap for absurd page numbers
        let offset = page_num.saturating_sub(1).saturating_mul(RESULTS_PER_PAGE);

        let offset = offset.to_string();
        let url = Url::parse_with_params(
            &format!("{BASE_URL}{SEARCH_PATH}"),
            &[
                ("search", query),
                ("title", "Special:Search"),
                ("ns0", "1"),
                ("offset", offset.as_str()),
            ],
        )?;

        page.goto(url.as_str()).await?;

        // Exact-title matches redirect straight to the article
        let current = page.current_url().await?;
        if current.contains("/wiki/") && !current.contains("Special:Search") {
            let mut result = self.extract_article(page).await?;
            if let Some(record) = result.items.first_mut() {
                record.insert("redirected_from".into(), json!(query));
            }
            return Ok(result);
        }

        let wait = page
            .wait_for(
                RESULTS_OR_NONE_SELECTOR,
                Duration::from_millis(self.settings.results_timeout_ms),
            )
            .await;
        if let Err(e) = wait {
            if matches!(e, PagesiftError::Timeout(_)) {
                return Ok(ScrapeResult::empty(page_num));
            }
            return Err(e);
        }

        if page.find(NONE_FOUND_SELECTOR).await?.is_some() {
            return Ok(ScrapeResult::empty(page_num));
        }

        let items = Self::extract_search_results(page, count).await?;
        let has_next = page.find(NEXT_LINK_SELECTOR).await?.is_some();

        Ok(ScrapeResult::new(items, page_num, has_next))
    }

    async fn extract_search_results(page: &dyn PageHandle, count: usize) -> Result<Vec<Record>> {
        let mut items = Vec::new();

        for result in page.find_all(RESULT_SELECTOR).await? {
            if items.len() >= count {
                break;
            }
            match Self::parse_search_result(result.as_ref()).await {
                Ok(Some(record)) => items.push(record),
                Ok(None) => {}
                Err(e) => tracing::debug!("skipping malformed search result: {e}"),
            }
        }

        Ok(items)
    }

    async fn parse_search_result(result: &dyn ElementHandle) -> Result<Option<Record>> {
        let Some(heading) = result.find(RESULT_HEADING_SELECTOR).await? else {
            return Ok(None);
        };
        let title = heading.text().await?.unwrap_or_default().trim().to_string();
        if title.is_empty() {
            return Ok(None);
        }

        let href = heading.attribute("href").await?.unwrap_or_default();
        let url = if href.starts_with('/') {
            format!("{BASE_URL}{href}")
        } else {
            href
        };

        let snippet = toolkit::first_matching_text(result, &[RESULT_SNIPPET_SELECTOR])
            .await
            .unwrap_or_default();

        let mut record = Record::new();
        record.insert("title".into(), json!(title));
        record.insert("url".into(), json!(url));
        record.insert("snippet".into(), json!(snippet));

        if let Some(size_info) =
            toolkit::first_matching_text(result, &[RESULT_SIZE_SELECTOR]).await
        {
            record.insert("size_info".into(), json!(size_info));
        }

        Ok(Some(record))
    }

    async fn article(&self, page: &dyn PageHandle, params: &Params) -> Result<ScrapeResult> {
        let query = params.require_query("article title")?;

        // Accept plain titles as well as URL slugs. Pushing the slug as a
        // path segment percent-encodes characters like `?` and `#` that
        // would otherwise act as query/fragment delimiters.
        let slug = query.replace(' ', "_");
        let mut url = Url::parse(BASE_URL)?;
        url.path_segments_mut()
            .map_err(|_| PagesiftError::Page(format!("cannot build article URL for {query:?}")))?
            .push("wiki")
            .extend(slug.split('/'));

        page.goto(url.as_str()).await?;

        if page.find(MISSING_ARTICLE_SELECTOR).await?.is_some() {
            return Err(PagesiftError::NotFound(format!(
                "Wikipedia article not found: {query}"
            )));
        }

        self.extract_article(page).await
    }

    /// Pull the structured article content out of the current page.
    async fn extract_article(&self, page: &dyn PageHandle) -> Result<ScrapeResult> {
        let mut record = Record::new();

        if let Some(title) = toolkit::first_matching_text(page, &[HEADING_SELECTOR]).await {
            record.insert("title".into(), json!(title));
        }
        record.insert("url".into(), json!(page.current_url().await?));
        record.insert("summary".into(), json!(self.extract_summary(page).await?));

        let infobox = Self::extract_infobox(page).await?;
        if !infobox.is_empty() {
            record.insert("infobox".into(), Value::Object(infobox));
        }

        let toc = Self::extract_toc(page).await?;
        if !toc.is_empty() {
            record.insert("table_of_contents".into(), json!(toc));
        }

        record.insert("sections".into(), json!(self.extract_sections(page).await?));

        let categories = Self::extract_categories(page).await?;
        if !categories.is_empty() {
            record.insert("categories".into(), json!(categories));
        }

        let lang_count = page.find_all(LANGUAGE_SELECTOR).await?.len();
        if lang_count > 0 {
            record.insert("languages_available".into(), json!(lang_count));
        }

        toolkit::flatten_record(&mut record)?;

        Ok(ScrapeResult::single(record))
    }

    /// Lead paragraphs before the first section heading, capped.
    async fn extract_summary(&self, page: &dyn PageHandle) -> Result<String> {
        let mut paragraphs = Vec::new();

        for el in page.find_all(LEAD_PARAGRAPH_SELECTOR).await? {
            let text = el.text().await?.unwrap_or_default().trim().to_string();
            if text.len() < MIN_PARAGRAPH_LEN {
                continue;
            }
            paragraphs.push(text);
            if paragraphs.len() >= self.settings.summary_paragraphs {
                break;
            }
        }

        Ok(paragraphs.join("\n\n"))
    }

    async fn extract_infobox(page: &dyn PageHandle) -> Result<Map<String, Value>> {
        let mut infobox = Map::new();

        let Some(table) = page.find(INFOBOX_SELECTOR).await? else {
            return Ok(infobox);
        };

        for row in table.find_all("tr").await? {
            let (Some(header), Some(data)) = (row.find("th").await?, row.find("td").await?)
            else {
                continue;
            };
            let key = header.text().await?.unwrap_or_default().trim().to_string();
            let value = data.text().await?.unwrap_or_default();
            let value = collapse_whitespace(&value);
            if !key.is_empty() && !value.is_empty() {
                infobox.insert(key, json!(value));
            }
        }

        Ok(infobox)
    }

    async fn extract_toc(page: &dyn PageHandle) -> Result<Vec<String>> {
        let mut entries = Vec::new();
        for entry in page.find_all(TOC_SELECTOR).await? {
            let text = entry.text().await?.unwrap_or_default().trim().to_string();
            if !text.is_empty() {
                entries.push(text);
            }
        }
        Ok(entries)
    }

    /// Sections from the article's top-level h2/h3 headings. Each section's
    /// paragraph text is gathered in-page by a bounded sibling scan that
    /// stops at the next heading.
    async fn extract_sections(&self, page: &dyn PageHandle) -> Result<Vec<Value>> {
        let mut sections = Vec::new();

        for heading in page.find_all(SECTION_HEADING_SELECTOR).await? {
            match self.parse_section(heading.as_ref()).await {
                Ok(Some(section)) => sections.push(section),
                Ok(None) => {}
                Err(e) => tracing::debug!("skipping malformed section: {e}"),
            }
        }

        Ok(sections)
    }

    async fn parse_section(&self, heading: &dyn ElementHandle) -> Result<Option<Value>> {
        let title = match heading.find(".mw-headline").await? {
            Some(headline) => headline.text().await?.unwrap_or_default(),
            None => heading.text().await?.unwrap_or_default(),
        };
        let title = title.trim().trim_end_matches("[edit]").trim().to_string();
        if title.is_empty() || SKIPPED_SECTIONS.contains(&title.to_lowercase().as_str()) {
            return Ok(None);
        }

        let tag = heading
            .eval("function() { return this.tagName; }")
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string();
        let level = if tag == "H2" { "h2" } else { "h3" };

        let scan = format!(
            r#"function() {{
                const parts = [];
                let el = this.nextElementSibling;
                for (let i = 0; i < {limit} && el; i++) {{
                    const tag = el.tagName;
                    if (tag === 'H2' || tag === 'H3') break;
                    if (tag === 'P') {{
                        const text = (el.textContent || '').trim();
                        if (text) parts.push(text);
                    }}
                    el = el.nextElementSibling;
                }}
                return parts;
            }}"#,
            limit = self.settings.section_scan_limit
        );

        let parts = heading.eval(&scan).await?;
        let content = parts
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("\n\n")
            })
            .unwrap_or_default();

        Ok(Some(json!({
            "heading": title,
            "level": level,
            "content": content,
        })))
    }

    async fn extract_categories(page: &dyn PageHandle) -> Result<Vec<String>> {
        let mut categories = Vec::new();
        for link in page.find_all(CATEGORY_SELECTOR).await? {
            let text = link.text().await?.unwrap_or_default().trim().to_string();
            if !text.is_empty() {
                categories.push(text);
            }
        }
        Ok(categories)
    }
}

#[async_trait]
impl Recipe for WikipediaRecipe {
    fn endpoints(&self) -> &[&str] {
        ENDPOINTS
    }

    async fn scrape(
        &self,
        endpoint: &str,
        page: &dyn PageHandle,
        params: &Params,
    ) -> Result<ScrapeResult> {
        match endpoint {
            "search" => self.search(page, params).await,
            "article" => self.article(page, params).await,
            other => Err(PagesiftError::UnsupportedEndpoint(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fake::{FakeElement, FakePage};

    fn recipe() -> WikipediaRecipe {
        WikipediaRecipe::new(WikipediaSettings {
            results_timeout_ms: 0,
            ..WikipediaSettings::default()
        })
    }

    fn search_result(title: &str, href: &str, snippet: &str) -> FakeElement {
        FakeElement::new()
            .child(
                RESULT_HEADING_SELECTOR,
                FakeElement::with_text(title).attr("href", href),
            )
            .child(RESULT_SNIPPET_SELECTOR, FakeElement::with_text(snippet))
    }

    #[tokio::test]
    async fn test_search_extracts_entries_and_next_link() {
        let page = FakePage::new()
            .redirects_to("https://en.wikipedia.org/w/index.php?search=rust&title=Special:Search")
            .child(RESULTS_OR_NONE_SELECTOR, FakeElement::new())
            .child(RESULT_SELECTOR, search_result("Rust", "/wiki/Rust", "A metal oxide"))
            .child(
                RESULT_SELECTOR,
                search_result("Rust (language)", "/wiki/Rust_(programming_language)", "A language"),
            )
            .child(NEXT_LINK_SELECTOR, FakeElement::with_text("Next 20"));

        let params = Params::from_pairs([("query", "rust")]);
        let result = recipe().scrape("search", &page, &params).await.unwrap();

        assert_eq!(result.items.len(), 2);
        assert_eq!(
            result.items[0]["url"],
            json!("https://en.wikipedia.org/wiki/Rust")
        );
        assert_eq!(result.items[1]["title"], json!("Rust (language)"));
        assert!(result.has_next);
    }

    #[tokio::test]
    async fn test_search_none_found_is_empty_result() {
        let page = FakePage::new()
            .redirects_to("https://en.wikipedia.org/w/index.php?search=xyzzy&title=Special:Search")
            .child(RESULTS_OR_NONE_SELECTOR, FakeElement::new())
            .child(NONE_FOUND_SELECTOR, FakeElement::with_text("No results"));

        let params = Params::from_pairs([("query", "xyzzy"), ("page", "2")]);
        let result = recipe().scrape("search", &page, &params).await.unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.current_page, 2);
        assert!(!result.has_next);
    }

    #[tokio::test]
    async fn test_search_outcome_never_appearing_is_empty_result() {
        let page = FakePage::new()
            .redirects_to("https://en.wikipedia.org/w/index.php?search=rust&title=Special:Search");
        let params = Params::from_pairs([("query", "rust")]);
        let result = recipe().scrape("search", &page, &params).await.unwrap();
        assert!(result.items.is_empty());
        assert!(!result.has_next);
    }

    #[tokio::test]
    async fn test_exact_match_redirect_falls_through_to_article() {
        let page = FakePage::new()
            .redirects_to("https://en.wikipedia.org/wiki/Rust_(programming_language)")
            .child(HEADING_SELECTOR, FakeElement::with_text("Rust (programming language)"));

        let params = Params::from_pairs([("query", "rust programming language")]);
        let result = recipe().scrape("search", &page, &params).await.unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(
            result.items[0]["redirected_from"],
            json!("rust programming language")
        );
        assert_eq!(result.items[0]["title"], json!("Rust (programming language)"));
    }

    #[tokio::test]
    async fn test_extreme_page_number_saturates_the_offset() {
        let page = FakePage::new()
            .redirects_to("https://en.wikipedia.org/w/index.php?search=rust&title=Special:Search");
        let params = Params::from_pairs([("query", "rust"), ("page", "4294967295")]);
        let result = recipe().scrape("search", &page, &params).await.unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.current_page, u32::MAX);
    }

    #[tokio::test]
    async fn test_article_title_delimiters_are_percent_encoded() {
        let page = FakePage::new()
            .child(HEADING_SELECTOR, FakeElement::with_text("Who? (album)"));
        let params = Params::from_pairs([("query", "Who? (album)")]);
        recipe().scrape("article", &page, &params).await.unwrap();

        let goto = page
            .actions()
            .into_iter()
            .find(|a| a.starts_with("goto"))
            .unwrap();
        assert_eq!(goto, "goto https://en.wikipedia.org/wiki/Who%3F_(album)");
    }

    #[tokio::test]
    async fn test_article_title_with_subpage_slash_keeps_the_path() {
        let page = FakePage::new()
            .child(HEADING_SELECTOR, FakeElement::with_text("AS/400"));
        let params = Params::from_pairs([("query", "AS/400")]);
        recipe().scrape("article", &page, &params).await.unwrap();

        let goto = page
            .actions()
            .into_iter()
            .find(|a| a.starts_with("goto"))
            .unwrap();
        assert_eq!(goto, "goto https://en.wikipedia.org/wiki/AS/400");
    }

    #[tokio::test]
    async fn test_missing_article_is_not_found() {
        let page = FakePage::new().child(
            MISSING_ARTICLE_SELECTOR,
            FakeElement::with_text("Wikipedia does not have an article with this exact name."),
        );
        let params = Params::from_pairs([("query", "Xyzzy plugh")]);
        let err = recipe().scrape("article", &page, &params).await.unwrap_err();
        assert!(matches!(err, PagesiftError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_article_extracts_structured_content_flattened() {
        let infobox = FakeElement::new()
            .child(
                "tr",
                FakeElement::new()
                    .child("th", FakeElement::with_text("Paradigm"))
                    .child("td", FakeElement::with_text("  Multi-paradigm \n concurrent ")),
            );
        let heading = FakeElement::new()
            .child(".mw-headline", FakeElement::with_text("History[edit]"))
            .on_eval("return this.tagName", json!("H2"))
            .on_eval("const parts", json!(["Work began in 2006.", "Mozilla sponsored it."]));

        let page = FakePage::new()
            .redirects_to("https://en.wikipedia.org/wiki/Rust_(programming_language)")
            .child(HEADING_SELECTOR, FakeElement::with_text("Rust (programming language)"))
            .child(
                LEAD_PARAGRAPH_SELECTOR,
                FakeElement::with_text("Rust is a general-purpose programming language."),
            )
            .child(INFOBOX_SELECTOR, infobox)
            .child(TOC_SELECTOR, FakeElement::with_text("History"))
            .child(SECTION_HEADING_SELECTOR, heading)
            .child(CATEGORY_SELECTOR, FakeElement::with_text("Systems programming languages"))
            .child(LANGUAGE_SELECTOR, FakeElement::new());

        let params = Params::from_pairs([("query", "Rust (programming language)")]);
        let result = recipe().scrape("article", &page, &params).await.unwrap();
        let record = &result.items[0];

        assert_eq!(record["title"], json!("Rust (programming language)"));
        assert_eq!(
            record["summary"],
            json!("Rust is a general-purpose programming language.")
        );
        assert_eq!(record["languages_available"], json!(1));

        // Nested values left the recipe as JSON-encoded strings
        let sections: Value =
            serde_json::from_str(record["sections"].as_str().unwrap()).unwrap();
        assert_eq!(sections[0]["heading"], json!("History"));
        assert_eq!(sections[0]["level"], json!("h2"));
        assert_eq!(
            sections[0]["content"],
            json!("Work began in 2006.\n\nMozilla sponsored it.")
        );

        let infobox: Value = serde_json::from_str(record["infobox"].as_str().unwrap()).unwrap();
        assert_eq!(infobox["Paradigm"], json!("Multi-paradigm concurrent"));

        let toc: Value =
            serde_json::from_str(record["table_of_contents"].as_str().unwrap()).unwrap();
        assert_eq!(toc, json!(["History"]));
    }

    #[tokio::test]
    async fn test_summary_skips_short_paragraphs_and_caps() {
        let page = FakePage::new()
            .child(LEAD_PARAGRAPH_SELECTOR, FakeElement::with_text("short"))
            .child(LEAD_PARAGRAPH_SELECTOR, FakeElement::with_text("First real paragraph."))
            .child(LEAD_PARAGRAPH_SELECTOR, FakeElement::with_text("Second real paragraph."))
            .child(LEAD_PARAGRAPH_SELECTOR, FakeElement::with_text("Third real paragraph."))
            .child(LEAD_PARAGRAPH_SELECTOR, FakeElement::with_text("Fourth real paragraph."));

        let summary = recipe().extract_summary(&page).await.unwrap();
        assert_eq!(
            summary,
            "First real paragraph.\n\nSecond real paragraph.\n\nThird real paragraph."
        );
    }

    #[tokio::test]
    async fn test_reference_style_sections_are_skipped() {
        let refs = FakeElement::new()
            .child(".mw-headline", FakeElement::with_text("References"))
            .on_eval("return this.tagName", json!("H2"));
        let page = FakePage::new().child(SECTION_HEADING_SELECTOR, refs);

        let sections = recipe().extract_sections(&page).await.unwrap();
        assert!(sections.is_empty());
    }
}
