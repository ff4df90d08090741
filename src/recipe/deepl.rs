//! DeepL translation recipe: one endpoint per language-pair direction.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::app::{PagesiftError, Result};
use crate::model::{Record, ScrapeResult};
use crate::page::PageHandle;
use crate::recipe::Recipe;
use crate::toolkit::{self, Params, PollSettings};

const ENDPOINTS: &[&str] = &["de-en", "en-de"];

const SOURCE_SELECTOR: &str = "d-textarea[data-testid=\"translator-source-input\"]";
const TARGET_SELECTOR: &str = "d-textarea[data-testid=\"translator-target-input\"]";
const TARGET_PARAGRAPH_SELECTOR: &str = "[data-testid=\"translator-target-input\"] p";

/// Translates text through DeepL's web translator.
///
/// The site streams the translation progressively and exposes no "done"
/// signal, so completion is detected by convergence polling on the target
/// text.
pub struct DeeplRecipe {
    poll: PollSettings,
    input_timeout_ms: u64,
}

impl Default for DeeplRecipe {
    fn default() -> Self {
        Self::new(PollSettings::default())
    }
}

impl DeeplRecipe {
    pub fn new(poll: PollSettings) -> Self {
        Self {
            poll,
            input_timeout_ms: 15_000,
        }
    }

    fn lang_pair(endpoint: &str) -> Option<(&'static str, &'static str)> {
        match endpoint {
            "de-en" => Some(("de", "en")),
            "en-de" => Some(("en", "de")),
            _ => None,
        }
    }

    fn record(source: &str, translated: &str, source_lang: &str, target_lang: &str) -> Record {
        let mut record = Record::new();
        record.insert("source_text".into(), json!(source));
        record.insert("translated_text".into(), json!(translated));
        record.insert("source_lang".into(), json!(source_lang));
        record.insert("target_lang".into(), json!(target_lang));
        record
    }

    /// Current translation text, trying the target widget's value
    /// attribute, its text content, then the inner paragraph. Empty string
    /// when nothing has rendered yet.
    async fn read_target(page: &dyn PageHandle) -> Result<String> {
        if let Some(area) = page.find(TARGET_SELECTOR).await? {
            if let Some(value) = area.attribute("value").await? {
                if !value.trim().is_empty() {
                    return Ok(value.trim().to_string());
                }
            }
            if let Some(text) = area.text().await? {
                if !text.trim().is_empty() {
                    return Ok(text.trim().to_string());
                }
            }
        }

        if let Some(paragraph) = page.find(TARGET_PARAGRAPH_SELECTOR).await? {
            if let Some(text) = paragraph.text().await? {
                if !text.trim().is_empty() {
                    return Ok(text.trim().to_string());
                }
            }
        }

        Ok(String::new())
    }
}

#[async_trait]
impl Recipe for DeeplRecipe {
    fn endpoints(&self) -> &[&str] {
        ENDPOINTS
    }

    async fn scrape(
        &self,
        endpoint: &str,
        page: &dyn PageHandle,
        params: &Params,
    ) -> Result<ScrapeResult> {
        let (source_lang, target_lang) = Self::lang_pair(endpoint)
            .ok_or_else(|| PagesiftError::UnsupportedEndpoint(endpoint.to_string()))?;

        let query = params.query();
        if query.is_empty() {
            // No work requested; distinct from failure
            return Ok(ScrapeResult::single(Self::record(
                "",
                "",
                source_lang,
                target_lang,
            )));
        }

        let url = format!("https://www.deepl.com/en/translator#{source_lang}/{target_lang}/");
        page.goto(&url).await?;

        let source_area = page
            .wait_for(
                SOURCE_SELECTOR,
                Duration::from_millis(self.input_timeout_ms),
            )
            .await?;

        // Clear any previous input, then retype the source text
        source_area.click().await?;
        source_area.press_key("Control+a").await?;
        source_area.press_key("Backspace").await?;
        source_area.type_text(query).await?;

        let translated =
            toolkit::poll_until_stable(&self.poll, query, || Self::read_target(page)).await?;

        Ok(ScrapeResult::single(Self::record(
            query,
            &translated,
            source_lang,
            target_lang,
        )))
    }
}
